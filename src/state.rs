use std::sync::Arc;

use tracing::{info, warn};

use crate::auth::jwt::JwtKeys;
use crate::auth::memory_repo::MemoryUserDirectory;
use crate::auth::repo::{PgUserDirectory, UserDirectory};
use crate::config::AppConfig;
use crate::db;

#[derive(Clone)]
pub struct AppState {
    pub directory: Arc<dyn UserDirectory>,
    pub config: Arc<AppConfig>,
    pub tokens: JwtKeys,
}

impl AppState {
    pub async fn init() -> anyhow::Result<Self> {
        let config = Arc::new(AppConfig::from_env()?);

        let directory = match &config.database_url {
            Some(url) => {
                let pool = db::connect(url, config.max_connections).await?;
                info!("using postgres user directory");
                Arc::new(PgUserDirectory::new(pool)) as Arc<dyn UserDirectory>
            }
            None => {
                warn!("DATABASE_URL not set; using in-memory user directory (data is lost on restart)");
                Arc::new(MemoryUserDirectory::new()) as Arc<dyn UserDirectory>
            }
        };

        if config.token.ttl_minutes.is_none() {
            warn!("TOKEN_TTL_MINUTES not set; session tokens never expire");
        }

        Ok(Self::from_parts(directory, config))
    }

    pub fn from_parts(directory: Arc<dyn UserDirectory>, config: Arc<AppConfig>) -> Self {
        let tokens = JwtKeys::from_config(&config.token);
        Self {
            directory,
            config,
            tokens,
        }
    }

    #[cfg(test)]
    pub fn fake() -> Self {
        Self::fake_with(true)
    }

    #[cfg(test)]
    pub fn fake_with(allow_delete_all: bool) -> Self {
        let config = Arc::new(AppConfig {
            database_url: None,
            max_connections: 1,
            token: crate::config::TokenConfig {
                secret: "test".into(),
                issuer: "test".into(),
                ttl_minutes: None,
            },
            allow_delete_all,
        });
        Self::from_parts(Arc::new(MemoryUserDirectory::new()), config)
    }
}
