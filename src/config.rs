use anyhow::Context;

/// Upper bound for `TOKEN_TTL_MINUTES` (about ten years).
pub const MAX_TTL_MINUTES: i64 = 60 * 24 * 365 * 10;

#[derive(Debug, Clone)]
pub struct TokenConfig {
    pub secret: String,
    pub issuer: String,
    /// `None` keeps tokens valid until the secret changes.
    pub ttl_minutes: Option<i64>,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: Option<String>,
    pub max_connections: u32,
    pub token: TokenConfig,
    pub allow_delete_all: bool,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(var: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let secret = var("TOKEN_SECRET").context("TOKEN_SECRET must be set")?;
        if secret.is_empty() {
            anyhow::bail!("TOKEN_SECRET must not be empty");
        }
        let token = TokenConfig {
            secret,
            issuer: var("TOKEN_ISSUER").unwrap_or_else(|| "accounts".into()),
            ttl_minutes: var("TOKEN_TTL_MINUTES")
                .map(|v| parse_ttl(&v))
                .transpose()?,
        };
        let database_url = var("DATABASE_URL").filter(|v| !v.trim().is_empty());
        let max_connections = match var("DATABASE_MAX_CONNECTIONS") {
            Some(v) => v
                .trim()
                .parse::<u32>()
                .with_context(|| format!("DATABASE_MAX_CONNECTIONS is not a number: {v:?}"))?,
            None => 10,
        };
        let allow_delete_all = var("ALLOW_DELETE_ALL")
            .map(|v| parse_flag(&v))
            .unwrap_or(false);
        Ok(Self {
            database_url,
            max_connections,
            token,
            allow_delete_all,
        })
    }
}

fn parse_ttl(raw: &str) -> anyhow::Result<i64> {
    let minutes = raw
        .trim()
        .parse::<i64>()
        .with_context(|| format!("TOKEN_TTL_MINUTES is not a whole number of minutes: {raw:?}"))?;
    if !(1..=MAX_TTL_MINUTES).contains(&minutes) {
        anyhow::bail!("TOKEN_TTL_MINUTES must be between 1 and {MAX_TTL_MINUTES}, got {minutes}");
    }
    Ok(minutes)
}

fn parse_flag(raw: &str) -> bool {
    matches!(
        raw.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}
