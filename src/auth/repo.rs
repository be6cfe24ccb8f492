use async_trait::async_trait;
use sqlx::{PgPool, Postgres, QueryBuilder};

use crate::auth::repo_types::{NewUser, UserChanges, UserFilter, UserRecord};
use crate::error::DirectoryError;

/// Durable store of user records.
///
/// `update_one` and `delete_one` touch at most one matching record and return
/// how many they touched. Username uniqueness is enforced by the backend and
/// surfaces as [`DirectoryError::Conflict`].
#[async_trait]
pub trait UserDirectory: Send + Sync {
    async fn create(&self, user: NewUser) -> Result<UserRecord, DirectoryError>;
    async fn find_one(&self, filter: &UserFilter) -> Result<Option<UserRecord>, DirectoryError>;
    async fn find_many(&self, filter: &UserFilter) -> Result<Vec<UserRecord>, DirectoryError>;
    async fn update_one(
        &self,
        filter: &UserFilter,
        changes: UserChanges,
    ) -> Result<u64, DirectoryError>;
    async fn delete_one(&self, filter: &UserFilter) -> Result<u64, DirectoryError>;
    async fn delete_many(&self, filter: &UserFilter) -> Result<u64, DirectoryError>;
}

const COLUMNS: &str =
    "id, first_name, last_name, username, email, password_hash, is_verified, created_at";

/// Postgres-backed directory. Schema lives in `migrations/`.
#[derive(Clone)]
pub struct PgUserDirectory {
    db: PgPool,
}

impl PgUserDirectory {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

fn push_filter(qb: &mut QueryBuilder<'_, Postgres>, filter: &UserFilter) {
    if filter.is_empty() {
        return;
    }
    qb.push(" WHERE ");
    let mut conds = qb.separated(" AND ");
    if let Some(id) = filter.id {
        conds.push("id = ").push_bind_unseparated(id);
    }
    if let Some(v) = &filter.username {
        conds.push("username = ").push_bind_unseparated(v.clone());
    }
    if let Some(v) = &filter.email {
        conds.push("email = ").push_bind_unseparated(v.clone());
    }
    if let Some(v) = &filter.first_name {
        conds.push("first_name = ").push_bind_unseparated(v.clone());
    }
    if let Some(v) = &filter.last_name {
        conds.push("last_name = ").push_bind_unseparated(v.clone());
    }
}

/// `WHERE id = (SELECT id FROM users <filter> LIMIT 1)`
fn push_single_target(qb: &mut QueryBuilder<'_, Postgres>, filter: &UserFilter) {
    qb.push(" WHERE id = (SELECT id FROM users");
    push_filter(qb, filter);
    qb.push(" LIMIT 1)");
}

#[async_trait]
impl UserDirectory for PgUserDirectory {
    async fn create(&self, user: NewUser) -> Result<UserRecord, DirectoryError> {
        let record = sqlx::query_as::<_, UserRecord>(&format!(
            r#"
            INSERT INTO users (first_name, last_name, username, email, password_hash)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING {COLUMNS}
            "#
        ))
        .bind(user.first_name)
        .bind(user.last_name)
        .bind(user.username)
        .bind(user.email)
        .bind(user.password_hash)
        .fetch_one(&self.db)
        .await?;
        Ok(record)
    }

    async fn find_one(&self, filter: &UserFilter) -> Result<Option<UserRecord>, DirectoryError> {
        let mut qb = QueryBuilder::new(format!("SELECT {COLUMNS} FROM users"));
        push_filter(&mut qb, filter);
        qb.push(" LIMIT 1");
        let record = qb
            .build_query_as::<UserRecord>()
            .fetch_optional(&self.db)
            .await?;
        Ok(record)
    }

    async fn find_many(&self, filter: &UserFilter) -> Result<Vec<UserRecord>, DirectoryError> {
        let mut qb = QueryBuilder::new(format!("SELECT {COLUMNS} FROM users"));
        push_filter(&mut qb, filter);
        qb.push(" ORDER BY created_at ASC");
        let rows = qb
            .build_query_as::<UserRecord>()
            .fetch_all(&self.db)
            .await?;
        Ok(rows)
    }

    async fn update_one(
        &self,
        filter: &UserFilter,
        changes: UserChanges,
    ) -> Result<u64, DirectoryError> {
        let mut qb = QueryBuilder::new("UPDATE users SET first_name = ");
        qb.push_bind(changes.first_name)
            .push(", last_name = ")
            .push_bind(changes.last_name)
            .push(", username = ")
            .push_bind(changes.username)
            .push(", email = ")
            .push_bind(changes.email)
            .push(", password_hash = ")
            .push_bind(changes.password_hash);
        push_single_target(&mut qb, filter);
        let done = qb.build().execute(&self.db).await?;
        Ok(done.rows_affected())
    }

    async fn delete_one(&self, filter: &UserFilter) -> Result<u64, DirectoryError> {
        let mut qb = QueryBuilder::new("DELETE FROM users");
        push_single_target(&mut qb, filter);
        let done = qb.build().execute(&self.db).await?;
        Ok(done.rows_affected())
    }

    async fn delete_many(&self, filter: &UserFilter) -> Result<u64, DirectoryError> {
        let mut qb = QueryBuilder::new("DELETE FROM users");
        push_filter(&mut qb, filter);
        let done = qb.build().execute(&self.db).await?;
        Ok(done.rows_affected())
    }
}
