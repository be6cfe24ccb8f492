use std::collections::HashMap;

use async_trait::async_trait;
use time::OffsetDateTime;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::auth::repo::UserDirectory;
use crate::auth::repo_types::{NewUser, UserChanges, UserFilter, UserRecord};
use crate::error::DirectoryError;

/// Process-local directory for development and tests. Enforces the same
/// username uniqueness as the Postgres schema.
#[derive(Default)]
pub struct MemoryUserDirectory {
    users: RwLock<HashMap<Uuid, UserRecord>>,
}

impl MemoryUserDirectory {
    pub fn new() -> Self {
        Self::default()
    }
}

fn first_match<'a>(
    users: &'a HashMap<Uuid, UserRecord>,
    filter: &UserFilter,
) -> Option<&'a UserRecord> {
    users
        .values()
        .filter(|u| filter.matches(u))
        .min_by_key(|u| u.created_at)
}

#[async_trait]
impl UserDirectory for MemoryUserDirectory {
    async fn create(&self, user: NewUser) -> Result<UserRecord, DirectoryError> {
        let mut users = self.users.write().await;
        if users.values().any(|u| u.username == user.username) {
            return Err(DirectoryError::Conflict);
        }
        let record = UserRecord {
            id: Uuid::new_v4(),
            first_name: user.first_name,
            last_name: user.last_name,
            username: user.username,
            email: user.email,
            password_hash: user.password_hash,
            is_verified: false,
            created_at: OffsetDateTime::now_utc(),
        };
        users.insert(record.id, record.clone());
        Ok(record)
    }

    async fn find_one(&self, filter: &UserFilter) -> Result<Option<UserRecord>, DirectoryError> {
        let users = self.users.read().await;
        Ok(first_match(&users, filter).cloned())
    }

    async fn find_many(&self, filter: &UserFilter) -> Result<Vec<UserRecord>, DirectoryError> {
        let users = self.users.read().await;
        let mut found: Vec<UserRecord> =
            users.values().filter(|u| filter.matches(u)).cloned().collect();
        found.sort_by_key(|u| u.created_at);
        Ok(found)
    }

    async fn update_one(
        &self,
        filter: &UserFilter,
        changes: UserChanges,
    ) -> Result<u64, DirectoryError> {
        let mut users = self.users.write().await;
        let Some(id) = first_match(&users, filter).map(|u| u.id) else {
            return Ok(0);
        };
        if users
            .values()
            .any(|u| u.id != id && u.username == changes.username)
        {
            return Err(DirectoryError::Conflict);
        }
        if let Some(user) = users.get_mut(&id) {
            user.first_name = changes.first_name;
            user.last_name = changes.last_name;
            user.username = changes.username;
            user.email = changes.email;
            user.password_hash = changes.password_hash;
        }
        Ok(1)
    }

    async fn delete_one(&self, filter: &UserFilter) -> Result<u64, DirectoryError> {
        let mut users = self.users.write().await;
        let Some(id) = first_match(&users, filter).map(|u| u.id) else {
            return Ok(0);
        };
        users.remove(&id);
        Ok(1)
    }

    async fn delete_many(&self, filter: &UserFilter) -> Result<u64, DirectoryError> {
        let mut users = self.users.write().await;
        let before = users.len();
        users.retain(|_, u| !filter.matches(u));
        Ok((before - users.len()) as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_user(username: &str) -> NewUser {
        NewUser {
            first_name: "Jane".into(),
            last_name: "Smith".into(),
            username: username.into(),
            email: format!("{username}@x.com"),
            password_hash: "$argon2id$placeholder".into(),
        }
    }

    #[tokio::test]
    async fn create_assigns_id_and_defaults() {
        let dir = MemoryUserDirectory::new();
        let user = dir.create(new_user("jsmith")).await.expect("create");
        assert!(!user.is_verified);
        let found = dir
            .find_one(&UserFilter::by_id(user.id))
            .await
            .expect("find")
            .expect("present");
        assert_eq!(found.username, "jsmith");
    }

    #[tokio::test]
    async fn create_rejects_taken_username() {
        let dir = MemoryUserDirectory::new();
        dir.create(new_user("jsmith")).await.expect("first create");
        let err = dir.create(new_user("jsmith")).await.unwrap_err();
        assert!(matches!(err, DirectoryError::Conflict));
    }

    #[tokio::test]
    async fn update_one_overwrites_and_reports_misses() {
        let dir = MemoryUserDirectory::new();
        let user = dir.create(new_user("jsmith")).await.expect("create");
        let changes = UserChanges {
            first_name: "Janet".into(),
            last_name: "Smithers".into(),
            username: "jsmith2".into(),
            email: "new@x.com".into(),
            password_hash: "$argon2id$other".into(),
        };
        let n = dir
            .update_one(&UserFilter::by_id(user.id), changes.clone())
            .await
            .expect("update");
        assert_eq!(n, 1);
        let found = dir
            .find_one(&UserFilter::by_id(user.id))
            .await
            .expect("find")
            .expect("present");
        assert_eq!(found.username, "jsmith2");
        assert_eq!(found.created_at, user.created_at);

        let n = dir
            .update_one(&UserFilter::by_id(Uuid::new_v4()), changes)
            .await
            .expect("update miss");
        assert_eq!(n, 0);
    }

    #[tokio::test]
    async fn update_one_rejects_username_of_another_user() {
        let dir = MemoryUserDirectory::new();
        let a = dir.create(new_user("alice")).await.expect("create a");
        dir.create(new_user("bobby")).await.expect("create b");
        let changes = UserChanges {
            first_name: "Alice".into(),
            last_name: "Liddell".into(),
            username: "bobby".into(),
            email: "a@x.com".into(),
            password_hash: "h".into(),
        };
        let err = dir
            .update_one(&UserFilter::by_id(a.id), changes)
            .await
            .unwrap_err();
        assert!(matches!(err, DirectoryError::Conflict));
    }

    #[tokio::test]
    async fn delete_one_then_delete_many() {
        let dir = MemoryUserDirectory::new();
        let a = dir.create(new_user("alice")).await.expect("create a");
        dir.create(new_user("bobby")).await.expect("create b");
        dir.create(new_user("carol")).await.expect("create c");

        assert_eq!(dir.delete_one(&UserFilter::by_id(a.id)).await.unwrap(), 1);
        assert_eq!(dir.delete_one(&UserFilter::by_id(a.id)).await.unwrap(), 0);
        assert_eq!(dir.find_many(&UserFilter::all()).await.unwrap().len(), 2);
        assert_eq!(dir.delete_many(&UserFilter::all()).await.unwrap(), 2);
        assert!(dir.find_many(&UserFilter::all()).await.unwrap().is_empty());
    }
}
