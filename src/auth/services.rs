use uuid::Uuid;

use crate::auth::dto::{LoginRequest, RegisterRequest, UpdateRequest};
use crate::auth::jwt::JwtKeys;
use crate::auth::password::{hash_password_blocking, verify_password_blocking};
use crate::auth::repo::UserDirectory;
use crate::auth::repo_types::{NewUser, UserChanges, UserFilter, UserRecord};
use crate::error::{AuthError, AuthResult};

/// An id that is not a UUID cannot name any record.
fn parse_id(raw: &str) -> AuthResult<Uuid> {
    Uuid::parse_str(raw.trim()).map_err(|_| AuthError::UserNotFound)
}

pub async fn register(dir: &dyn UserDirectory, req: RegisterRequest) -> AuthResult<UserRecord> {
    let same_person = UserFilter {
        username: Some(req.username.clone()),
        email: Some(req.email.clone()),
        first_name: Some(req.first_name.clone()),
        last_name: Some(req.last_name.clone()),
        ..UserFilter::default()
    };
    if dir.find_one(&same_person).await?.is_some() {
        return Err(AuthError::DuplicateUser);
    }

    let password_hash = hash_password_blocking(req.password).await?;
    let user = dir
        .create(NewUser {
            first_name: req.first_name,
            last_name: req.last_name,
            username: req.username,
            email: req.email,
            password_hash,
        })
        .await?;
    Ok(user)
}

/// Returns a freshly issued session token for the user.
pub async fn login(dir: &dyn UserDirectory, keys: &JwtKeys, req: LoginRequest) -> AuthResult<String> {
    let user = dir
        .find_one(&UserFilter::by_username(req.username))
        .await?
        .ok_or(AuthError::UserNotFound)?;

    if !verify_password_blocking(req.password, user.password_hash).await? {
        return Err(AuthError::InvalidCredentials);
    }
    keys.issue(user.id)
}

pub async fn get_by_id(dir: &dyn UserDirectory, id: &str) -> AuthResult<UserRecord> {
    let id = parse_id(id)?;
    dir.find_one(&UserFilter::by_id(id))
        .await?
        .ok_or(AuthError::UserNotFound)
}

pub async fn list_all(dir: &dyn UserDirectory) -> AuthResult<Vec<UserRecord>> {
    Ok(dir.find_many(&UserFilter::all()).await?)
}

pub async fn update_by_id(dir: &dyn UserDirectory, req: UpdateRequest) -> AuthResult<Uuid> {
    let id = parse_id(&req.id)?;
    let filter = UserFilter::by_id(id);
    if dir.find_one(&filter).await?.is_none() {
        return Err(AuthError::UserNotFound);
    }

    let password_hash = hash_password_blocking(req.password).await?;
    let changes = UserChanges {
        first_name: req.first_name,
        last_name: req.last_name,
        username: req.username,
        email: req.email,
        password_hash,
    };
    // The record may have been deleted while the password was hashing.
    if dir.update_one(&filter, changes).await? == 0 {
        return Err(AuthError::UserNotFound);
    }
    Ok(id)
}

pub async fn delete_by_id(dir: &dyn UserDirectory, id: &str) -> AuthResult<Uuid> {
    let id = parse_id(id)?;
    let filter = UserFilter::by_id(id);
    if dir.find_one(&filter).await?.is_none() {
        return Err(AuthError::UserNotFound);
    }
    if dir.delete_one(&filter).await? == 0 {
        return Err(AuthError::UserNotFound);
    }
    Ok(id)
}

pub async fn delete_all(dir: &dyn UserDirectory) -> AuthResult<u64> {
    Ok(dir.delete_many(&UserFilter::all()).await?)
}
