use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use serde_json::json;
use thiserror::Error;

/// One rejected field of an incoming request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

impl FieldError {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

/// Failures of the account endpoints.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("validation failed")]
    ValidationFailed(Vec<FieldError>),
    #[error("user already exists")]
    DuplicateUser,
    #[error("user not found")]
    UserNotFound,
    #[error("username or password is wrong")]
    InvalidCredentials,
    #[error("invalid token")]
    InvalidToken,
    #[error("persistence error: {0}")]
    Persistence(String),
    #[error("stored credential is corrupt")]
    CorruptRecord,
    #[error("internal error: {0}")]
    Internal(String),
}

/// Failures reported by a user directory backend.
#[derive(Debug, Error)]
pub enum DirectoryError {
    /// A uniqueness constraint rejected the write.
    #[error("conflicting record")]
    Conflict,
    #[error("{0}")]
    Backend(String),
}

impl From<DirectoryError> for AuthError {
    fn from(e: DirectoryError) -> Self {
        match e {
            DirectoryError::Conflict => AuthError::DuplicateUser,
            DirectoryError::Backend(msg) => AuthError::Persistence(msg),
        }
    }
}

impl From<sqlx::Error> for DirectoryError {
    fn from(e: sqlx::Error) -> Self {
        match &e {
            sqlx::Error::Database(db) if db.is_unique_violation() => DirectoryError::Conflict,
            _ => DirectoryError::Backend(e.to_string()),
        }
    }
}

impl AuthError {
    pub fn status(&self) -> StatusCode {
        match self {
            AuthError::ValidationFailed(_)
            | AuthError::DuplicateUser
            | AuthError::UserNotFound
            | AuthError::InvalidCredentials
            | AuthError::InvalidToken => StatusCode::BAD_REQUEST,
            AuthError::Persistence(_) | AuthError::CorruptRecord | AuthError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = match self {
            AuthError::ValidationFailed(errors) => json!({ "errors": errors }),
            other => json!({ "error": other.to_string() }),
        };
        (status, Json(body)).into_response()
    }
}

pub type AuthResult<T> = Result<T, AuthError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn client_errors_map_to_bad_request() {
        assert_eq!(AuthError::DuplicateUser.status(), StatusCode::BAD_REQUEST);
        assert_eq!(AuthError::UserNotFound.status(), StatusCode::BAD_REQUEST);
        assert_eq!(AuthError::InvalidCredentials.status(), StatusCode::BAD_REQUEST);
        assert_eq!(AuthError::InvalidToken.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            AuthError::ValidationFailed(vec![]).status(),
            StatusCode::BAD_REQUEST
        );
    }

    #[test]
    fn server_side_failures_map_to_500() {
        assert_eq!(
            AuthError::Persistence("down".into()).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            AuthError::CorruptRecord.status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn directory_conflict_becomes_duplicate_user() {
        let err: AuthError = DirectoryError::Conflict.into();
        assert!(matches!(err, AuthError::DuplicateUser));
        let err: AuthError = DirectoryError::Backend("timeout".into()).into();
        assert!(matches!(err, AuthError::Persistence(m) if m == "timeout"));
    }
}
