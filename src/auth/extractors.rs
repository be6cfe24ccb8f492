use axum::{
    async_trait,
    extract::{rejection::JsonRejection, FromRef, FromRequest, FromRequestParts, Request},
    http::request::Parts,
    Json,
};
use serde_json::{Map, Value};
use tracing::warn;
use uuid::Uuid;

use super::jwt::JwtKeys;
use crate::error::{AuthError, FieldError};

/// Header carrying the session token, both on login responses and on requests.
pub const AUTH_TOKEN_HEADER: &str = "auth-token";

/// Verifies the `auth-token` header, returning the user ID.
pub struct SessionUser(pub Uuid);

#[async_trait]
impl<S> FromRequestParts<S> for SessionUser
where
    S: Send + Sync,
    JwtKeys: FromRef<S>,
{
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let token = parts
            .headers
            .get(AUTH_TOKEN_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .ok_or_else(|| {
                warn!("missing auth-token header");
                AuthError::InvalidToken
            })?;

        let keys = JwtKeys::from_ref(state);
        let user_id = keys.verify(token).map_err(|e| {
            warn!("invalid session token");
            e
        })?;
        Ok(SessionUser(user_id))
    }
}

/// Untyped request body handed to the validation stage.
///
/// A body sent without a JSON content type is read as `{}` so the request
/// fails validation with every missing field listed. Unparseable JSON is a
/// validation failure on `body`.
pub struct JsonBody(pub Value);

#[async_trait]
impl<S> FromRequest<S> for JsonBody
where
    S: Send + Sync,
{
    type Rejection = AuthError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        match Json::<Value>::from_request(req, state).await {
            Ok(Json(body)) => Ok(JsonBody(body)),
            Err(JsonRejection::MissingJsonContentType(_)) => Ok(JsonBody(Value::Object(Map::new()))),
            Err(rejection) => {
                warn!(error = %rejection.body_text(), "unreadable json body");
                Err(AuthError::ValidationFailed(vec![FieldError::new(
                    "body",
                    rejection.body_text(),
                )]))
            }
        }
    }
}
