use std::time::Duration;

use axum::extract::FromRef;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use time::{Duration as TimeDuration, OffsetDateTime};
use tracing::{debug, error};
use uuid::Uuid;

use crate::auth::claims::Claims;
use crate::config::TokenConfig;
use crate::error::{AuthError, AuthResult};
use crate::state::AppState;

/// HS256 session token signer/verifier built once from config.
#[derive(Clone)]
pub struct JwtKeys {
    encoding: EncodingKey,
    decoding: DecodingKey,
    issuer: String,
    ttl: Option<Duration>,
}

impl FromRef<AppState> for JwtKeys {
    fn from_ref(state: &AppState) -> Self {
        state.tokens.clone()
    }
}

fn expiry_after(now: OffsetDateTime, ttl: Duration) -> AuthResult<usize> {
    i64::try_from(ttl.as_secs())
        .ok()
        .and_then(|secs| now.checked_add(TimeDuration::seconds(secs)))
        .map(|exp| exp.unix_timestamp() as usize)
        .ok_or_else(|| AuthError::Internal("token ttl out of range".into()))
}

impl JwtKeys {
    pub fn from_config(cfg: &TokenConfig) -> Self {
        Self {
            encoding: EncodingKey::from_secret(cfg.secret.as_bytes()),
            decoding: DecodingKey::from_secret(cfg.secret.as_bytes()),
            issuer: cfg.issuer.clone(),
            ttl: cfg
                .ttl_minutes
                .map(|m| Duration::from_secs(m.max(0).unsigned_abs().saturating_mul(60))),
        }
    }

    fn validation(&self) -> Validation {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.required_spec_claims.clear();
        if self.ttl.is_some() {
            validation.required_spec_claims.insert("exp".to_string());
        }
        validation.set_issuer(std::slice::from_ref(&self.issuer));
        validation
    }

    pub fn issue(&self, user_id: Uuid) -> AuthResult<String> {
        let now = OffsetDateTime::now_utc();
        let exp = match self.ttl {
            Some(ttl) => Some(expiry_after(now, ttl)?),
            None => None,
        };
        let claims = Claims {
            sub: user_id,
            iat: now.unix_timestamp() as usize,
            iss: self.issuer.clone(),
            exp,
        };
        let token = encode(&Header::new(Algorithm::HS256), &claims, &self.encoding).map_err(|e| {
            error!(error = %e, "jwt sign failed");
            AuthError::Internal(e.to_string())
        })?;
        debug!(user_id = %user_id, "jwt signed");
        Ok(token)
    }

    pub fn decode_claims(&self, token: &str) -> AuthResult<Claims> {
        let data = decode::<Claims>(token, &self.decoding, &self.validation()).map_err(|e| {
            debug!(error = %e, "jwt rejected");
            AuthError::InvalidToken
        })?;
        Ok(data.claims)
    }

    /// Returns the subject of a correctly signed token.
    pub fn verify(&self, token: &str) -> AuthResult<Uuid> {
        let claims = self.decode_claims(token)?;
        debug!(user_id = %claims.sub, "jwt verified");
        Ok(claims.sub)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_keys(secret: &str, ttl_minutes: Option<i64>) -> JwtKeys {
        JwtKeys::from_config(&TokenConfig {
            secret: secret.into(),
            issuer: "test-issuer".into(),
            ttl_minutes,
        })
    }

    fn tamper(token: &str) -> String {
        let sig_start = token.rfind('.').expect("three segments") + 1;
        let mut bytes = token.as_bytes().to_vec();
        bytes[sig_start] = if bytes[sig_start] == b'A' { b'B' } else { b'A' };
        String::from_utf8(bytes).expect("ascii token")
    }

    #[test]
    fn issue_and_verify_roundtrip() {
        let keys = make_keys("dev-secret", None);
        let user_id = Uuid::new_v4();
        let token = keys.issue(user_id).expect("issue");
        assert_eq!(token.split('.').count(), 3);
        assert_eq!(keys.verify(&token).expect("verify"), user_id);
    }

    #[test]
    fn tokens_carry_no_expiry_by_default() {
        let keys = make_keys("dev-secret", None);
        let token = keys.issue(Uuid::new_v4()).expect("issue");
        let claims = keys.decode_claims(&token).expect("decode");
        assert!(claims.exp.is_none());
        assert_eq!(claims.iss, "test-issuer");
    }

    #[test]
    fn old_token_without_expiry_still_verifies() {
        let keys = make_keys("dev-secret", None);
        let user_id = Uuid::new_v4();
        let claims = Claims {
            sub: user_id,
            iat: 1_000_000,
            iss: "test-issuer".into(),
            exp: None,
        };
        let token = encode(&Header::default(), &claims, &keys.encoding).expect("encode");
        assert_eq!(keys.verify(&token).expect("verify"), user_id);
    }

    #[test]
    fn verify_rejects_tampered_token() {
        let keys = make_keys("dev-secret", None);
        let token = keys.issue(Uuid::new_v4()).expect("issue");
        let err = keys.verify(&tamper(&token)).unwrap_err();
        assert!(matches!(err, AuthError::InvalidToken));
    }

    #[test]
    fn verify_rejects_other_secret() {
        let good = make_keys("secret-one", None);
        let other = make_keys("secret-two", None);
        let token = good.issue(Uuid::new_v4()).expect("issue");
        assert!(matches!(other.verify(&token), Err(AuthError::InvalidToken)));
    }

    #[test]
    fn verify_rejects_garbage() {
        let keys = make_keys("dev-secret", None);
        assert!(matches!(keys.verify("not.a.jwt"), Err(AuthError::InvalidToken)));
        assert!(matches!(keys.verify(""), Err(AuthError::InvalidToken)));
    }

    #[test]
    fn configured_ttl_sets_and_enforces_expiry() {
        let keys = make_keys("dev-secret", Some(5));
        let token = keys.issue(Uuid::new_v4()).expect("issue");
        let claims = keys.decode_claims(&token).expect("decode");
        assert!(claims.exp.expect("exp set") > claims.iat);

        let expired = Claims {
            sub: Uuid::new_v4(),
            iat: 1_000_000,
            iss: "test-issuer".into(),
            exp: Some(1_000_600),
        };
        let token = encode(&Header::default(), &expired, &keys.encoding).expect("encode");
        assert!(matches!(keys.verify(&token), Err(AuthError::InvalidToken)));
    }

    #[test]
    fn oversized_ttl_fails_instead_of_overflowing() {
        let keys = make_keys("dev-secret", Some(i64::MAX));
        assert!(matches!(
            keys.issue(Uuid::new_v4()),
            Err(AuthError::Internal(_))
        ));
    }

    #[test]
    fn configured_ttl_requires_exp_claim() {
        let unbounded = make_keys("dev-secret", None);
        let bounded = make_keys("dev-secret", Some(5));
        let token = unbounded.issue(Uuid::new_v4()).expect("issue");
        assert!(matches!(bounded.verify(&token), Err(AuthError::InvalidToken)));
    }
}
