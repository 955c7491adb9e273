//! Session resolution from the auth provider's access tokens.
//!
//! Tokens are issued elsewhere (HS256, `sub` = user id, audience
//! `authenticated` by default). This service only validates them and turns
//! them into an explicit [`Session`] passed to every aggregator call.

use chrono::{Duration, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::errors::AppError;

/// JWT claims the service reads from an access token.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    pub sub: String,
    pub aud: String,
    pub exp: i64,
    pub iat: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
}

impl Claims {
    pub fn user_id(&self) -> Result<Uuid, AppError> {
        self.sub.parse().map_err(|_| AppError::Unauthorized)
    }
}

/// Resolved caller identity; `user_id` is `None` for anonymous requests.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Session {
    pub user_id: Option<Uuid>,
}

impl Session {
    pub fn anonymous() -> Self {
        Self { user_id: None }
    }

    pub fn for_user(user_id: Uuid) -> Self {
        Self {
            user_id: Some(user_id),
        }
    }
}

/// Validate a JWT and return the claims.
pub fn validate_token(token: &str, jwt_secret: &str, audience: &str) -> Result<Claims, AppError> {
    let decoding_key = DecodingKey::from_secret(jwt_secret.as_bytes());
    let mut validation = Validation::new(Algorithm::HS256);
    validation.set_audience(&[audience]);

    jsonwebtoken::decode::<Claims>(token, &decoding_key, &validation)
        .map(|data| data.claims)
        .map_err(|e| {
            tracing::debug!(error = %e, "Rejected access token");
            AppError::Unauthorized
        })
}

/// Issue an access token in the auth provider's format (seed data and tests).
pub fn issue_token(
    user_id: Uuid,
    jwt_secret: &str,
    audience: &str,
    expiry_secs: i64,
) -> Result<String, AppError> {
    let now = Utc::now();
    let claims = Claims {
        sub: user_id.to_string(),
        aud: audience.to_string(),
        exp: (now + Duration::seconds(expiry_secs)).timestamp(),
        iat: now.timestamp(),
        email: None,
        role: Some("authenticated".to_string()),
    };
    let encoding_key = EncodingKey::from_secret(jwt_secret.as_bytes());
    jsonwebtoken::encode(&Header::new(Algorithm::HS256), &claims, &encoding_key)
        .map_err(|e| AppError::Internal(format!("Token generation failed: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "test-secret-key-for-jwt";
    const AUD: &str = "authenticated";

    #[test]
    fn token_generation_and_validation() {
        let user = Uuid::new_v4();
        let token = issue_token(user, SECRET, AUD, 900).unwrap();
        let claims = validate_token(&token, SECRET, AUD).unwrap();
        assert_eq!(claims.user_id().unwrap(), user);
        assert_eq!(claims.aud, AUD);
    }

    #[test]
    fn invalid_token_rejected() {
        let result = validate_token("garbage.token.here", SECRET, AUD);
        assert!(matches!(result, Err(AppError::Unauthorized)));
    }

    #[test]
    fn wrong_secret_or_audience_rejected() {
        let token = issue_token(Uuid::new_v4(), SECRET, AUD, 900).unwrap();
        assert!(validate_token(&token, "other-secret", AUD).is_err());
        assert!(validate_token(&token, SECRET, "service_role").is_err());
    }

    #[test]
    fn expired_token_rejected() {
        // Well beyond the default 60s leeway
        let token = issue_token(Uuid::new_v4(), SECRET, AUD, -3600).unwrap();
        assert!(validate_token(&token, SECRET, AUD).is_err());
    }

    #[test]
    fn non_uuid_subject_is_unauthorized() {
        let claims = Claims {
            sub: "service".to_string(),
            aud: AUD.to_string(),
            exp: 0,
            iat: 0,
            email: None,
            role: None,
        };
        assert!(matches!(claims.user_id(), Err(AppError::Unauthorized)));
    }
}
