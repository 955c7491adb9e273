//! Shared-secret gate for the back-office endpoints.

use axum::{extract::FromRequestParts, http::request::Parts};
use sha2::{Digest, Sha256};

use crate::errors::AdminError;
use crate::AppState;

pub const API_KEY_HEADER: &str = "x-api-key";

/// Passes only when `x-api-key` equals the configured admin key.
#[derive(Debug, Clone, Copy)]
pub struct RequireApiKey;

/// Compare fixed-size digests so the comparison does not depend on where
/// the first differing byte is.
fn keys_match(presented: &[u8], expected: &[u8]) -> bool {
    let a = Sha256::digest(presented);
    let b = Sha256::digest(expected);
    a.iter().zip(b.iter()).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

impl FromRequestParts<AppState> for RequireApiKey {
    type Rejection = AdminError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let presented = parts
            .headers
            .get(API_KEY_HEADER)
            .map(|v| v.as_bytes())
            .unwrap_or_default();

        if presented.is_empty() || !keys_match(presented, state.config.admin_api_key.as_bytes()) {
            tracing::warn!(path = %parts.uri.path(), "Rejected admin request with invalid API key");
            return Err(AdminError::Unauthorized);
        }
        Ok(RequireApiKey)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keys_match_only_on_equal_input() {
        assert!(keys_match(b"s3cret", b"s3cret"));
        assert!(!keys_match(b"s3cret", b"s3cre"));
        assert!(!keys_match(b"", b"s3cret"));
    }
}
