use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use chrono::{TimeZone, Utc};
use hmac::{Hmac, Mac};
use sha2::Sha256;
use thiserror::Error;
use tracing::debug;

use shared_models::auth::{JwtClaims, User};

type HmacSha256 = Hmac<Sha256>;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TokenError {
    #[error("JWT secret is not set")]
    MissingSecret,

    #[error("Invalid token format")]
    Malformed,

    #[error("Invalid token signature")]
    BadSignature,

    #[error("Invalid claims format")]
    BadClaims,

    #[error("Token expired")]
    Expired,
}

/// Validate an HS256 token signed with the project's JWT secret.
///
/// Supabase puts `authenticated` in the top-level `role` claim, so the
/// application role is read from `app_metadata.role`, then
/// `user_metadata.role`, before falling back to the top-level claim.
pub fn validate_token(token: &str, jwt_secret: &str) -> Result<User, TokenError> {
    if jwt_secret.is_empty() {
        return Err(TokenError::MissingSecret);
    }

    let mut parts = token.split('.');
    let (header_b64, claims_b64, signature_b64) = match (parts.next(), parts.next(), parts.next(), parts.next()) {
        (Some(h), Some(c), Some(s), None) => (h, c, s),
        _ => return Err(TokenError::Malformed),
    };

    let signature = URL_SAFE_NO_PAD.decode(signature_b64).map_err(|e| {
        debug!("Failed to decode signature: {}", e);
        TokenError::Malformed
    })?;

    let mut mac = HmacSha256::new_from_slice(jwt_secret.as_bytes()).map_err(|_| TokenError::MissingSecret)?;
    mac.update(format!("{}.{}", header_b64, claims_b64).as_bytes());

    if mac.verify_slice(&signature).is_err() {
        debug!("Token signature verification failed");
        return Err(TokenError::BadSignature);
    }

    let claims_bytes = URL_SAFE_NO_PAD.decode(claims_b64).map_err(|_| TokenError::BadClaims)?;
    let claims: JwtClaims = serde_json::from_slice(&claims_bytes).map_err(|e| {
        debug!("Failed to parse claims: {}", e);
        TokenError::BadClaims
    })?;

    if let Some(exp) = claims.exp {
        let now = Utc::now().timestamp() as u64;
        if exp < now {
            debug!("Token expired at {} (now: {})", exp, now);
            return Err(TokenError::Expired);
        }
    }

    let role = metadata_role(claims.app_metadata.as_ref())
        .or_else(|| metadata_role(claims.user_metadata.as_ref()))
        .or(claims.role);

    let user = User {
        id: claims.sub,
        email: claims.email,
        role,
        metadata: claims.user_metadata,
        created_at: claims.iat.and_then(|ts| Utc.timestamp_opt(ts as i64, 0).single()),
    };

    debug!("Token validated successfully for user: {}", user.id);
    Ok(user)
}

fn metadata_role(metadata: Option<&serde_json::Value>) -> Option<String> {
    metadata?
        .get("role")?
        .as_str()
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{JwtTestUtils, TestUser};

    const SECRET: &str = "unit-test-secret";

    #[test]
    fn accepts_a_signed_token() {
        let user = TestUser::professional("pro@example.com");
        let token = JwtTestUtils::create_test_token(&user, SECRET, Some(1));

        let validated = validate_token(&token, SECRET).unwrap();
        assert_eq!(validated.id, user.id.to_string());
        assert_eq!(validated.role.as_deref(), Some("professional"));
    }

    #[test]
    fn rejects_wrong_secret_and_expiry() {
        let user = TestUser::client("client@example.com");

        let forged = JwtTestUtils::create_invalid_signature_token(&user);
        assert!(matches!(validate_token(&forged, SECRET), Err(TokenError::BadSignature)));

        let expired = JwtTestUtils::create_expired_token(&user, SECRET);
        assert!(matches!(validate_token(&expired, SECRET), Err(TokenError::Expired)));
    }

    #[test]
    fn rejects_malformed_input() {
        assert!(matches!(validate_token("a.b", SECRET), Err(TokenError::Malformed)));
        assert!(matches!(validate_token("a.b.c.d", SECRET), Err(TokenError::Malformed)));
        assert!(matches!(validate_token("a.b.c", ""), Err(TokenError::MissingSecret)));
    }

    #[test]
    fn metadata_role_wins_over_supabase_role() {
        let user = TestUser::client("client@example.com");
        let token = JwtTestUtils::create_supabase_token(&user, SECRET);

        let validated = validate_token(&token, SECRET).unwrap();
        assert_eq!(validated.role.as_deref(), Some("client"));
    }
}
