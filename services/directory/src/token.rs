//! Session token service
//!
//! This module issues and validates the compact bearer tokens that bind a
//! username and role set, signed with HMAC-SHA256 using a server-held
//! symmetric secret injected at startup. Role claims embedded in a token
//! are advisory only; authorization decisions always re-derive permissions
//! from the stored user record so revocations take effect on the next
//! lookup, not at token expiry.

use anyhow::Result;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::time::{SystemTime, UNIX_EPOCH};

use crate::error::AuthError;
use crate::models::Role;

/// Token configuration
#[derive(Debug, Clone)]
pub struct TokenConfig {
    /// Symmetric signing secret
    pub secret: String,
    /// Token expiration time in seconds (default: 24 hours)
    pub expiry_seconds: u64,
}

impl TokenConfig {
    /// Create a new TokenConfig from environment variables
    ///
    /// # Environment Variables
    /// - `SHELFMARK_TOKEN_SECRET`: signing secret (required)
    /// - `SHELFMARK_TOKEN_EXPIRY`: expiry in seconds (default: 86400)
    pub fn from_env() -> Result<Self> {
        let secret = std::env::var("SHELFMARK_TOKEN_SECRET")
            .map_err(|_| anyhow::anyhow!("SHELFMARK_TOKEN_SECRET environment variable not set"))?;

        let expiry_seconds = std::env::var("SHELFMARK_TOKEN_EXPIRY")
            .unwrap_or_else(|_| "86400".to_string())
            .parse()
            .unwrap_or(86_400);

        Ok(TokenConfig {
            secret,
            expiry_seconds,
        })
    }
}

/// Session token claims
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    /// Username
    pub sub: String,
    /// Role set at issuance, advisory only
    pub roles: Vec<Role>,
    /// Issued at time
    pub iat: u64,
    /// Expiration time
    pub exp: u64,
}

/// Session token service
#[derive(Clone)]
pub struct TokenService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
    expiry_seconds: u64,
}

impl TokenService {
    /// Initialize a new token service
    pub fn new(config: &TokenConfig) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = true;
        validation.leeway = 0;

        TokenService {
            encoding_key: EncodingKey::from_secret(config.secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(config.secret.as_bytes()),
            validation,
            expiry_seconds: config.expiry_seconds,
        }
    }

    /// Issue a session token for a user
    pub fn issue(&self, username: &str, roles: &BTreeSet<Role>) -> Result<String> {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map_err(|e| anyhow::anyhow!("Failed to get current time: {}", e))?
            .as_secs();

        let claims = Claims {
            sub: username.to_string(),
            roles: roles.iter().copied().collect(),
            iat: now,
            exp: now + self.expiry_seconds,
        };

        let token = encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &self.encoding_key,
        )?;
        Ok(token)
    }

    /// Validate a token and return the claims
    ///
    /// Fails with `InvalidToken` when the signature does not verify, the
    /// structure is malformed, or the token has expired.
    pub fn verify(&self, token: &str) -> Result<Claims, AuthError> {
        decode::<Claims>(token, &self.decoding_key, &self.validation)
            .map(|data| data.claims)
            .map_err(|_| AuthError::InvalidToken)
    }

    /// Get the token expiry time in seconds
    pub fn expiry_seconds(&self) -> u64 {
        self.expiry_seconds
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_service() -> TokenService {
        TokenService::new(&TokenConfig {
            secret: "test-secret".to_string(),
            expiry_seconds: 86_400,
        })
    }

    fn roles(list: &[Role]) -> BTreeSet<Role> {
        list.iter().copied().collect()
    }

    #[test]
    fn verify_accepts_freshly_issued_token() {
        let service = test_service();
        let token = service.issue("alice", &roles(&[Role::Editor])).unwrap();

        let claims = service.verify(&token).unwrap();
        assert_eq!(claims.sub, "alice");
        assert_eq!(claims.roles, vec![Role::Editor]);
        assert_eq!(claims.exp, claims.iat + 86_400);
    }

    #[test]
    fn verify_rejects_tampered_token() {
        let service = test_service();
        let token = service.issue("alice", &roles(&[Role::Viewer])).unwrap();

        // Flip a character in the signature segment
        let mut tampered = token.clone();
        let last = tampered.pop().unwrap();
        tampered.push(if last == 'A' { 'B' } else { 'A' });

        assert_eq!(service.verify(&tampered).unwrap_err(), AuthError::InvalidToken);
    }

    #[test]
    fn verify_rejects_token_signed_with_other_secret() {
        let service = test_service();
        let other = TokenService::new(&TokenConfig {
            secret: "other-secret".to_string(),
            expiry_seconds: 86_400,
        });

        let token = other.issue("alice", &roles(&[Role::Viewer])).unwrap();
        assert_eq!(service.verify(&token).unwrap_err(), AuthError::InvalidToken);
    }

    #[test]
    fn verify_rejects_expired_token() {
        let service = test_service();

        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap()
            .as_secs();
        let claims = Claims {
            sub: "alice".to_string(),
            roles: vec![Role::Viewer],
            iat: now - 7_200,
            exp: now - 3_600,
        };
        let expired = encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(b"test-secret"),
        )
        .unwrap();

        assert_eq!(service.verify(&expired).unwrap_err(), AuthError::InvalidToken);
    }

    #[test]
    fn verify_rejects_garbage() {
        let service = test_service();
        assert_eq!(
            service.verify("not-a-token").unwrap_err(),
            AuthError::InvalidToken
        );
    }
}
