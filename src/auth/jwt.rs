//! JWT token generation and validation
//!
//! HS256 tokens carry the account id, identifier, role, and a token
//! version. Incrementing the stored token version invalidates every
//! outstanding token for that account.

use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};

use crate::auth::Role;
use crate::types::TrackError;

const DEV_SECRET: &str = "dev-only-insecure-secret";
const MIN_SECRET_LEN: usize = 16;

/// Claims embedded in every Stagetrack token
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Account id (ObjectId hex)
    pub sub: String,
    /// Login identifier (email or username)
    pub identifier: String,
    /// Account role at issue time
    pub role: Role,
    /// Token version for bulk invalidation
    #[serde(default)]
    pub token_version: i32,
    /// Issued-at (unix seconds)
    pub iat: u64,
    /// Expiry (unix seconds)
    pub exp: u64,
}

/// Input for token generation
#[derive(Debug, Clone)]
pub struct TokenInput {
    pub account_id: String,
    pub identifier: String,
    pub role: Role,
    pub token_version: i32,
}

/// Result of token verification
#[derive(Debug)]
pub struct TokenValidationResult {
    pub valid: bool,
    pub claims: Option<Claims>,
    pub error: Option<String>,
}

/// JWT encoder/validator bound to one secret
pub struct JwtValidator {
    encoding: EncodingKey,
    decoding: DecodingKey,
    expiry_seconds: u64,
}

impl JwtValidator {
    /// Create a validator with the given secret and token lifetime
    pub fn new(secret: String, expiry_seconds: u64) -> Result<Self, TrackError> {
        if secret.len() < MIN_SECRET_LEN {
            return Err(TrackError::Auth(format!(
                "JWT secret must be at least {MIN_SECRET_LEN} characters"
            )));
        }
        Ok(Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            expiry_seconds,
        })
    }

    /// Development-mode validator with a fixed insecure secret
    pub fn new_dev() -> Self {
        Self {
            encoding: EncodingKey::from_secret(DEV_SECRET.as_bytes()),
            decoding: DecodingKey::from_secret(DEV_SECRET.as_bytes()),
            expiry_seconds: 86400,
        }
    }

    /// Generate a token, returning (token, expires_at unix seconds)
    pub fn generate_token(&self, input: TokenInput) -> Result<(String, u64), TrackError> {
        let now = unix_now();
        let exp = now + self.expiry_seconds;

        let claims = Claims {
            sub: input.account_id,
            identifier: input.identifier,
            role: input.role,
            token_version: input.token_version,
            iat: now,
            exp,
        };

        let token = encode(&Header::default(), &claims, &self.encoding)
            .map_err(|e| TrackError::Auth(format!("Failed to sign token: {e}")))?;

        Ok((token, exp))
    }

    /// Verify a token's signature and expiry
    pub fn verify_token(&self, token: &str) -> TokenValidationResult {
        let validation = Validation::default();
        match decode::<Claims>(token, &self.decoding, &validation) {
            Ok(data) => TokenValidationResult {
                valid: true,
                claims: Some(data.claims),
                error: None,
            },
            Err(e) => TokenValidationResult {
                valid: false,
                claims: None,
                error: Some(e.to_string()),
            },
        }
    }
}

/// Extract a bearer token from an Authorization header value
pub fn extract_token_from_header(header: Option<&str>) -> Option<&str> {
    let header = header?;
    header
        .strip_prefix("Bearer ")
        .or_else(|| header.strip_prefix("bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty())
}

fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn validator() -> JwtValidator {
        JwtValidator::new("test-secret-at-least-16-chars".to_string(), 3600).unwrap()
    }

    fn input() -> TokenInput {
        TokenInput {
            account_id: "64f0c0ffee0000000000aaaa".to_string(),
            identifier: "manager@example.com".to_string(),
            role: Role::Manager,
            token_version: 1,
        }
    }

    #[test]
    fn test_generate_and_verify() {
        let jwt = validator();
        let (token, exp) = jwt.generate_token(input()).unwrap();
        assert!(exp > unix_now());

        let result = jwt.verify_token(&token);
        assert!(result.valid);
        let claims = result.claims.unwrap();
        assert_eq!(claims.sub, "64f0c0ffee0000000000aaaa");
        assert_eq!(claims.role, Role::Manager);
        assert_eq!(claims.token_version, 1);
    }

    #[test]
    fn test_wrong_secret_rejected() {
        let jwt = validator();
        let (token, _) = jwt.generate_token(input()).unwrap();

        let other = JwtValidator::new("another-secret-16-chars-x".to_string(), 3600).unwrap();
        let result = other.verify_token(&token);
        assert!(!result.valid);
        assert!(result.claims.is_none());
    }

    #[test]
    fn test_garbage_token_rejected() {
        let jwt = validator();
        let result = jwt.verify_token("not.a.token");
        assert!(!result.valid);
        assert!(result.error.is_some());
    }

    #[test]
    fn test_short_secret_rejected() {
        assert!(JwtValidator::new("short".to_string(), 3600).is_err());
    }

    #[test]
    fn test_extract_token_from_header() {
        assert_eq!(
            extract_token_from_header(Some("Bearer abc.def.ghi")),
            Some("abc.def.ghi")
        );
        assert_eq!(
            extract_token_from_header(Some("bearer abc.def.ghi")),
            Some("abc.def.ghi")
        );
        assert_eq!(extract_token_from_header(Some("Basic dXNlcg==")), None);
        assert_eq!(extract_token_from_header(Some("Bearer ")), None);
        assert_eq!(extract_token_from_header(None), None);
    }
}
