//! Session token decoding.
//!
//! The backend issues HMAC-signed JWTs. A browser client never holds the
//! signing secret, so by default only the claims are read. When a secret is
//! configured the signature is checked as well. Expiry is always judged
//! against the injected [`Clock`](super::Clock), not the library's own time.

use std::collections::HashSet;
use std::fmt;

use chrono::{DateTime, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, Validation, decode};
use serde::{Deserialize, Serialize};

use super::profile::Role;
use crate::error::Result;

/// Claims carried by a session token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenClaims {
    /// Subject. The backend puts the account email here.
    pub sub: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<Role>,
    /// Backend account id.
    #[serde(rename = "userId", default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<i64>,
    /// Issued at (UNIX seconds).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iat: Option<i64>,
    /// Expires at (UNIX seconds).
    pub exp: i64,
}

impl TokenClaims {
    /// Email claim, or the subject when the token has none.
    #[must_use]
    pub fn email(&self) -> &str {
        self.email.as_deref().unwrap_or(&self.sub)
    }

    #[must_use]
    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp(self.exp, 0)
    }

    /// True once `now` has reached the embedded expiry.
    #[must_use]
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.exp <= now.timestamp()
    }
}

/// Decodes session tokens, optionally verifying their signature.
#[derive(Clone)]
pub struct TokenDecoder {
    key: DecodingKey,
    validation: Validation,
    verified: bool,
}

impl fmt::Debug for TokenDecoder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenDecoder")
            .field("verified", &self.verified)
            .finish_non_exhaustive()
    }
}

impl TokenDecoder {
    /// Read claims without checking the signature.
    #[must_use]
    pub fn claims_only() -> Self {
        let mut validation = base_validation();
        validation.insecure_disable_signature_validation();
        Self {
            key: DecodingKey::from_secret(&[]),
            validation,
            verified: false,
        }
    }

    /// Verify HS256/HS384/HS512 signatures against `secret`.
    #[must_use]
    pub fn verified(secret: &[u8]) -> Self {
        Self {
            key: DecodingKey::from_secret(secret),
            validation: base_validation(),
            verified: true,
        }
    }

    /// Pick the mode from an optional secret.
    #[must_use]
    pub fn from_secret(secret: Option<&str>) -> Self {
        match secret.filter(|s| !s.is_empty()) {
            Some(secret) => Self::verified(secret.as_bytes()),
            None => Self::claims_only(),
        }
    }

    #[must_use]
    pub fn is_verified(&self) -> bool {
        self.verified
    }

    /// Decode `token`. Fails when the token is structurally corrupt or, in
    /// verified mode, badly signed. Expiry is not checked here.
    pub fn decode(&self, token: &str) -> Result<TokenClaims> {
        let data = decode::<TokenClaims>(token, &self.key, &self.validation)?;
        Ok(data.claims)
    }
}

fn base_validation() -> Validation {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.algorithms = vec![Algorithm::HS256, Algorithm::HS384, Algorithm::HS512];
    validation.validate_exp = false;
    validation.validate_nbf = false;
    validation.validate_aud = false;
    validation.required_spec_claims = HashSet::new();
    validation
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeDelta;
    use jsonwebtoken::{EncodingKey, Header, encode};

    fn mint(secret: &[u8], claims: &TokenClaims) -> String {
        encode(&Header::new(Algorithm::HS512), claims, &EncodingKey::from_secret(secret)).unwrap()
    }

    fn claims(exp: i64) -> TokenClaims {
        TokenClaims {
            sub: "ana@example.com".into(),
            email: None,
            role: Some(Role::Admin),
            user_id: Some(2),
            iat: Some(exp - 3600),
            exp,
        }
    }

    #[test]
    fn test_claims_only_ignores_signature() {
        let now = Utc::now();
        let token = mint(b"server-secret", &claims(now.timestamp() + 60));

        let decoded = TokenDecoder::claims_only().decode(&token).unwrap();
        assert_eq!(decoded.email(), "ana@example.com");
        assert_eq!(decoded.role, Some(Role::Admin));
        assert_eq!(decoded.user_id, Some(2));
        assert!(!decoded.is_expired(now));
    }

    #[test]
    fn test_verified_rejects_wrong_secret() {
        let token = mint(b"server-secret", &claims(Utc::now().timestamp() + 60));

        assert!(TokenDecoder::verified(b"server-secret").decode(&token).is_ok());
        assert!(TokenDecoder::verified(b"other-secret").decode(&token).is_err());
    }

    #[test]
    fn test_expired_token_still_decodes() {
        let now = Utc::now();
        let token = mint(b"k", &claims(now.timestamp() - 10));

        let decoded = TokenDecoder::claims_only().decode(&token).unwrap();
        assert!(decoded.is_expired(now));
        assert!(decoded.is_expired(now - TimeDelta::seconds(10)));
        assert!(!decoded.is_expired(now - TimeDelta::seconds(11)));
    }

    #[test]
    fn test_garbage_is_rejected() {
        let decoder = TokenDecoder::claims_only();
        assert!(decoder.decode("not-a-jwt").is_err());
        assert!(decoder.decode("a.b.c").is_err());
        assert!(decoder.decode("").is_err());
    }

    #[test]
    fn test_unknown_role_is_corrupt() {
        let payload = serde_json::json!({ "sub": "x", "role": "PILOT", "exp": 4_000_000_000_i64 });
        let token = encode(
            &Header::new(Algorithm::HS256),
            &payload,
            &EncodingKey::from_secret(b"k"),
        )
        .unwrap();
        assert!(TokenDecoder::claims_only().decode(&token).is_err());
    }

    #[test]
    fn test_empty_secret_means_claims_only() {
        assert!(!TokenDecoder::from_secret(Some("")).is_verified());
        assert!(TokenDecoder::from_secret(Some("s")).is_verified());
        assert!(!TokenDecoder::from_secret(None).is_verified());
    }
}
