//! Bearer token parsing and verification.
//!
//! The [`Authenticator`] trait is the seam between the HTTP layer and
//! whatever identity provider signs tokens. [`StaticKeyAuthenticator`]
//! verifies HS256 tokens against a shared key and is the provider used
//! by the test environment and local deployments.

use chrono::Utc;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

use crate::error::TokenError;

/// The identity a verified token asserts: an IdP type plus the opaque
/// credential value bound to an organization user at invite redemption.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Subject {
    pub idp_type: String,
    pub credential: String,
}

/// Verifies a raw bearer token into a [`Subject`].
pub trait Authenticator: Send + Sync {
    fn verify(&self, token: &str) -> Result<Subject, TokenError>;
}

/// Claims carried by HS256 static-key tokens.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Subject, the credential bound to the organization user.
    pub sub: String,
    /// Issued-at (Unix timestamp).
    pub iat: i64,
    /// Expiration (Unix timestamp).
    pub exp: i64,
}

/// IdP type asserted by [`StaticKeyAuthenticator`].
pub const STATIC_IDP_TYPE: &str = "static";

/// HS256 shared-key verifier.
#[derive(Clone)]
pub struct StaticKeyAuthenticator {
    key: Vec<u8>,
}

impl StaticKeyAuthenticator {
    pub fn new(key: impl Into<Vec<u8>>) -> Self {
        Self { key: key.into() }
    }

    /// The all-zeros 64-byte key used by local and test deployments.
    pub fn insecure_default() -> Self {
        Self::new(vec![0u8; 64])
    }

    /// Sign a token for `credential`, valid for one hour. Intended for
    /// tests and local tooling.
    pub fn issue(&self, credential: &str) -> Result<String, TokenError> {
        let now = Utc::now().timestamp();
        let claims = Claims {
            sub: credential.to_string(),
            iat: now,
            exp: now + 3600,
        };
        jsonwebtoken::encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(&self.key),
        )
        .map_err(|e| TokenError::Invalid(e.to_string()))
    }
}

impl Authenticator for StaticKeyAuthenticator {
    fn verify(&self, token: &str) -> Result<Subject, TokenError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_required_spec_claims(&["sub", "exp"]);

        let data = jsonwebtoken::decode::<Claims>(
            token,
            &DecodingKey::from_secret(&self.key),
            &validation,
        )
        .map_err(|e| match e.kind() {
            jsonwebtoken::errors::ErrorKind::ExpiredSignature => TokenError::Expired,
            _ => TokenError::Invalid(e.to_string()),
        })?;

        Ok(Subject {
            idp_type: STATIC_IDP_TYPE.into(),
            credential: data.claims.sub,
        })
    }
}

/// Extract the raw token from an `Authorization: Bearer <token>` header
/// value. The scheme is matched case-insensitively.
pub fn parse_bearer(header: &str) -> Result<&str, TokenError> {
    let mut parts = header.splitn(2, ' ');
    let scheme = parts.next().unwrap_or_default();
    let token = parts.next().unwrap_or_default().trim();
    if !scheme.eq_ignore_ascii_case("bearer") || token.is_empty() || token.contains(' ') {
        return Err(TokenError::Malformed);
    }
    Ok(token)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bearer_parsing_accepts_either_case() {
        assert_eq!(parse_bearer("Bearer abc.def.ghi").unwrap(), "abc.def.ghi");
        assert_eq!(parse_bearer("bearer abc").unwrap(), "abc");
        assert!(parse_bearer("Basic abc").is_err());
        assert!(parse_bearer("Bearer").is_err());
        assert!(parse_bearer("Bearer two tokens").is_err());
    }

    #[test]
    fn static_key_round_trip() {
        let auth = StaticKeyAuthenticator::insecure_default();
        let token = auth.issue("alice@idp").unwrap();
        let subject = auth.verify(&token).unwrap();
        assert_eq!(subject.idp_type, STATIC_IDP_TYPE);
        assert_eq!(subject.credential, "alice@idp");
    }

    #[test]
    fn wrong_key_is_rejected() {
        let signer = StaticKeyAuthenticator::new(vec![1u8; 64]);
        let verifier = StaticKeyAuthenticator::insecure_default();
        let token = signer.issue("alice@idp").unwrap();
        assert!(verifier.verify(&token).is_err());
    }
}
