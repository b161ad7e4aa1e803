//! Service-layer error types and conversions.

use orgward_core::error::OrgwardError;

/// Bearer token verification errors. All of them surface to callers as
/// `Unauthorized`; the variants exist for logging.
#[derive(Debug, thiserror::Error)]
pub enum TokenError {
    #[error("missing bearer token")]
    Missing,

    #[error("malformed authorization header")]
    Malformed,

    #[error("token expired")]
    Expired,

    #[error("token invalid: {0}")]
    Invalid(String),
}

impl From<TokenError> for OrgwardError {
    fn from(err: TokenError) -> Self {
        tracing::debug!(error = %err, "Bearer token rejected");
        OrgwardError::Unauthorized
    }
}
