//! Error types for the Orgward system.
//!
//! Storage failures are always surfaced as values, never process-fatal.
//! The HTTP boundary maps each variant to a status code via
//! [`OrgwardError::status_code`].

use thiserror::Error;

#[derive(Debug, Error)]
pub enum OrgwardError {
    #[error("validation error: {message}")]
    Validation { message: String },

    /// Missing permission, self-action, or maker/checker violation.
    /// Deliberately carries no detail beyond "not authorized".
    #[error("not authorized")]
    Unauthorized,

    #[error("not found: {entity} with id {id}")]
    NotFound { entity: String, id: String },

    /// Required tenant metadata absent anywhere on the ancestor chain.
    #[error("precondition not met: {message}")]
    Precondition { message: String },

    #[error("bootstrap is not enabled")]
    BootstrapDisabled,

    #[error("database error: {0}")]
    Database(String),

    #[error("internal error: {0}")]
    Internal(String),
}

pub type OrgwardResult<T> = Result<T, OrgwardError>;

impl OrgwardError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    pub fn not_found(entity: impl Into<String>, id: impl ToString) -> Self {
        Self::NotFound {
            entity: entity.into(),
            id: id.to_string(),
        }
    }

    pub fn precondition(message: impl Into<String>) -> Self {
        Self::Precondition {
            message: message.into(),
        }
    }

    /// HTTP status the (out-of-scope) router should answer with.
    pub fn status_code(&self) -> u16 {
        match self {
            Self::Validation { .. } | Self::Precondition { .. } => 400,
            Self::Unauthorized => 401,
            Self::NotFound { .. } => 404,
            Self::BootstrapDisabled => 405,
            Self::Database(_) | Self::Internal(_) => 500,
        }
    }
}
