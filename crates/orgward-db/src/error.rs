//! Database-specific error types and conversions.

use orgward_core::error::OrgwardError;

/// Database-layer error type.
#[derive(Debug, thiserror::Error)]
pub enum DbError {
    #[error("SurrealDB error: {0}")]
    Surreal(#[from] surrealdb::Error),

    #[error("Migration failed: {0}")]
    Migration(String),

    #[error("Query failed: {0}")]
    Query(String),

    #[error("Record not found: {entity} with id {id}")]
    NotFound { entity: String, id: String },
}

impl From<DbError> for OrgwardError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::NotFound { entity, id } => OrgwardError::NotFound { entity, id },
            other => OrgwardError::Database(other.to_string()),
        }
    }
}
