//! SurrealDB implementation of [`AuditRepository`].

use chrono::DateTime;
use orgward_core::error::OrgwardResult;
use orgward_core::models::audit::{AuditRecord, AuditState};
use orgward_core::repository::AuditRepository;
use serde::Deserialize;
use surrealdb::{Connection, Surreal};

use crate::error::DbError;

// The created timestamp is read back as a unix epoch so it never has to
// round-trip through the driver's datetime encoding.
#[derive(Debug, Deserialize)]
struct AuditRow {
    record_id: i64,
    created_unix: i64,
    organization_user_id: i64,
    organization_id: i64,
    internal_key: String,
    method: String,
    metadata: serde_json::Value,
    human_readable: String,
    current_state: AuditState,
}

impl From<AuditRow> for AuditRecord {
    fn from(row: AuditRow) -> Self {
        AuditRecord {
            id: row.record_id,
            created: DateTime::from_timestamp(row.created_unix, 0).unwrap_or_default(),
            organization_user_id: row.organization_user_id,
            organization_id: row.organization_id,
            internal_key: row.internal_key,
            method: row.method,
            metadata: row.metadata,
            human_readable: row.human_readable,
            current_state: row.current_state,
        }
    }
}

/// SurrealDB implementation of the two-phase audit store.
#[derive(Clone)]
pub struct SurrealAuditRepository<C: Connection> {
    db: Surreal<C>,
}

impl<C: Connection> SurrealAuditRepository<C> {
    pub fn new(db: Surreal<C>) -> Self {
        Self { db }
    }
}

impl<C: Connection> AuditRepository for SurrealAuditRepository<C> {
    async fn open(&self, record: AuditRecord) -> OrgwardResult<AuditRecord> {
        let id = record.id;
        self.db
            .query(
                "CREATE type::thing('audit_log', $id) SET \
                 organization_user_id = $actor, \
                 organization_id = $organization, \
                 internal_key = $internal_key, method = $method, \
                 metadata = $metadata, human_readable = '', \
                 current_state = 0",
            )
            .bind(("id", id))
            .bind(("actor", record.organization_user_id))
            .bind(("organization", record.organization_id))
            .bind(("internal_key", record.internal_key))
            .bind(("method", record.method))
            .bind(("metadata", record.metadata))
            .await
            .map_err(DbError::from)?
            .check()
            .map_err(|e| DbError::Query(e.to_string()))?;

        self.get_by_id(id).await
    }

    async fn seal(
        &self,
        id: i64,
        human_readable: &str,
        metadata: serde_json::Value,
    ) -> OrgwardResult<()> {
        // Guarded on Open state: sealing an already sealed record is a
        // no-op rather than an error.
        self.db
            .query(
                "UPDATE type::thing('audit_log', $id) SET \
                 human_readable = $human_readable, metadata = $metadata, \
                 current_state = 1 WHERE current_state = 0",
            )
            .bind(("id", id))
            .bind(("human_readable", human_readable.to_string()))
            .bind(("metadata", metadata))
            .await
            .map_err(DbError::from)?
            .check()
            .map_err(|e| DbError::Query(e.to_string()))?;

        Ok(())
    }

    async fn get_by_id(&self, id: i64) -> OrgwardResult<AuditRecord> {
        let mut result = self
            .db
            .query(
                "SELECT meta::id(id) AS record_id, \
                 time::unix(created) AS created_unix, \
                 organization_user_id, organization_id, internal_key, \
                 method, metadata, human_readable, current_state \
                 FROM type::thing('audit_log', $id)",
            )
            .bind(("id", id))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<AuditRow> = result.take(0).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: "audit_log".into(),
            id: id.to_string(),
        })?;

        Ok(row.into())
    }
}
