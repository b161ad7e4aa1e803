//! SurrealDB implementation of [`ResourceRepository`].
//!
//! Each resource kind has its own state table; provider state is an
//! opaque flexible object decoded only by the owning action.

use orgward_core::error::OrgwardResult;
use orgward_core::models::resource::{ProvisionRecord, RegisteredResource, ResourceKind};
use orgward_core::repository::ResourceRepository;
use serde::Deserialize;
use surrealdb::{Connection, Surreal};

use crate::error::DbError;

fn table_for(kind: ResourceKind) -> &'static str {
    match kind {
        ResourceKind::AwsIamUser => "resource_aws_iam",
        ResourceKind::GcpServiceAccount => "resource_gcp_service_account",
    }
}

#[derive(Debug, Deserialize)]
struct RegisteredRow {
    record_id: i64,
    display_name: String,
    internal_key: String,
    enabled: bool,
}

#[derive(Debug, Deserialize)]
struct RecordRow {
    record_id: i64,
    external_ref: String,
    state: serde_json::Value,
}

impl From<RecordRow> for ProvisionRecord {
    fn from(row: RecordRow) -> Self {
        ProvisionRecord {
            id: row.record_id,
            external_ref: row.external_ref,
            state: row.state,
        }
    }
}

/// SurrealDB implementation of the provisionable-resource store.
#[derive(Clone)]
pub struct SurrealResourceRepository<C: Connection> {
    db: Surreal<C>,
}

impl<C: Connection> SurrealResourceRepository<C> {
    pub fn new(db: Surreal<C>) -> Self {
        Self { db }
    }
}

impl<C: Connection> ResourceRepository for SurrealResourceRepository<C> {
    async fn list_registered(&self) -> OrgwardResult<Vec<RegisteredResource>> {
        let mut result = self
            .db
            .query(
                "SELECT meta::id(id) AS record_id, display_name, \
                 internal_key, enabled FROM registered_resource \
                 ORDER BY internal_key ASC",
            )
            .await
            .map_err(DbError::from)?;

        let rows: Vec<RegisteredRow> = result.take(0).map_err(DbError::from)?;
        Ok(rows
            .into_iter()
            .map(|row| RegisteredResource {
                id: row.record_id,
                display_name: row.display_name,
                internal_key: row.internal_key,
                enabled: row.enabled,
            })
            .collect())
    }

    async fn create_record(&self, kind: ResourceKind, record: ProvisionRecord) -> OrgwardResult<()> {
        let query = format!(
            "CREATE type::thing('{}', $id) SET \
             external_ref = $external_ref, state = $state",
            table_for(kind),
        );

        self.db
            .query(query)
            .bind(("id", record.id))
            .bind(("external_ref", record.external_ref))
            .bind(("state", record.state))
            .await
            .map_err(DbError::from)?
            .check()
            .map_err(|e| DbError::Query(e.to_string()))?;

        Ok(())
    }

    async fn get_record(
        &self,
        kind: ResourceKind,
        id: i64,
    ) -> OrgwardResult<Option<ProvisionRecord>> {
        let query = format!(
            "SELECT meta::id(id) AS record_id, external_ref, state \
             FROM type::thing('{}', $id)",
            table_for(kind),
        );

        let mut result = self
            .db
            .query(query)
            .bind(("id", id))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<RecordRow> = result.take(0).map_err(DbError::from)?;
        Ok(rows.into_iter().next().map(ProvisionRecord::from))
    }

    async fn get_record_by_ref(
        &self,
        kind: ResourceKind,
        external_ref: &str,
    ) -> OrgwardResult<Option<ProvisionRecord>> {
        let query = format!(
            "SELECT meta::id(id) AS record_id, external_ref, state \
             FROM {} WHERE external_ref = $external_ref",
            table_for(kind),
        );

        let mut result = self
            .db
            .query(query)
            .bind(("external_ref", external_ref.to_string()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<RecordRow> = result.take(0).map_err(DbError::from)?;
        Ok(rows.into_iter().next().map(ProvisionRecord::from))
    }

    async fn update_record_state(
        &self,
        kind: ResourceKind,
        id: i64,
        state: serde_json::Value,
    ) -> OrgwardResult<()> {
        let query = format!(
            "UPDATE type::thing('{}', $id) SET state = $state",
            table_for(kind),
        );

        self.db
            .query(query)
            .bind(("id", id))
            .bind(("state", state))
            .await
            .map_err(DbError::from)?
            .check()
            .map_err(|e| DbError::Query(e.to_string()))?;

        Ok(())
    }

    async fn list_records(&self, kind: ResourceKind) -> OrgwardResult<Vec<ProvisionRecord>> {
        let query = format!(
            "SELECT meta::id(id) AS record_id, external_ref, state \
             FROM {} ORDER BY external_ref ASC",
            table_for(kind),
        );

        let mut result = self.db.query(query).await.map_err(DbError::from)?;

        let rows: Vec<RecordRow> = result.take(0).map_err(DbError::from)?;
        Ok(rows.into_iter().map(ProvisionRecord::from).collect())
    }
}
