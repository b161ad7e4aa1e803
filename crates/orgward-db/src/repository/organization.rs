//! SurrealDB implementation of [`OrganizationRepository`].

use orgward_core::error::OrgwardResult;
use orgward_core::models::organization::{
    parse_path, Organization, OrganizationUserRef, ResolvedMetadata,
};
use orgward_core::repository::OrganizationRepository;
use serde::Deserialize;
use surrealdb::{Connection, Surreal};

use crate::error::DbError;

#[derive(Debug, Deserialize)]
struct OrganizationRow {
    record_id: i64,
    display_name: String,
    path: String,
    metadata: serde_json::Value,
}

impl From<OrganizationRow> for Organization {
    fn from(row: OrganizationRow) -> Self {
        Organization {
            id: row.record_id,
            display_name: row.display_name,
            path: row.path,
            metadata: row.metadata,
        }
    }
}

#[derive(Debug, Deserialize)]
struct PathRow {
    path: String,
}

#[derive(Debug, Deserialize)]
struct MetadataRow {
    record_id: i64,
    metadata: serde_json::Value,
}

#[derive(Debug, Deserialize)]
struct MemberRow {
    record_id: i64,
    display_name: String,
}

/// SurrealDB implementation of the organization tree store.
#[derive(Clone)]
pub struct SurrealOrganizationRepository<C: Connection> {
    db: Surreal<C>,
}

impl<C: Connection> SurrealOrganizationRepository<C> {
    pub fn new(db: Surreal<C>) -> Self {
        Self { db }
    }

    async fn get_path(&self, id: i64) -> Result<Option<String>, DbError> {
        let mut result = self
            .db
            .query("SELECT path FROM type::thing('organization', $id)")
            .bind(("id", id))
            .await?;
        let rows: Vec<PathRow> = result.take(0)?;
        Ok(rows.into_iter().next().map(|r| r.path))
    }
}

impl<C: Connection> OrganizationRepository for SurrealOrganizationRepository<C> {
    async fn create(&self, organization: Organization) -> OrgwardResult<Organization> {
        let mut result = self
            .db
            .query(
                "CREATE type::thing('organization', $id) SET \
                 display_name = $display_name, path = $path, \
                 metadata = $metadata \
                 RETURN meta::id(id) AS record_id, display_name, path, \
                 metadata",
            )
            .bind(("id", organization.id))
            .bind(("display_name", organization.display_name))
            .bind(("path", organization.path))
            .bind(("metadata", organization.metadata))
            .await
            .map_err(DbError::from)?
            .check()
            .map_err(|e| DbError::Query(e.to_string()))?;

        let rows: Vec<OrganizationRow> = result.take(0).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: "organization".into(),
            id: organization.id.to_string(),
        })?;

        Ok(row.into())
    }

    async fn get_by_id(&self, id: i64) -> OrgwardResult<Organization> {
        let mut result = self
            .db
            .query(
                "SELECT meta::id(id) AS record_id, display_name, path, \
                 metadata FROM type::thing('organization', $id)",
            )
            .bind(("id", id))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<OrganizationRow> = result.take(0).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: "organization".into(),
            id: id.to_string(),
        })?;

        Ok(row.into())
    }

    async fn list_subtree(&self, path: &str) -> OrgwardResult<Vec<Organization>> {
        let prefix = format!("{path}.");

        let mut result = self
            .db
            .query(
                "SELECT meta::id(id) AS record_id, display_name, path, \
                 metadata FROM organization \
                 WHERE path = $path OR string::starts_with(path, $prefix) \
                 ORDER BY path ASC",
            )
            .bind(("path", path.to_string()))
            .bind(("prefix", prefix))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<OrganizationRow> = result.take(0).map_err(DbError::from)?;
        Ok(rows.into_iter().map(Organization::from).collect())
    }

    async fn assign_to_parent(&self, child_id: i64, parent_id: i64) -> OrgwardResult<bool> {
        let Some(parent_path) = self.get_path(parent_id).await? else {
            return Ok(false);
        };
        if self.get_path(child_id).await?.is_none() {
            return Ok(false);
        }

        // Only the child row is rewritten; descendants keep their old
        // paths until they are re-parented themselves.
        let new_path = format!("{parent_path}.{child_id}");
        self.db
            .query("UPDATE type::thing('organization', $id) SET path = $path")
            .bind(("id", child_id))
            .bind(("path", new_path))
            .await
            .map_err(DbError::from)?
            .check()
            .map_err(|e| DbError::Query(e.to_string()))?;

        Ok(true)
    }

    async fn merge_metadata(&self, id: i64, metadata: serde_json::Value) -> OrgwardResult<()> {
        let current = self.get_by_id(id).await?;

        // Shallow merge: incoming keys replace colliding ones.
        let mut merged = match current.metadata {
            serde_json::Value::Object(map) => map,
            _ => serde_json::Map::new(),
        };
        if let serde_json::Value::Object(incoming) = metadata {
            for (key, value) in incoming {
                merged.insert(key, value);
            }
        }

        self.db
            .query("UPDATE type::thing('organization', $id) SET metadata = $metadata")
            .bind(("id", id))
            .bind(("metadata", serde_json::Value::Object(merged)))
            .await
            .map_err(DbError::from)?
            .check()
            .map_err(|e| DbError::Query(e.to_string()))?;

        Ok(())
    }

    async fn resolve_metadata(
        &self,
        path: &str,
        key: &str,
    ) -> OrgwardResult<Option<ResolvedMetadata>> {
        let ancestors = parse_path(path);
        if ancestors.is_empty() {
            return Ok(None);
        }

        let mut result = self
            .db
            .query(
                "SELECT meta::id(id) AS record_id, metadata \
                 FROM organization WHERE meta::id(id) IN $ids",
            )
            .bind(("ids", ancestors.clone()))
            .await
            .map_err(DbError::from)?;
        let rows: Vec<MetadataRow> = result.take(0).map_err(DbError::from)?;

        // Nearest definition wins: walk from the node itself toward the
        // root and stop at the first ancestor that defines the key.
        for id in ancestors.iter().rev() {
            let Some(row) = rows.iter().find(|r| r.record_id == *id) else {
                continue;
            };
            if let Some(value) = row.metadata.get(key) {
                if !value.is_null() {
                    return Ok(Some(ResolvedMetadata {
                        organization_id: *id,
                        metadata: row.metadata.clone(),
                    }));
                }
            }
        }

        Ok(None)
    }

    async fn list_members(&self, id: i64) -> OrgwardResult<Vec<OrganizationUserRef>> {
        let mut result = self
            .db
            .query(
                "SELECT meta::id(id) AS record_id, display_name \
                 FROM organization_user WHERE current_state = 1 \
                 AND meta::id(id) IN \
                 (SELECT VALUE user_id FROM organization_membership \
                 WHERE organization_id = $org) \
                 ORDER BY display_name",
            )
            .bind(("org", id))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<MemberRow> = result.take(0).map_err(DbError::from)?;
        Ok(rows
            .into_iter()
            .map(|r| OrganizationUserRef {
                id: r.record_id,
                display_name: r.display_name,
            })
            .collect())
    }
}
