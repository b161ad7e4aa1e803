//! Schema definitions and migration runner for SurrealDB.
//!
//! All table definitions use SCHEMAFULL mode for data integrity.
//! Record IDs are 64-bit integers generated application-side. Lifecycle
//! states are stored as ints with ASSERT constraints.

use serde::Deserialize;
use surrealdb::{Connection, Surreal};
use tracing::info;

use crate::error::DbError;

// -----------------------------------------------------------------------
// Migration tracking
// -----------------------------------------------------------------------

const MIGRATION_TABLE_DDL: &str = "\
DEFINE TABLE IF NOT EXISTS _migration SCHEMAFULL;
DEFINE FIELD IF NOT EXISTS version ON TABLE _migration TYPE int;
DEFINE FIELD IF NOT EXISTS name ON TABLE _migration TYPE string;
DEFINE FIELD IF NOT EXISTS applied_at ON TABLE _migration TYPE datetime \
    DEFAULT time::now();
DEFINE INDEX IF NOT EXISTS idx_migration_version ON TABLE _migration \
    COLUMNS version UNIQUE;
";

#[derive(Debug, Deserialize)]
struct MigrationRecord {
    version: u32,
    #[allow(dead_code)]
    name: String,
}

struct Migration {
    version: u32,
    name: &'static str,
    sql: &'static str,
}

static MIGRATIONS: &[Migration] = &[Migration {
    version: 1,
    name: "initial_schema",
    sql: SCHEMA_V1,
}];

// -----------------------------------------------------------------------
// Schema v1 — initial table definitions
// -----------------------------------------------------------------------

const SCHEMA_V1: &str = "\
-- =======================================================================
-- Organizations (materialized-path tree)
-- =======================================================================
DEFINE TABLE organization SCHEMAFULL;
DEFINE FIELD display_name ON TABLE organization TYPE string;
-- Dot-separated ancestor IDs from root to the node itself.
DEFINE FIELD path ON TABLE organization TYPE string;
DEFINE FIELD metadata ON TABLE organization TYPE object FLEXIBLE \
    DEFAULT {};
DEFINE FIELD created_at ON TABLE organization TYPE datetime \
    DEFAULT time::now();
DEFINE INDEX idx_organization_path ON TABLE organization COLUMNS path;

-- =======================================================================
-- Organization users (invite-based lifecycle)
-- =======================================================================
DEFINE TABLE organization_user SCHEMAFULL;
DEFINE FIELD display_name ON TABLE organization_user TYPE string;
-- 0 = Created, 1 = Active, 2 = Deactivated
DEFINE FIELD current_state ON TABLE organization_user TYPE int \
    ASSERT $value IN [0, 1, 2];
DEFINE FIELD invite_code ON TABLE organization_user TYPE int;
DEFINE FIELD idp_type ON TABLE organization_user TYPE option<string>;
DEFINE FIELD idp_credential_value ON TABLE organization_user \
    TYPE option<string>;
DEFINE FIELD created_at ON TABLE organization_user TYPE datetime \
    DEFAULT time::now();
DEFINE INDEX idx_user_invite_code ON TABLE organization_user \
    COLUMNS invite_code;
DEFINE INDEX idx_user_credential ON TABLE organization_user \
    COLUMNS idp_type, idp_credential_value;

-- =======================================================================
-- Organization membership
-- =======================================================================
DEFINE TABLE organization_membership SCHEMAFULL;
DEFINE FIELD user_id ON TABLE organization_membership TYPE int;
DEFINE FIELD organization_id ON TABLE organization_membership TYPE int;
-- Pair uniqueness is enforced via the composed record ID
-- [user_id, organization_id]; a composite UNIQUE index here breaks the
-- 2.6.5 planner's single-column lookups on this table.
DEFINE INDEX idx_membership_user ON TABLE organization_membership \
    COLUMNS user_id;
DEFINE INDEX idx_membership_org ON TABLE organization_membership \
    COLUMNS organization_id;

-- =======================================================================
-- Roles & permissions (seeded reference data)
-- =======================================================================
DEFINE TABLE role SCHEMAFULL;
DEFINE FIELD display_name ON TABLE role TYPE string;
DEFINE INDEX idx_role_name ON TABLE role COLUMNS display_name UNIQUE;

DEFINE TABLE role_permission SCHEMAFULL;
DEFINE FIELD role_id ON TABLE role_permission TYPE int;
DEFINE FIELD permission ON TABLE role_permission TYPE string;
DEFINE INDEX idx_role_permission_pair ON TABLE role_permission \
    COLUMNS role_id, permission UNIQUE;

-- NONE organization_id means a system-scope assignment.
DEFINE TABLE role_assignment SCHEMAFULL;
DEFINE FIELD user_id ON TABLE role_assignment TYPE int;
DEFINE FIELD role_id ON TABLE role_assignment TYPE int;
DEFINE FIELD organization_id ON TABLE role_assignment TYPE option<int>;
DEFINE INDEX idx_assignment_user ON TABLE role_assignment \
    COLUMNS user_id;

-- =======================================================================
-- Settings (record ID is the key)
-- =======================================================================
DEFINE TABLE setting SCHEMAFULL;
DEFINE FIELD value ON TABLE setting TYPE string;

-- =======================================================================
-- Audit log (two-phase: 0 = Open, 1 = Sealed)
-- =======================================================================
DEFINE TABLE audit_log SCHEMAFULL;
DEFINE FIELD created ON TABLE audit_log TYPE datetime \
    DEFAULT time::now();
DEFINE FIELD organization_user_id ON TABLE audit_log TYPE int;
DEFINE FIELD organization_id ON TABLE audit_log TYPE int;
DEFINE FIELD internal_key ON TABLE audit_log TYPE string;
DEFINE FIELD method ON TABLE audit_log TYPE string;
DEFINE FIELD metadata ON TABLE audit_log TYPE object FLEXIBLE \
    DEFAULT {};
DEFINE FIELD human_readable ON TABLE audit_log TYPE string;
DEFINE FIELD current_state ON TABLE audit_log TYPE int \
    ASSERT $value IN [0, 1];
DEFINE INDEX idx_audit_actor ON TABLE audit_log \
    COLUMNS organization_user_id;

-- =======================================================================
-- Provisionable resource catalog & per-kind state
-- =======================================================================
DEFINE TABLE registered_resource SCHEMAFULL;
DEFINE FIELD display_name ON TABLE registered_resource TYPE string;
DEFINE FIELD internal_key ON TABLE registered_resource TYPE string;
DEFINE FIELD enabled ON TABLE registered_resource TYPE bool \
    DEFAULT true;
DEFINE INDEX idx_resource_key ON TABLE registered_resource \
    COLUMNS internal_key UNIQUE;

DEFINE TABLE resource_aws_iam SCHEMAFULL;
DEFINE FIELD external_ref ON TABLE resource_aws_iam TYPE string;
DEFINE FIELD state ON TABLE resource_aws_iam TYPE object FLEXIBLE;
DEFINE INDEX idx_aws_iam_ref ON TABLE resource_aws_iam \
    COLUMNS external_ref UNIQUE;

DEFINE TABLE resource_gcp_service_account SCHEMAFULL;
DEFINE FIELD external_ref ON TABLE resource_gcp_service_account \
    TYPE string;
DEFINE FIELD state ON TABLE resource_gcp_service_account \
    TYPE object FLEXIBLE;
DEFINE INDEX idx_gcp_sa_ref ON TABLE resource_gcp_service_account \
    COLUMNS external_ref UNIQUE;
";

// -----------------------------------------------------------------------
// Public API
// -----------------------------------------------------------------------

/// Run all pending migrations against the given SurrealDB client.
///
/// Creates a `_migration` tracking table on first run, then applies
/// each migration whose version exceeds the current maximum.
pub async fn run_migrations<C: Connection>(db: &Surreal<C>) -> Result<(), DbError> {
    // Ensure migration tracking table exists (idempotent).
    db.query(MIGRATION_TABLE_DDL)
        .await?
        .check()
        .map_err(|e| DbError::Migration(e.to_string()))?;

    // Determine current schema version.
    let mut result = db
        .query("SELECT * FROM _migration ORDER BY version DESC LIMIT 1")
        .await?;
    let records: Vec<MigrationRecord> = result.take(0)?;
    let current_version = records.first().map(|m| m.version).unwrap_or(0);

    for migration in MIGRATIONS {
        if migration.version > current_version {
            info!(
                version = migration.version,
                name = migration.name,
                "Applying migration"
            );
            db.query(migration.sql).await?.check().map_err(|e| {
                DbError::Migration(format!(
                    "Migration v{} '{}' failed: {}",
                    migration.version, migration.name, e,
                ))
            })?;

            // Record the applied migration.
            db.query(
                "CREATE _migration SET version = $version, \
                 name = $name",
            )
            .bind(("version", migration.version))
            .bind(("name", migration.name))
            .await?
            .check()
            .map_err(|e| {
                DbError::Migration(format!(
                    "Failed to record migration v{}: {}",
                    migration.version, e,
                ))
            })?;

            info!(
                version = migration.version,
                "Migration applied successfully"
            );
        }
    }

    Ok(())
}

/// Returns the raw schema DDL for version 1.
///
/// Exposed for testing with in-memory SurrealDB instances that
/// bypass the migration runner.
pub fn schema_v1() -> &'static str {
    SCHEMA_V1
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn schema_v1_is_nonempty() {
        assert!(!SCHEMA_V1.is_empty());
    }

    #[test]
    fn migrations_are_ordered() {
        for window in MIGRATIONS.windows(2) {
            assert!(
                window[0].version < window[1].version,
                "Migrations must be in ascending version order"
            );
        }
    }
}
