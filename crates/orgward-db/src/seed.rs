//! Reference-data seeding: the static role catalog, the provisionable
//! resource catalog, and the initial bootstrap gate.
//!
//! Seeding is idempotent and keyed on the unique display names and
//! internal keys, so it runs on every startup.

use serde::Deserialize;
use surrealdb::{Connection, Surreal};
use tracing::info;

use orgward_core::models::role::{
    ORGANIZATION_ADMIN_ROLE, SYSTEM_ADMIN_ROLE, USER_ADMIN_ROLE,
};
use orgward_core::models::setting::keys;
use orgward_core::permissions;
use orgward_core::{id, OrgwardError, OrgwardResult};

use crate::error::DbError;

struct RoleSeed {
    name: &'static str,
    permissions: &'static [&'static str],
}

const ROLE_SEEDS: &[RoleSeed] = &[
    RoleSeed {
        name: SYSTEM_ADMIN_ROLE,
        permissions: &[
            permissions::USER_CREATE,
            permissions::USER_UPDATE,
            permissions::USER_READ,
            permissions::ORGANIZATION_ROLES_ASSIGN,
            permissions::ORGANIZATION_CREATE,
            permissions::SYSTEM_ORGANIZATION_CREATE,
            permissions::SYSTEM_USER_CREATE,
            permissions::AWS_IAM_USER_CREATE,
            permissions::GCP_SERVICE_ACCOUNT_WRITE,
            permissions::GCP_SERVICE_ACCOUNT_READ,
        ],
    },
    RoleSeed {
        name: ORGANIZATION_ADMIN_ROLE,
        permissions: &[
            permissions::USER_CREATE,
            permissions::USER_UPDATE,
            permissions::USER_READ,
            permissions::ORGANIZATION_ROLES_ASSIGN,
            permissions::ORGANIZATION_CREATE,
            permissions::AWS_IAM_USER_CREATE,
            permissions::GCP_SERVICE_ACCOUNT_WRITE,
            permissions::GCP_SERVICE_ACCOUNT_READ,
        ],
    },
    RoleSeed {
        name: USER_ADMIN_ROLE,
        permissions: &[
            permissions::USER_CREATE,
            permissions::USER_UPDATE,
            permissions::USER_READ,
        ],
    },
];

struct ResourceSeed {
    display_name: &'static str,
    internal_key: &'static str,
}

const RESOURCE_SEEDS: &[ResourceSeed] = &[
    ResourceSeed {
        display_name: "AWS IAM User",
        internal_key: "aws.iam.user",
    },
    ResourceSeed {
        display_name: "GCP Service Account",
        internal_key: "gcp.serviceaccount",
    },
    ResourceSeed {
        display_name: "GCP Service Account Key",
        internal_key: "gcp.serviceaccount.keys",
    },
];

#[derive(Debug, Deserialize)]
struct IdRow {
    #[allow(dead_code)]
    record_id: i64,
}

/// Seed roles, role permissions, the resource catalog, and the initial
/// `bootstrap.enabled` setting.
pub async fn seed_reference_data<C: Connection>(db: &Surreal<C>) -> OrgwardResult<()> {
    for seed in ROLE_SEEDS {
        seed_role(db, seed).await?;
    }

    for seed in RESOURCE_SEEDS {
        seed_resource(db, seed).await?;
    }

    // The bootstrap gate starts open on a fresh install and is never
    // reopened here once a value exists.
    let mut result = db
        // `value` is reserved in SurrealQL; the field name is escaped.
        .query("SELECT `value` FROM type::thing('setting', $key)")
        .bind(("key", keys::BOOTSTRAP_ENABLED))
        .await
        .map_err(DbError::from)?;
    let rows: Vec<serde_json::Value> = result.take(0).map_err(DbError::from)?;
    if rows.is_empty() {
        db.query("UPSERT type::thing('setting', $key) SET `value` = $value")
            .bind(("key", keys::BOOTSTRAP_ENABLED))
            .bind(("value", "true"))
            .await
            .map_err(DbError::from)?
            .check()
            .map_err(|e| OrgwardError::Database(e.to_string()))?;
        info!("Initialized bootstrap gate");
    }

    Ok(())
}

async fn seed_role<C: Connection>(db: &Surreal<C>, seed: &RoleSeed) -> OrgwardResult<()> {
    let mut result = db
        .query("SELECT meta::id(id) AS record_id FROM role WHERE display_name = $name")
        .bind(("name", seed.name))
        .await
        .map_err(DbError::from)?;
    let rows: Vec<IdRow> = result.take(0).map_err(DbError::from)?;
    if !rows.is_empty() {
        return Ok(());
    }

    let role_id = id::next_id();
    db.query("CREATE type::thing('role', $id) SET display_name = $name")
        .bind(("id", role_id))
        .bind(("name", seed.name))
        .await
        .map_err(DbError::from)?
        .check()
        .map_err(|e| OrgwardError::Database(e.to_string()))?;

    for permission in seed.permissions {
        db.query(
            "CREATE type::thing('role_permission', $id) SET \
             role_id = $role_id, permission = $permission",
        )
        .bind(("id", id::next_id()))
        .bind(("role_id", role_id))
        .bind(("permission", *permission))
        .await
        .map_err(DbError::from)?
        .check()
        .map_err(|e| OrgwardError::Database(e.to_string()))?;
    }

    info!(role = seed.name, "Seeded role");
    Ok(())
}

async fn seed_resource<C: Connection>(db: &Surreal<C>, seed: &ResourceSeed) -> OrgwardResult<()> {
    let mut result = db
        .query(
            "SELECT meta::id(id) AS record_id FROM registered_resource \
             WHERE internal_key = $key",
        )
        .bind(("key", seed.internal_key))
        .await
        .map_err(DbError::from)?;
    let rows: Vec<IdRow> = result.take(0).map_err(DbError::from)?;
    if !rows.is_empty() {
        return Ok(());
    }

    db.query(
        "CREATE type::thing('registered_resource', $id) SET \
         display_name = $name, internal_key = $key, enabled = true",
    )
    .bind(("id", id::next_id()))
    .bind(("name", seed.display_name))
    .bind(("key", seed.internal_key))
    .await
    .map_err(DbError::from)?
    .check()
    .map_err(|e| OrgwardError::Database(e.to_string()))?;

    info!(resource = seed.internal_key, "Seeded resource");
    Ok(())
}
