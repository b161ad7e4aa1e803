//! SurrealDB implementation of [`RbacRepository`].
//!
//! Permission checks are ancestor-inclusive: a role held at an
//! organization applies to the whole subtree below it, and the ancestor
//! set is read straight out of the organization's materialized path.

use orgward_core::error::OrgwardResult;
use orgward_core::id;
use orgward_core::models::organization::parse_path;
use orgward_core::models::role::Role;
use orgward_core::repository::RbacRepository;
use serde::Deserialize;
use surrealdb::{Connection, Surreal};

use crate::error::DbError;

#[derive(Debug, Deserialize)]
struct RoleRow {
    record_id: i64,
    display_name: String,
}

#[derive(Debug, Deserialize)]
struct CountRow {
    total: u64,
}

/// SurrealDB implementation of the role and permission store.
#[derive(Clone)]
pub struct SurrealRbacRepository<C: Connection> {
    db: Surreal<C>,
}

impl<C: Connection> SurrealRbacRepository<C> {
    pub fn new(db: Surreal<C>) -> Self {
        Self { db }
    }
}

impl<C: Connection> RbacRepository for SurrealRbacRepository<C> {
    async fn get_role_by_name(&self, name: &str) -> OrgwardResult<Role> {
        let mut result = self
            .db
            .query(
                "SELECT meta::id(id) AS record_id, display_name FROM role \
                 WHERE display_name = $name",
            )
            .bind(("name", name.to_string()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<RoleRow> = result.take(0).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: "role".into(),
            id: name.to_string(),
        })?;

        Ok(Role {
            id: row.record_id,
            display_name: row.display_name,
        })
    }

    async fn set_user_roles(
        &self,
        user_id: i64,
        organization_id: Option<i64>,
        role_ids: &[i64],
    ) -> OrgwardResult<()> {
        // Delete and recreate the scope's assignments in one transaction
        // so a failed insert never leaves the user with a partial set.
        let mut query = String::from(
            "BEGIN TRANSACTION; \
             DELETE role_assignment WHERE user_id = $user_id AND \
             organization_id = $organization_id; ",
        );
        for index in 0..role_ids.len() {
            query.push_str(&format!(
                "CREATE type::thing('role_assignment', $id_{index}) SET \
                 user_id = $user_id, role_id = $role_{index}, \
                 organization_id = $organization_id; ",
            ));
        }
        query.push_str("COMMIT TRANSACTION;");

        let mut builder = self
            .db
            .query(query)
            .bind(("user_id", user_id))
            .bind(("organization_id", organization_id));
        for (index, role_id) in role_ids.iter().enumerate() {
            builder = builder
                .bind((format!("id_{index}"), id::next_id()))
                .bind((format!("role_{index}"), *role_id));
        }

        builder
            .await
            .map_err(DbError::from)?
            .check()
            .map_err(|e| DbError::Query(e.to_string()))?;

        Ok(())
    }

    async fn user_has_permission(
        &self,
        user_id: i64,
        path: &str,
        permission: &str,
    ) -> OrgwardResult<bool> {
        let ancestors = parse_path(path);

        let mut result = self
            .db
            .query(
                "SELECT count() AS total FROM role_assignment \
                 WHERE user_id = $user_id \
                 AND organization_id IN $ancestors \
                 AND role_id IN (SELECT VALUE role_id FROM role_permission \
                 WHERE permission = $permission) \
                 GROUP ALL",
            )
            .bind(("user_id", user_id))
            .bind(("ancestors", ancestors))
            .bind(("permission", permission.to_string()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<CountRow> = result.take(0).map_err(DbError::from)?;
        Ok(rows.first().map(|r| r.total).unwrap_or(0) > 0)
    }

    async fn user_has_system_permission(
        &self,
        user_id: i64,
        permission: &str,
    ) -> OrgwardResult<bool> {
        let mut result = self
            .db
            .query(
                "SELECT count() AS total FROM role_assignment \
                 WHERE user_id = $user_id AND organization_id IS NONE \
                 AND role_id IN (SELECT VALUE role_id FROM role_permission \
                 WHERE permission = $permission) \
                 GROUP ALL",
            )
            .bind(("user_id", user_id))
            .bind(("permission", permission.to_string()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<CountRow> = result.take(0).map_err(DbError::from)?;
        Ok(rows.first().map(|r| r.total).unwrap_or(0) > 0)
    }
}
