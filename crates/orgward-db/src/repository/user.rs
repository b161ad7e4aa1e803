//! SurrealDB implementation of [`UserRepository`].

use std::collections::HashMap;

use orgward_core::error::OrgwardResult;
use orgward_core::models::role::Role;
use orgward_core::models::user::{Invite, OrganizationUser, UserState};
use orgward_core::repository::UserRepository;
use orgward_core::id;
use serde::Deserialize;
use surrealdb::{Connection, Surreal};

use crate::error::DbError;

#[derive(Debug, Deserialize)]
struct UserRow {
    record_id: i64,
    display_name: String,
    current_state: UserState,
}

#[derive(Debug, Deserialize)]
struct MembershipRow {
    organization_id: i64,
}

#[derive(Debug, Deserialize)]
struct AssignmentRow {
    organization_id: Option<i64>,
    role_id: i64,
}

#[derive(Debug, Deserialize)]
struct RoleRow {
    record_id: i64,
    display_name: String,
}

/// SurrealDB implementation of the user lifecycle store.
#[derive(Clone)]
pub struct SurrealUserRepository<C: Connection> {
    db: Surreal<C>,
}

impl<C: Connection> SurrealUserRepository<C> {
    pub fn new(db: Surreal<C>) -> Self {
        Self { db }
    }

    async fn load_user(&self, id: i64) -> Result<OrganizationUser, DbError> {
        let mut result = self
            .db
            .query(
                "SELECT meta::id(id) AS record_id, display_name, \
                 current_state FROM type::thing('organization_user', $id)",
            )
            .bind(("id", id))
            .await?;
        let rows: Vec<UserRow> = result.take(0)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: "organization_user".into(),
            id: id.to_string(),
        })?;

        let mut result = self
            .db
            .query(
                "SELECT organization_id FROM organization_membership \
                 WHERE user_id = $id",
            )
            .bind(("id", id))
            .await?;
        let memberships: Vec<MembershipRow> = result.take(0)?;

        let mut result = self
            .db
            .query(
                "SELECT organization_id, role_id FROM role_assignment \
                 WHERE user_id = $id",
            )
            .bind(("id", id))
            .await?;
        let assignments: Vec<AssignmentRow> = result.take(0)?;

        let role_ids: Vec<i64> = assignments.iter().map(|a| a.role_id).collect();
        let mut result = self
            .db
            .query(
                "SELECT meta::id(id) AS record_id, display_name FROM role \
                 WHERE meta::id(id) IN $ids",
            )
            .bind(("ids", role_ids))
            .await?;
        let roles: Vec<RoleRow> = result.take(0)?;
        let roles_by_id: HashMap<i64, Role> = roles
            .into_iter()
            .map(|r| {
                (
                    r.record_id,
                    Role {
                        id: r.record_id,
                        display_name: r.display_name,
                    },
                )
            })
            .collect();

        let mut user_roles: HashMap<i64, Vec<Role>> = HashMap::new();
        let mut system_roles = Vec::new();
        for assignment in assignments {
            let Some(role) = roles_by_id.get(&assignment.role_id) else {
                continue;
            };
            match assignment.organization_id {
                Some(org_id) => user_roles.entry(org_id).or_default().push(role.clone()),
                None => system_roles.push(role.clone()),
            }
        }

        Ok(OrganizationUser {
            id: row.record_id,
            display_name: row.display_name,
            current_state: row.current_state,
            organizations: memberships.into_iter().map(|m| m.organization_id).collect(),
            user_roles,
            system_roles,
        })
    }
}

impl<C: Connection> UserRepository for SurrealUserRepository<C> {
    async fn create_with_invite(
        &self,
        display_name: &str,
        organization_id: i64,
    ) -> OrgwardResult<Invite> {
        let invite = Invite {
            user_id: id::next_id(),
            invite_code: id::next_id(),
        };

        self.db
            .query(
                "CREATE type::thing('organization_user', $id) SET \
                 display_name = $display_name, current_state = 0, \
                 invite_code = $invite_code",
            )
            .bind(("id", invite.user_id))
            .bind(("display_name", display_name.to_string()))
            .bind(("invite_code", invite.invite_code))
            .await
            .map_err(DbError::from)?
            .check()
            .map_err(|e| DbError::Query(e.to_string()))?;

        if organization_id != 0 {
            self.add_to_organization(invite.user_id, organization_id)
                .await?;
        }

        Ok(invite)
    }

    async fn get_by_id(&self, id: i64) -> OrgwardResult<OrganizationUser> {
        Ok(self.load_user(id).await?)
    }

    async fn get_by_credential(
        &self,
        idp_type: &str,
        credential: &str,
    ) -> OrgwardResult<OrganizationUser> {
        let mut result = self
            .db
            .query(
                "SELECT meta::id(id) AS record_id, display_name, \
                 current_state FROM organization_user \
                 WHERE idp_type = $idp_type AND \
                 idp_credential_value = $credential",
            )
            .bind(("idp_type", idp_type.to_string()))
            .bind(("credential", credential.to_string()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<UserRow> = result.take(0).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: "organization_user".into(),
            id: format!("credential={idp_type}"),
        })?;

        Ok(self.load_user(row.record_id).await?)
    }

    async fn init_from_invite(
        &self,
        invite_code: i64,
        idp_type: &str,
        credential: &str,
    ) -> OrgwardResult<bool> {
        // Guarded on Created state, so a second redemption of the same
        // code updates nothing and reports false.
        let mut result = self
            .db
            .query(
                "UPDATE organization_user SET idp_type = $idp_type, \
                 idp_credential_value = $credential, current_state = 1 \
                 WHERE invite_code = $invite_code AND current_state = 0 \
                 RETURN meta::id(id) AS record_id, display_name, \
                 current_state",
            )
            .bind(("idp_type", idp_type.to_string()))
            .bind(("credential", credential.to_string()))
            .bind(("invite_code", invite_code))
            .await
            .map_err(DbError::from)?
            .check()
            .map_err(|e| DbError::Query(e.to_string()))?;

        let rows: Vec<UserRow> = result.take(0).map_err(DbError::from)?;
        Ok(!rows.is_empty())
    }

    async fn set_state(&self, id: i64, state: UserState) -> OrgwardResult<()> {
        self.db
            .query(
                "UPDATE type::thing('organization_user', $id) SET \
                 current_state = $state",
            )
            .bind(("id", id))
            .bind(("state", i64::from(state)))
            .await
            .map_err(DbError::from)?
            .check()
            .map_err(|e| DbError::Query(e.to_string()))?;

        Ok(())
    }

    async fn add_to_organization(&self, user_id: i64, organization_id: i64) -> OrgwardResult<()> {
        self.db
            .query(
                "CREATE type::thing('organization_membership', \
                 [$user_id, $organization_id]) SET \
                 user_id = $user_id, organization_id = $organization_id",
            )
            .bind(("user_id", user_id))
            .bind(("organization_id", organization_id))
            .await
            .map_err(DbError::from)?
            .check()
            .map_err(|e| DbError::Query(e.to_string()))?;

        Ok(())
    }
}
