//! User lifecycle operations: invite-based creation and redemption,
//! activation state changes, and role assignment.

use orgward_core::error::{OrgwardError, OrgwardResult};
use orgward_core::models::audit::AuditRecord;
use orgward_core::models::organization::{path_contains, Organization};
use orgward_core::models::user::{Invite, OrganizationUser, UserState};
use orgward_core::permissions;
use orgward_core::repository::{
    AuditRepository, OrganizationRepository, RbacRepository, UserRepository,
};
use serde_json::json;

use crate::access;
use crate::audit::seal_outcome;

pub struct UserService<U, O, R, A>
where
    U: UserRepository,
    O: OrganizationRepository,
    R: RbacRepository,
    A: AuditRepository,
{
    users: U,
    organizations: O,
    rbac: R,
    audits: A,
}

impl<U, O, R, A> UserService<U, O, R, A>
where
    U: UserRepository,
    O: OrganizationRepository,
    R: RbacRepository,
    A: AuditRepository,
{
    pub fn new(users: U, organizations: O, rbac: R, audits: A) -> Self {
        Self {
            users,
            organizations,
            rbac,
            audits,
        }
    }

    /// Create a pending user bound to a fresh invite code, with an
    /// initial role set applied in the same call. With an organization
    /// the caller needs `user.create.execute` there; with
    /// `organization_id` of zero this is a system user and needs the
    /// system-scope create permission.
    pub async fn create(
        &self,
        actor: &OrganizationUser,
        organization_id: i64,
        display_name: &str,
        role_names: &[String],
    ) -> OrgwardResult<Invite> {
        let mut record = AuditRecord::new("user.create", "POST");
        record.organization_user_id = actor.id;
        record.organization_id = organization_id;
        let record = self.audits.open(record).await?;

        let outcome = self
            .create_inner(actor, organization_id, display_name, role_names)
            .await;

        let (text, meta) = match &outcome {
            Ok(invite) => (
                format!("created user '{display_name}'"),
                json!({"user_id": invite.user_id.to_string()}),
            ),
            Err(e) => (format!("user creation rejected: {e}"), json!({})),
        };
        seal_outcome(&self.audits, record.id, &text, meta, &outcome).await?;
        outcome
    }

    async fn create_inner(
        &self,
        actor: &OrganizationUser,
        organization_id: i64,
        display_name: &str,
        role_names: &[String],
    ) -> OrgwardResult<Invite> {
        if display_name.trim().is_empty() {
            return Err(OrgwardError::validation("display name must not be empty"));
        }

        if organization_id == 0 {
            if !self
                .rbac
                .user_has_system_permission(actor.id, permissions::SYSTEM_USER_CREATE)
                .await?
            {
                return Err(OrgwardError::Unauthorized);
            }
        } else {
            let organization = self.organizations.get_by_id(organization_id).await?;
            if !access::holds_permission(
                &self.rbac,
                actor.id,
                &organization.path,
                permissions::USER_CREATE,
            )
            .await?
            {
                return Err(OrgwardError::Unauthorized);
            }
        }

        // Resolve the requested roles before creating anything so a bad
        // name leaves no pending user behind.
        let role_ids = self.resolve_role_names(role_names).await?;

        let invite = self
            .users
            .create_with_invite(display_name.trim(), organization_id)
            .await?;

        if !role_ids.is_empty() {
            // System users get system-scope grants.
            let scope = (organization_id != 0).then_some(organization_id);
            self.rbac
                .set_user_roles(invite.user_id, scope, &role_ids)
                .await?;
        }

        Ok(invite)
    }

    /// A user's profile with roles. Callers may always read themselves;
    /// anyone else requires `user.read.execute` system-scoped or at an
    /// organization the target belongs to.
    pub async fn get(
        &self,
        actor: &OrganizationUser,
        target_id: i64,
    ) -> OrgwardResult<OrganizationUser> {
        let target = self.users.get_by_id(target_id).await?;
        if actor.id == target_id {
            return Ok(target);
        }

        if self
            .rbac
            .user_has_system_permission(actor.id, permissions::USER_READ)
            .await?
        {
            return Ok(target);
        }
        for organization_id in &target.organizations {
            let organization = self.organizations.get_by_id(*organization_id).await?;
            if self
                .rbac
                .user_has_permission(actor.id, &organization.path, permissions::USER_READ)
                .await?
            {
                return Ok(target);
            }
        }

        Err(OrgwardError::Unauthorized)
    }

    /// Redeem an invite code, binding the verified subject's credential
    /// and activating the user. Unauthenticated by design: the invite
    /// code is the proof. Redeeming an unknown or spent code reports
    /// false and changes nothing.
    pub async fn redeem_invite(
        &self,
        invite_code: i64,
        idp_type: &str,
        credential: &str,
    ) -> OrgwardResult<bool> {
        let record = self
            .audits
            .open(AuditRecord::new("user.invite.redeem", "POST"))
            .await?;

        let outcome = self
            .users
            .init_from_invite(invite_code, idp_type, credential)
            .await;

        let text = match &outcome {
            Ok(true) => "invite redeemed, user activated".to_string(),
            Ok(false) => "invite redemption skipped, code unknown or spent".to_string(),
            Err(e) => format!("invite redemption failed: {e}"),
        };
        seal_outcome(&self.audits, record.id, &text, json!({}), &outcome).await?;
        outcome
    }

    /// Deactivate a user. Actors cannot deactivate themselves.
    pub async fn deactivate(
        &self,
        actor: &OrganizationUser,
        target_id: i64,
    ) -> OrgwardResult<()> {
        self.set_state(actor, target_id, UserState::Deactivated).await
    }

    /// Reactivate a previously deactivated user. Actors cannot change
    /// their own state.
    pub async fn activate(&self, actor: &OrganizationUser, target_id: i64) -> OrgwardResult<()> {
        self.set_state(actor, target_id, UserState::Active).await
    }

    async fn set_state(
        &self,
        actor: &OrganizationUser,
        target_id: i64,
        state: UserState,
    ) -> OrgwardResult<()> {
        let verb = match state {
            UserState::Active => "user.activate",
            _ => "user.deactivate",
        };
        let mut record = AuditRecord::new(verb, "POST");
        record.organization_user_id = actor.id;
        let record = self.audits.open(record).await?;

        let outcome = self.set_state_inner(actor, target_id, state).await;

        let (text, meta) = match &outcome {
            Ok(()) => (
                format!("set user {target_id} state to {}", i64::from(state)),
                json!({"user_id": target_id.to_string()}),
            ),
            Err(e) => (format!("state change rejected: {e}"), json!({})),
        };
        seal_outcome(&self.audits, record.id, &text, meta, &outcome).await?;
        outcome
    }

    async fn set_state_inner(
        &self,
        actor: &OrganizationUser,
        target_id: i64,
        state: UserState,
    ) -> OrgwardResult<()> {
        // Changing one's own activation state is an authorization
        // failure, never a valid request.
        if actor.id == target_id {
            return Err(OrgwardError::Unauthorized);
        }

        let target = self.users.get_by_id(target_id).await?;
        if !self.can_manage(actor, &target).await? {
            return Err(OrgwardError::Unauthorized);
        }

        self.users.set_state(target_id, state).await
    }

    /// Replace a user's role set within one scope. Role names outside
    /// the seeded catalog are rejected before anything is written.
    pub async fn set_roles(
        &self,
        actor: &OrganizationUser,
        target_id: i64,
        organization_id: Option<i64>,
        role_names: &[String],
    ) -> OrgwardResult<()> {
        let mut record = AuditRecord::new("user.roles.assign", "POST");
        record.organization_user_id = actor.id;
        record.organization_id = organization_id.unwrap_or(0);
        let record = self.audits.open(record).await?;

        let outcome = self
            .set_roles_inner(actor, target_id, organization_id, role_names)
            .await;

        let (text, meta) = match &outcome {
            Ok(()) => (
                format!("assigned {} role(s) to user {target_id}", role_names.len()),
                json!({"roles": role_names}),
            ),
            Err(e) => (format!("role assignment rejected: {e}"), json!({})),
        };
        seal_outcome(&self.audits, record.id, &text, meta, &outcome).await?;
        outcome
    }

    async fn set_roles_inner(
        &self,
        actor: &OrganizationUser,
        target_id: i64,
        organization_id: Option<i64>,
        role_names: &[String],
    ) -> OrgwardResult<()> {
        match organization_id {
            Some(organization_id) => {
                let organization = self.organizations.get_by_id(organization_id).await?;
                let system_assigner = self
                    .rbac
                    .user_has_system_permission(actor.id, permissions::ORGANIZATION_ROLES_ASSIGN)
                    .await?;
                if !system_assigner {
                    // The target organization must sit inside a subtree
                    // the actor is a member of; a role granted in an
                    // unrelated tree is not enough to reach into it.
                    if !self.can_view(actor, &organization).await? {
                        return Err(OrgwardError::Unauthorized);
                    }
                    if !self
                        .rbac
                        .user_has_permission(
                            actor.id,
                            &organization.path,
                            permissions::ORGANIZATION_ROLES_ASSIGN,
                        )
                        .await?
                    {
                        return Err(OrgwardError::Unauthorized);
                    }
                }
            }
            None => {
                if !self
                    .rbac
                    .user_has_system_permission(
                        actor.id,
                        permissions::ORGANIZATION_ROLES_ASSIGN,
                    )
                    .await?
                {
                    return Err(OrgwardError::Unauthorized);
                }
            }
        }

        // Resolve every name before writing anything.
        let role_ids = self.resolve_role_names(role_names).await?;

        // The target must exist; a bad ID otherwise silently creates
        // orphan assignments.
        self.users.get_by_id(target_id).await?;

        self.rbac
            .set_user_roles(target_id, organization_id, &role_ids)
            .await
    }

    /// Whether `organization` sits in a subtree the actor is a member
    /// of (the membership node included).
    async fn can_view(
        &self,
        actor: &OrganizationUser,
        organization: &Organization,
    ) -> OrgwardResult<bool> {
        for membership_id in &actor.organizations {
            let membership = self.organizations.get_by_id(*membership_id).await?;
            if path_contains(&membership.path, &organization.path) {
                return Ok(true);
            }
        }
        Ok(false)
    }

    async fn resolve_role_names(&self, role_names: &[String]) -> OrgwardResult<Vec<i64>> {
        let mut role_ids = Vec::with_capacity(role_names.len());
        for name in role_names {
            let role = self
                .rbac
                .get_role_by_name(name)
                .await
                .map_err(|_| OrgwardError::validation(format!("unknown role '{name}'")))?;
            role_ids.push(role.id);
        }
        Ok(role_ids)
    }

    /// Whether `actor` is allowed to manage `target`: a system-scope
    /// `user.update.execute`, or the permission at any organization the
    /// target belongs to (ancestors included).
    async fn can_manage(
        &self,
        actor: &OrganizationUser,
        target: &OrganizationUser,
    ) -> OrgwardResult<bool> {
        if self
            .rbac
            .user_has_system_permission(actor.id, permissions::USER_UPDATE)
            .await?
        {
            return Ok(true);
        }

        for organization_id in &target.organizations {
            let organization = self.organizations.get_by_id(*organization_id).await?;
            if self
                .rbac
                .user_has_permission(actor.id, &organization.path, permissions::USER_UPDATE)
                .await?
            {
                return Ok(true);
            }
        }

        Ok(false)
    }
}
