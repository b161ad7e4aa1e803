//! Organization tree operations: creation, subtree reads, re-parenting,
//! and metadata inheritance.

use orgward_core::error::{OrgwardError, OrgwardResult};
use orgward_core::models::audit::AuditRecord;
use orgward_core::models::organization::{path_contains, Organization, OrganizationDetails};
use orgward_core::models::user::OrganizationUser;
use orgward_core::permissions;
use orgward_core::repository::{AuditRepository, OrganizationRepository, RbacRepository};
use serde_json::json;

use crate::access;
use crate::audit::seal_outcome;

pub struct OrganizationService<O, R, A>
where
    O: OrganizationRepository,
    R: RbacRepository,
    A: AuditRepository,
{
    organizations: O,
    rbac: R,
    audits: A,
}

impl<O, R, A> OrganizationService<O, R, A>
where
    O: OrganizationRepository,
    R: RbacRepository,
    A: AuditRepository,
{
    pub fn new(organizations: O, rbac: R, audits: A) -> Self {
        Self {
            organizations,
            rbac,
            audits,
        }
    }

    /// Create an organization. With a parent the caller needs
    /// `organization.create.execute` at the parent (or an ancestor of
    /// it); without one this is a new root and needs the system-scope
    /// create permission.
    pub async fn create(
        &self,
        actor: &OrganizationUser,
        parent_id: Option<i64>,
        display_name: &str,
    ) -> OrgwardResult<Organization> {
        let mut record = AuditRecord::new("organization.create", "POST");
        record.organization_user_id = actor.id;
        record.organization_id = parent_id.unwrap_or(0);
        let record = self.audits.open(record).await?;

        let outcome = self.create_inner(actor, parent_id, display_name).await;

        let (text, meta) = match &outcome {
            Ok(org) => (
                format!("created organization '{}'", org.display_name),
                json!({"organization_id": org.id.to_string(), "path": org.path}),
            ),
            Err(e) => (format!("organization creation rejected: {e}"), json!({})),
        };
        seal_outcome(&self.audits, record.id, &text, meta, &outcome).await?;
        outcome
    }

    async fn create_inner(
        &self,
        actor: &OrganizationUser,
        parent_id: Option<i64>,
        display_name: &str,
    ) -> OrgwardResult<Organization> {
        if display_name.trim().is_empty() {
            return Err(OrgwardError::validation("display name must not be empty"));
        }

        let mut organization = Organization::new(display_name.trim());

        match parent_id {
            Some(parent_id) => {
                let parent = self.organizations.get_by_id(parent_id).await?;
                if !access::holds_permission(
                    &self.rbac,
                    actor.id,
                    &parent.path,
                    permissions::ORGANIZATION_CREATE,
                )
                .await?
                {
                    return Err(OrgwardError::Unauthorized);
                }
                organization.path = format!("{}.{}", parent.path, organization.id);
            }
            None => {
                if !self
                    .rbac
                    .user_has_system_permission(
                        actor.id,
                        permissions::SYSTEM_ORGANIZATION_CREATE,
                    )
                    .await?
                {
                    return Err(OrgwardError::Unauthorized);
                }
            }
        }

        self.organizations.create(organization).await
    }

    /// The organizations visible to the caller: every subtree rooted at
    /// one of the caller's memberships. Membership itself is the grant;
    /// a user with no memberships sees an empty tree.
    pub async fn caller_tree(
        &self,
        actor: &OrganizationUser,
    ) -> OrgwardResult<Vec<Organization>> {
        let mut visible: Vec<Organization> = Vec::new();
        for organization_id in &actor.organizations {
            let root = self.organizations.get_by_id(*organization_id).await?;
            for organization in self.organizations.list_subtree(&root.path).await? {
                if visible.iter().all(|o| o.id != organization.id) {
                    visible.push(organization);
                }
            }
        }
        visible.sort_by(|a, b| a.path.cmp(&b.path));
        Ok(visible)
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

    /// The subtree rooted at `organization_id`, the node included.
    /// Requires `user.read.execute` at the node or an ancestor.
    pub async fn tree(
        &self,
        actor: &OrganizationUser,
        organization_id: i64,
    ) -> OrgwardResult<Vec<Organization>> {
        let root = self.organizations.get_by_id(organization_id).await?;
        if !access::holds_permission(&self.rbac, actor.id, &root.path, permissions::USER_READ)
            .await?
        {
            return Err(OrgwardError::Unauthorized);
        }
        self.organizations.list_subtree(&root.path).await
    }

    /// A single organization; direct active members are embedded only
    /// when the caller holds `user.read.execute` there.
    pub async fn details(
        &self,
        actor: &OrganizationUser,
        organization_id: i64,
    ) -> OrgwardResult<OrganizationDetails> {
        let organization = self.organizations.get_by_id(organization_id).await?;

        let can_read_users = access::holds_permission(
            &self.rbac,
            actor.id,
            &organization.path,
            permissions::USER_READ,
        )
        .await?;
        if !can_read_users && !self.can_view(actor, &organization).await? {
            return Err(OrgwardError::Unauthorized);
        }

        let users = if can_read_users {
            Some(self.organizations.list_members(organization_id).await?)
        } else {
            None
        };

        Ok(OrganizationDetails {
            organization,
            users,
        })
    }

    /// Re-parent an organization. Only the moved node's path is
    /// rewritten; descendants are left on their old paths. A missing
    /// child or parent makes this a silent no-op reporting false.
    pub async fn assign_to_parent(
        &self,
        actor: &OrganizationUser,
        child_id: i64,
        parent_id: i64,
    ) -> OrgwardResult<bool> {
        let mut record = AuditRecord::new("organization.assign_parent", "POST");
        record.organization_user_id = actor.id;
        record.organization_id = child_id;
        let record = self.audits.open(record).await?;

        let outcome = self.assign_inner(actor, child_id, parent_id).await;

        let (text, meta) = match &outcome {
            Ok(true) => (
                format!("assigned organization {child_id} under {parent_id}"),
                json!({"parent_id": parent_id.to_string()}),
            ),
            Ok(false) => ("re-parent skipped, node or parent missing".to_string(), json!({})),
            Err(e) => (format!("re-parent rejected: {e}"), json!({})),
        };
        seal_outcome(&self.audits, record.id, &text, meta, &outcome).await?;
        outcome
    }

    async fn assign_inner(
        &self,
        actor: &OrganizationUser,
        child_id: i64,
        parent_id: i64,
    ) -> OrgwardResult<bool> {
        if !self
            .rbac
            .user_has_system_permission(actor.id, permissions::SYSTEM_ORGANIZATION_CREATE)
            .await?
        {
            return Err(OrgwardError::Unauthorized);
        }
        self.organizations.assign_to_parent(child_id, parent_id).await
    }

    /// Merge a metadata patch into an organization. Incoming keys
    /// replace colliding ones; other keys are untouched.
    pub async fn update_metadata(
        &self,
        actor: &OrganizationUser,
        organization_id: i64,
        patch: serde_json::Value,
    ) -> OrgwardResult<()> {
        let mut record = AuditRecord::new("organization.metadata", "POST");
        record.organization_user_id = actor.id;
        record.organization_id = organization_id;
        let record = self.audits.open(record).await?;

        let outcome = self
            .update_metadata_inner(actor, organization_id, patch.clone())
            .await;

        let (text, meta) = match &outcome {
            Ok(()) => ("updated organization metadata".to_string(), json!({"patch": patch})),
            Err(e) => (format!("metadata update rejected: {e}"), json!({})),
        };
        seal_outcome(&self.audits, record.id, &text, meta, &outcome).await?;
        outcome
    }

    async fn update_metadata_inner(
        &self,
        actor: &OrganizationUser,
        organization_id: i64,
        patch: serde_json::Value,
    ) -> OrgwardResult<()> {
        if !patch.is_object() {
            return Err(OrgwardError::validation("metadata patch must be an object"));
        }

        let organization = self.organizations.get_by_id(organization_id).await?;
        if !access::holds_permission(
            &self.rbac,
            actor.id,
            &organization.path,
            permissions::ORGANIZATION_CREATE,
        )
        .await?
        {
            return Err(OrgwardError::Unauthorized);
        }

        self.organizations.merge_metadata(organization_id, patch).await
    }

    /// Resolve a metadata key for an organization through
    /// nearest-ancestor inheritance: the node itself first, then each
    /// ancestor up to the root.
    pub async fn resolve_metadata(
        &self,
        actor: &OrganizationUser,
        organization_id: i64,
        key: &str,
    ) -> OrgwardResult<Option<serde_json::Value>> {
        let organization = self.organizations.get_by_id(organization_id).await?;
        if !access::holds_permission(
            &self.rbac,
            actor.id,
            &organization.path,
            permissions::USER_READ,
        )
        .await?
        {
            return Err(OrgwardError::Unauthorized);
        }
        let hit = self
            .organizations
            .resolve_metadata(&organization.path, key)
            .await?;
        Ok(hit.and_then(|h| h.metadata.get(key).cloned()))
    }
}
