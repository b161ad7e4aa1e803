//! Repository trait definitions for data access abstraction.
//!
//! All repository operations are async and return `OrgwardResult`; a
//! storage failure surfaces as `OrgwardError::Database` and never
//! terminates the process.

use std::future::Future;

use crate::error::OrgwardResult;
use crate::models::{
    audit::AuditRecord,
    organization::{Organization, OrganizationUserRef, ResolvedMetadata},
    resource::{ProvisionRecord, RegisteredResource, ResourceKind},
    role::Role,
    setting::Setting,
    user::{Invite, OrganizationUser, UserState},
};

// ---------------------------------------------------------------------------
// Organization tree
// ---------------------------------------------------------------------------

pub trait OrganizationRepository: Send + Sync {
    /// Persist an organization whose `path` is already computed.
    fn create(
        &self,
        organization: Organization,
    ) -> impl Future<Output = OrgwardResult<Organization>> + Send;

    fn get_by_id(&self, id: i64) -> impl Future<Output = OrgwardResult<Organization>> + Send;

    /// Every organization whose path starts at `path` (the node at `path`
    /// included).
    fn list_subtree(
        &self,
        path: &str,
    ) -> impl Future<Output = OrgwardResult<Vec<Organization>>> + Send;

    /// Rewrite the child's path to `parent.path + "." + child_id`. Only the
    /// child row moves; descendants keep their old paths. Returns false
    /// without touching anything when either row is missing.
    fn assign_to_parent(
        &self,
        child_id: i64,
        parent_id: i64,
    ) -> impl Future<Output = OrgwardResult<bool>> + Send;

    /// Merge the given JSON object into the organization's metadata
    /// document, replacing colliding keys.
    fn merge_metadata(
        &self,
        id: i64,
        metadata: serde_json::Value,
    ) -> impl Future<Output = OrgwardResult<()>> + Send;

    /// Walk `path` from the node itself up to the root and return the
    /// first organization defining a non-null `key`, together with its
    /// full metadata document. None when no ancestor defines the key.
    fn resolve_metadata(
        &self,
        path: &str,
        key: &str,
    ) -> impl Future<Output = OrgwardResult<Option<ResolvedMetadata>>> + Send;

    /// Direct active members of an organization, ordered by display
    /// name, for detail views. Pending invitees are excluded.
    fn list_members(
        &self,
        id: i64,
    ) -> impl Future<Output = OrgwardResult<Vec<OrganizationUserRef>>> + Send;
}

// ---------------------------------------------------------------------------
// Users & membership
// ---------------------------------------------------------------------------

pub trait UserRepository: Send + Sync {
    /// Create a pending user plus a one-time invite, and attach the user to
    /// `organization_id` when it is non-zero.
    fn create_with_invite(
        &self,
        display_name: &str,
        organization_id: i64,
    ) -> impl Future<Output = OrgwardResult<Invite>> + Send;

    fn get_by_id(&self, id: i64) -> impl Future<Output = OrgwardResult<OrganizationUser>> + Send;

    /// The user whose bound credential matches, regardless of state.
    fn get_by_credential(
        &self,
        idp_type: &str,
        credential: &str,
    ) -> impl Future<Output = OrgwardResult<OrganizationUser>> + Send;

    /// Redeem an invite: bind the credential and activate, guarded on the
    /// user still being in `Created` state. Returns false when the code is
    /// unknown or already redeemed.
    fn init_from_invite(
        &self,
        invite_code: i64,
        idp_type: &str,
        credential: &str,
    ) -> impl Future<Output = OrgwardResult<bool>> + Send;

    fn set_state(
        &self,
        id: i64,
        state: UserState,
    ) -> impl Future<Output = OrgwardResult<()>> + Send;

    fn add_to_organization(
        &self,
        user_id: i64,
        organization_id: i64,
    ) -> impl Future<Output = OrgwardResult<()>> + Send;
}

// ---------------------------------------------------------------------------
// RBAC
// ---------------------------------------------------------------------------

pub trait RbacRepository: Send + Sync {
    fn get_role_by_name(&self, name: &str) -> impl Future<Output = OrgwardResult<Role>> + Send;

    /// Replace the user's role set within one scope. `organization_id` of
    /// None targets system-scope assignments. Runs delete and inserts in a
    /// single transaction.
    fn set_user_roles(
        &self,
        user_id: i64,
        organization_id: Option<i64>,
        role_ids: &[i64],
    ) -> impl Future<Output = OrgwardResult<()>> + Send;

    /// Whether any role held at the organization or one of its ancestors
    /// (ancestor IDs taken from `path`) grants `permission`. System-scope
    /// assignments are not consulted here; callers that accept a
    /// system-wide grant check `user_has_system_permission` as well.
    fn user_has_permission(
        &self,
        user_id: i64,
        path: &str,
        permission: &str,
    ) -> impl Future<Output = OrgwardResult<bool>> + Send;

    /// Whether any system-scope role of the user grants `permission`.
    fn user_has_system_permission(
        &self,
        user_id: i64,
        permission: &str,
    ) -> impl Future<Output = OrgwardResult<bool>> + Send;
}

// ---------------------------------------------------------------------------
// Audit
// ---------------------------------------------------------------------------

pub trait AuditRepository: Send + Sync {
    /// Persist a fresh record in Open state.
    fn open(
        &self,
        record: AuditRecord,
    ) -> impl Future<Output = OrgwardResult<AuditRecord>> + Send;

    /// Seal an Open record with the outcome text and final metadata. A
    /// second seal of the same record changes nothing.
    fn seal(
        &self,
        id: i64,
        human_readable: &str,
        metadata: serde_json::Value,
    ) -> impl Future<Output = OrgwardResult<()>> + Send;

    fn get_by_id(&self, id: i64) -> impl Future<Output = OrgwardResult<AuditRecord>> + Send;
}

// ---------------------------------------------------------------------------
// Settings
// ---------------------------------------------------------------------------

pub trait SettingsRepository: Send + Sync {
    fn get(&self, key: &str) -> impl Future<Output = OrgwardResult<Option<Setting>>> + Send;

    /// Insert-or-replace every pair in one transaction.
    fn upsert_all(
        &self,
        settings: &[Setting],
    ) -> impl Future<Output = OrgwardResult<()>> + Send;
}

// ---------------------------------------------------------------------------
// Provisionable resources
// ---------------------------------------------------------------------------

pub trait ResourceRepository: Send + Sync {
    fn list_registered(
        &self,
    ) -> impl Future<Output = OrgwardResult<Vec<RegisteredResource>>> + Send;

    fn create_record(
        &self,
        kind: ResourceKind,
        record: ProvisionRecord,
    ) -> impl Future<Output = OrgwardResult<()>> + Send;

    fn get_record(
        &self,
        kind: ResourceKind,
        id: i64,
    ) -> impl Future<Output = OrgwardResult<Option<ProvisionRecord>>> + Send;

    /// Look a record up by its provider-side reference (IAM user name,
    /// service-account email).
    fn get_record_by_ref(
        &self,
        kind: ResourceKind,
        external_ref: &str,
    ) -> impl Future<Output = OrgwardResult<Option<ProvisionRecord>>> + Send;

    fn update_record_state(
        &self,
        kind: ResourceKind,
        id: i64,
        state: serde_json::Value,
    ) -> impl Future<Output = OrgwardResult<()>> + Send;

    fn list_records(
        &self,
        kind: ResourceKind,
    ) -> impl Future<Output = OrgwardResult<Vec<ProvisionRecord>>> + Send;
}
