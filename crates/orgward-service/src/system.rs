//! System-level operations: one-shot bootstrap and settings management.

use orgward_core::error::{OrgwardError, OrgwardResult};
use orgward_core::models::audit::AuditRecord;
use orgward_core::models::organization::Organization;
use orgward_core::models::role::SYSTEM_ADMIN_ROLE;
use orgward_core::models::setting::{keys, Setting};
use orgward_core::models::user::{Invite, OrganizationUser};
use orgward_core::permissions;
use orgward_core::repository::{
    AuditRepository, OrganizationRepository, RbacRepository, SettingsRepository, UserRepository,
};
use serde_json::json;
use tracing::info;

use crate::audit::seal_outcome;

/// Everything a fresh install hands back: the first organization and
/// the invite for its System Admin.
#[derive(Debug)]
pub struct BootstrapOutput {
    pub organization: Organization,
    pub invite: Invite,
}

pub struct SystemService<O, U, R, S, A>
where
    O: OrganizationRepository,
    U: UserRepository,
    R: RbacRepository,
    S: SettingsRepository,
    A: AuditRepository,
{
    organizations: O,
    users: U,
    rbac: R,
    settings: S,
    audits: A,
}

impl<O, U, R, S, A> SystemService<O, U, R, S, A>
where
    O: OrganizationRepository,
    U: UserRepository,
    R: RbacRepository,
    S: SettingsRepository,
    A: AuditRepository,
{
    pub fn new(organizations: O, users: U, rbac: R, settings: S, audits: A) -> Self {
        Self {
            organizations,
            users,
            rbac,
            settings,
            audits,
        }
    }

    /// One-shot first-run setup: create the first root organization and
    /// a System Admin user for it, then close the gate. Unauthenticated
    /// by design; the `bootstrap.enabled` setting is the only guard and
    /// is flipped to `"false"` on success.
    pub async fn bootstrap(
        &self,
        organization_name: &str,
        admin_name: &str,
    ) -> OrgwardResult<BootstrapOutput> {
        let record = self
            .audits
            .open(AuditRecord::new("system.bootstrap", "POST"))
            .await?;

        let outcome = self.bootstrap_inner(organization_name, admin_name).await;

        let (text, meta) = match &outcome {
            Ok(output) => (
                format!(
                    "bootstrapped organization '{}' with admin '{admin_name}'",
                    output.organization.display_name,
                ),
                json!({
                    "organization_id": output.organization.id.to_string(),
                    "admin_user_id": output.invite.user_id.to_string(),
                }),
            ),
            Err(e) => (format!("bootstrap rejected: {e}"), json!({})),
        };
        seal_outcome(&self.audits, record.id, &text, meta, &outcome).await?;
        outcome
    }

    async fn bootstrap_inner(
        &self,
        organization_name: &str,
        admin_name: &str,
    ) -> OrgwardResult<BootstrapOutput> {
        let enabled = self
            .settings
            .get(keys::BOOTSTRAP_ENABLED)
            .await?
            .map(|s| s.value == "true")
            .unwrap_or(false);
        if !enabled {
            return Err(OrgwardError::BootstrapDisabled);
        }

        if organization_name.trim().is_empty() || admin_name.trim().is_empty() {
            return Err(OrgwardError::validation(
                "organization and admin names must not be empty",
            ));
        }

        let organization = self
            .organizations
            .create(Organization::new(organization_name.trim()))
            .await?;

        let invite = self
            .users
            .create_with_invite(admin_name.trim(), organization.id)
            .await?;

        let admin_role = self.rbac.get_role_by_name(SYSTEM_ADMIN_ROLE).await?;
        self.rbac
            .set_user_roles(invite.user_id, None, &[admin_role.id])
            .await?;

        // Close the gate; a second bootstrap call now fails.
        self.settings
            .upsert_all(&[Setting::new(keys::BOOTSTRAP_ENABLED, "false")])
            .await?;

        info!(
            organization_id = organization.id,
            "System bootstrapped"
        );

        Ok(BootstrapOutput {
            organization,
            invite,
        })
    }

    /// Upsert a batch of system settings. Requires the system-scope
    /// organization create permission, the broadest administrative
    /// grant in the catalog.
    pub async fn update_settings(
        &self,
        actor: &OrganizationUser,
        settings: &[Setting],
    ) -> OrgwardResult<()> {
        let mut record = AuditRecord::new("system.settings", "POST");
        record.organization_user_id = actor.id;
        let record = self.audits.open(record).await?;

        let outcome = self.update_settings_inner(actor, settings).await;

        let touched: Vec<&str> = settings.iter().map(|s| s.key.as_str()).collect();
        let (text, meta) = match &outcome {
            Ok(()) => (
                format!("updated {} setting(s)", settings.len()),
                json!({"keys": touched}),
            ),
            Err(e) => (format!("settings update rejected: {e}"), json!({})),
        };
        seal_outcome(&self.audits, record.id, &text, meta, &outcome).await?;
        outcome
    }

    async fn update_settings_inner(
        &self,
        actor: &OrganizationUser,
        settings: &[Setting],
    ) -> OrgwardResult<()> {
        if !self
            .rbac
            .user_has_system_permission(actor.id, permissions::SYSTEM_ORGANIZATION_CREATE)
            .await?
        {
            return Err(OrgwardError::Unauthorized);
        }
        self.settings.upsert_all(settings).await
    }

    /// Read a single setting, same permission gate as updates.
    pub async fn get_setting(
        &self,
        actor: &OrganizationUser,
        key: &str,
    ) -> OrgwardResult<Option<Setting>> {
        if !self
            .rbac
            .user_has_system_permission(actor.id, permissions::SYSTEM_ORGANIZATION_CREATE)
            .await?
        {
            return Err(OrgwardError::Unauthorized);
        }
        self.settings.get(key).await
    }
}
