//! Shared permission gate for organization-scoped operations.

use orgward_core::error::OrgwardResult;
use orgward_core::repository::RbacRepository;

/// Whether the user may act on the organization at `path` under
/// `permission`. A system-scope grant of the permission satisfies the
/// check for any organization; otherwise the role must be held at the
/// node or one of its ancestors.
pub(crate) async fn holds_permission<R: RbacRepository>(
    rbac: &R,
    user_id: i64,
    path: &str,
    permission: &str,
) -> OrgwardResult<bool> {
    if rbac.user_has_system_permission(user_id, permission).await? {
        return Ok(true);
    }
    rbac.user_has_permission(user_id, path, permission).await
}
