//! The fixed permission catalog.
//!
//! Permissions are static string identifiers mapped to roles out-of-band
//! (see `orgward-db::seed`); this core never creates them at runtime. A
//! permission name not present here is simply never granted.

pub const USER_CREATE: &str = "user.create.execute";
pub const USER_UPDATE: &str = "user.update.execute";
pub const USER_READ: &str = "user.read.execute";
pub const ORGANIZATION_ROLES_ASSIGN: &str = "organization.roles.assign.execute";
pub const ORGANIZATION_CREATE: &str = "organization.create.execute";

/// System-scope variants, checked against NULL-organization role
/// assignments rather than any tree node.
pub const SYSTEM_ORGANIZATION_CREATE: &str = "system.organization.create.execute";
pub const SYSTEM_USER_CREATE: &str = "system.user.create.execute";

/// Per-resource-kind provisioning permissions, enforced by the matching
/// provider flows in the provisioning dispatcher.
pub const AWS_IAM_USER_CREATE: &str = "aws.iam.user.create.execute";
pub const GCP_SERVICE_ACCOUNT_WRITE: &str = "gcp.serviceaccount.write.execute";
pub const GCP_SERVICE_ACCOUNT_READ: &str = "gcp.serviceaccount.read.execute";
