//! Role domain model.
//!
//! Roles are an immutable reference set seeded at install time
//! (`orgward-db::seed`). A role name outside that set is invalid and must
//! be rejected before any assignment is persisted.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Role {
    #[serde(with = "crate::models::i64_string")]
    pub id: i64,
    pub display_name: String,
}

/// Seeded role names.
pub const SYSTEM_ADMIN_ROLE: &str = "System Admin";
pub const ORGANIZATION_ADMIN_ROLE: &str = "Organization Admin";
pub const USER_ADMIN_ROLE: &str = "User Admin";
