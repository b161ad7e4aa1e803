//! AWS IAM user provisioning types and validation.

use orgward_core::error::{OrgwardError, OrgwardResult};
use orgward_core::models::resource::ProvisionState;
use serde::{Deserialize, Serialize};

pub const USER_NAME_MIN: usize = 4;
pub const USER_NAME_MAX: usize = 16;

/// Client request to provision an IAM user.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateIamUserRequest {
    pub user_name: String,
}

/// Per-record provider state, stored as the record's opaque state blob.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IamUserState {
    pub current_state: ProvisionState,
    /// Creator, remembered so approval can enforce the two-person rule.
    pub created_by: i64,
    /// The organization the request was made for. Approval checks the
    /// approver's permission here, not wherever the approver claims.
    pub organization_id: i64,
    /// The AWS account resolved from the organization tree at creation.
    pub aws_account: String,
    pub request: CreateIamUserRequest,
}

/// IAM user names are restricted to short alphanumerics; anything else
/// is rejected before any state is written.
pub fn validate_user_name(user_name: &str) -> OrgwardResult<()> {
    let len = user_name.chars().count();
    if !(USER_NAME_MIN..=USER_NAME_MAX).contains(&len) {
        return Err(OrgwardError::validation(format!(
            "IAM user name must be {USER_NAME_MIN} to {USER_NAME_MAX} characters",
        )));
    }
    if !user_name.chars().all(|c| c.is_ascii_alphanumeric()) {
        return Err(OrgwardError::validation(
            "IAM user name must be alphanumeric",
        ));
    }
    Ok(())
}
