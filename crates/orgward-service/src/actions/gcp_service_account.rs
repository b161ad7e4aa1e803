//! GCP service account provisioning types and validation.

use orgward_core::error::{OrgwardError, OrgwardResult};
use serde::{Deserialize, Serialize};

pub const ACCOUNT_ID_MIN: usize = 6;
pub const ACCOUNT_ID_MAX: usize = 30;

/// Client request to provision a service account.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateServiceAccountRequest {
    pub account_id: String,
    pub display_name: String,
}

/// Client request to mint a key for an existing service account.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateServiceAccountKeyRequest {
    pub email: String,
}

/// Per-record provider state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceAccountState {
    pub created_by: i64,
    /// The organization the account was provisioned for.
    pub organization_id: i64,
    /// The GCP project resolved from the organization tree at creation.
    pub project: String,
    pub request: CreateServiceAccountRequest,
    /// Keys minted for the account, newest last.
    #[serde(default)]
    pub keys: Vec<ServiceAccountKey>,
}

/// One provider-side key resource held on the account.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceAccountKey {
    pub name: String,
}

/// The service account's provider-side email address.
pub fn service_account_email(account_id: &str, project: &str) -> String {
    format!("{account_id}@{project}.iam.gserviceaccount.com")
}

/// The fully qualified name of a freshly minted key.
pub fn key_name(project: &str, email: &str, key_id: i64) -> String {
    format!("projects/{project}/serviceAccounts/{email}/keys/{key_id:x}")
}

/// GCP account IDs: 6 to 30 lowercase letters, digits, and hyphens,
/// starting with a letter.
pub fn validate_account_id(account_id: &str) -> OrgwardResult<()> {
    let len = account_id.chars().count();
    if !(ACCOUNT_ID_MIN..=ACCOUNT_ID_MAX).contains(&len) {
        return Err(OrgwardError::validation(format!(
            "account ID must be {ACCOUNT_ID_MIN} to {ACCOUNT_ID_MAX} characters",
        )));
    }
    if !account_id
        .chars()
        .next()
        .map(|c| c.is_ascii_lowercase())
        .unwrap_or(false)
    {
        return Err(OrgwardError::validation(
            "account ID must start with a lowercase letter",
        ));
    }
    if !account_id
        .chars()
        .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
    {
        return Err(OrgwardError::validation(
            "account ID may contain only lowercase letters, digits, and hyphens",
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn account_id_rules() {
        assert!(validate_account_id("svc-reporting").is_ok());
        assert!(validate_account_id("short").is_err());
        assert!(validate_account_id("1numeric-start").is_err());
        assert!(validate_account_id("has_underscore").is_err());
    }

    #[test]
    fn email_shape() {
        assert_eq!(
            service_account_email("svc-reporting", "acme-prod"),
            "svc-reporting@acme-prod.iam.gserviceaccount.com"
        );
    }

    #[test]
    fn key_names_encode_the_id_in_hex() {
        assert_eq!(
            key_name(
                "acme-prod",
                "svc-reporting@acme-prod.iam.gserviceaccount.com",
                255
            ),
            "projects/acme-prod/serviceAccounts/\
             svc-reporting@acme-prod.iam.gserviceaccount.com/keys/ff"
        );
    }
}
