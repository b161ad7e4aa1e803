//! Provisionable-resource catalog and per-kind state records.

use serde::{Deserialize, Serialize};

/// A row in the static catalog of resource types the dispatcher will route
/// requests to.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegisteredResource {
    #[serde(with = "crate::models::i64_string")]
    pub id: i64,
    pub display_name: String,
    /// Routing key, e.g. `aws.iam.user`.
    pub internal_key: String,
    pub enabled: bool,
}

/// The resource kinds with their own provisioning-state table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceKind {
    AwsIamUser,
    GcpServiceAccount,
}

impl ResourceKind {
    pub fn internal_key(self) -> &'static str {
        match self {
            ResourceKind::AwsIamUser => "aws.iam.user",
            ResourceKind::GcpServiceAccount => "gcp.serviceaccount",
        }
    }
}

/// Two-person-approval provisioning states. `Approved` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(into = "i64", try_from = "i64")]
pub enum ProvisionState {
    CreatedNotApproved,
    Approved,
}

impl From<ProvisionState> for i64 {
    fn from(state: ProvisionState) -> i64 {
        match state {
            ProvisionState::CreatedNotApproved => 1,
            ProvisionState::Approved => 2,
        }
    }
}

impl TryFrom<i64> for ProvisionState {
    type Error = String;

    fn try_from(v: i64) -> Result<Self, Self::Error> {
        match v {
            1 => Ok(ProvisionState::CreatedNotApproved),
            2 => Ok(ProvisionState::Approved),
            other => Err(format!("invalid provision state {other}")),
        }
    }
}

/// One persisted external resource: a row keyed by internal ID and external
/// reference, carrying an opaque provider-specific state blob. The blob is
/// encoded/decoded only at the storage boundary.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProvisionRecord {
    #[serde(with = "crate::models::i64_string")]
    pub id: i64,
    /// Provider-side handle, e.g. an IAM user name or service-account email.
    pub external_ref: String,
    pub state: serde_json::Value,
}
