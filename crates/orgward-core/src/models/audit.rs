//! Two-phase audit record.
//!
//! A record is created Open before a guarded operation runs and sealed with
//! the outcome after it completes, even when the operation reports a
//! caller-visible error. The sealed human-readable text is the durable
//! record of why an operation failed or what it changed.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::id;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(into = "i64", try_from = "i64")]
pub enum AuditState {
    Open,
    Sealed,
}

impl From<AuditState> for i64 {
    fn from(state: AuditState) -> i64 {
        match state {
            AuditState::Open => 0,
            AuditState::Sealed => 1,
        }
    }
}

impl TryFrom<i64> for AuditState {
    type Error = String;

    fn try_from(v: i64) -> Result<Self, Self::Error> {
        match v {
            0 => Ok(AuditState::Open),
            1 => Ok(AuditState::Sealed),
            other => Err(format!("invalid audit state {other}")),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditRecord {
    #[serde(with = "crate::models::i64_string")]
    pub id: i64,
    pub created: DateTime<Utc>,
    /// Acting user, 0 when unauthenticated.
    pub organization_user_id: i64,
    /// Target organization, 0 when not applicable.
    pub organization_id: i64,
    /// Operation name, e.g. `aws.iam.user` or `organization.create`.
    pub internal_key: String,
    /// Verb, e.g. `POST`.
    pub method: String,
    pub metadata: serde_json::Value,
    pub human_readable: String,
    pub current_state: AuditState,
}

impl AuditRecord {
    /// A fresh Open record; actor/organization are filled in by the caller
    /// before or after persistence.
    pub fn new(internal_key: impl Into<String>, method: impl Into<String>) -> Self {
        Self {
            id: id::next_id(),
            created: Utc::now(),
            organization_user_id: 0,
            organization_id: 0,
            internal_key: internal_key.into(),
            method: method.into(),
            metadata: serde_json::Value::Object(Default::default()),
            human_readable: String::new(),
            current_state: AuditState::Open,
        }
    }
}
