//! Organization user domain model and the invite-based lifecycle.
//!
//! A user is created in `Created` state bound to a one-time invite code.
//! Redeeming the code binds the external identity credential (the IdP
//! token subject) and moves the user to `Active`. Activation state then
//! toggles between `Active` and `Deactivated`, never by the user themself.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use super::role::Role;

/// Lifecycle state, stored as its integer discriminant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(into = "i64", try_from = "i64")]
pub enum UserState {
    Created,
    Active,
    Deactivated,
}

impl From<UserState> for i64 {
    fn from(state: UserState) -> i64 {
        match state {
            UserState::Created => 0,
            UserState::Active => 1,
            UserState::Deactivated => 2,
        }
    }
}

impl TryFrom<i64> for UserState {
    type Error = String;

    fn try_from(v: i64) -> Result<Self, Self::Error> {
        match v {
            0 => Ok(UserState::Created),
            1 => Ok(UserState::Active),
            2 => Ok(UserState::Deactivated),
            other => Err(format!("invalid user state {other}")),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrganizationUser {
    #[serde(with = "crate::models::i64_string")]
    pub id: i64,
    pub display_name: String,
    pub current_state: UserState,
    /// Organizations the user is a direct member of.
    pub organizations: Vec<i64>,
    /// Organization-scoped role grants, keyed by organization ID.
    pub user_roles: HashMap<i64, Vec<Role>>,
    /// NULL-organization (system scope) role grants.
    pub system_roles: Vec<Role>,
}

impl OrganizationUser {
    pub fn is_active(&self) -> bool {
        self.current_state == UserState::Active
    }
}

/// The result of creating a pending user: both values are high-entropy
/// 64-bit numbers; the invite code is consumed exactly once.
#[derive(Debug, Clone, Copy)]
pub struct Invite {
    pub user_id: i64,
    pub invite_code: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn state_round_trips_through_discriminant() {
        for state in [UserState::Created, UserState::Active, UserState::Deactivated] {
            let raw: i64 = state.into();
            assert_eq!(UserState::try_from(raw).unwrap(), state);
        }
        assert!(UserState::try_from(3).is_err());
    }
}
