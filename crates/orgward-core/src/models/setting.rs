//! Key/value system settings, upserted on conflict.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Setting {
    pub key: String,
    pub value: String,
}

impl Setting {
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }
}

/// The settings keys the system itself reads.
pub mod keys {
    /// One-shot gate for `POST /system/bootstrap`; rewritten to `"false"`
    /// by a successful bootstrap.
    pub const BOOTSTRAP_ENABLED: &str = "bootstrap.enabled";
    pub const COOKIE_AUTHENTICATION_KEY: &str = "cookie.authentication.key";
    pub const COOKIE_ENCRYPTION_KEY: &str = "cookie.encryption.key";
    pub const OIDC_ISSUER_BASE_URL: &str = "oidc.issuer.baseurl";
    pub const OIDC_CLIENT_ID: &str = "oidc.clientid";
    pub const OIDC_CLIENT_SECRET: &str = "oidc.clientsecret";
    pub const SYSTEM_BASE_URL: &str = "system.baseurl";
}
