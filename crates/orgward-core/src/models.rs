//! Domain models for Orgward.
//!
//! These are the core types shared across all crates.

pub mod audit;
pub mod organization;
pub mod resource;
pub mod role;
pub mod setting;
pub mod user;

/// Serde adapter encoding 64-bit IDs as JSON strings.
///
/// Wire bodies carry IDs as strings because JavaScript numbers lose
/// precision past 2^53; decoding accepts either form.
pub mod i64_string {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(v: &i64, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&v.to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<i64, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum StringOrInt {
            String(String),
            Int(i64),
        }
        match StringOrInt::deserialize(deserializer)? {
            StringOrInt::String(s) => s.parse().map_err(serde::de::Error::custom),
            StringOrInt::Int(v) => Ok(v),
        }
    }
}
