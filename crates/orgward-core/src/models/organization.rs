//! Organization domain model.
//!
//! Organizations are nodes in one or more trees stored as materialized
//! paths: `path` is the dot-separated chain of ancestor IDs from the root
//! down to (and always including) the node itself, e.g. `"5.12.47"`. A root
//! organization's path is just its own ID. Every ancestry query in the
//! system reduces to a prefix test on this field.

use serde::{Deserialize, Serialize};

use crate::id;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Organization {
    #[serde(with = "crate::models::i64_string")]
    pub id: i64,
    pub display_name: String,
    /// Dot-separated ancestor IDs, root→self, always ending in `id`.
    pub path: String,
    /// Arbitrary key→value metadata; tenant credentials live here and are
    /// resolved through nearest-ancestor inheritance.
    pub metadata: serde_json::Value,
}

impl Organization {
    /// A new root node: path is the node's own ID until it is attached
    /// to a parent.
    pub fn new(display_name: impl Into<String>) -> Self {
        let id = id::next_id();
        Self {
            id,
            display_name: display_name.into(),
            path: id.to_string(),
            metadata: serde_json::Value::Object(Default::default()),
        }
    }
}

/// Parse a materialized path into its ordered ancestor IDs (root→self).
/// Malformed segments are skipped; the storage layer never writes any.
pub fn parse_path(path: &str) -> Vec<i64> {
    path.split('.').filter_map(|s| s.parse().ok()).collect()
}

/// True iff `ancestor_path` is an ancestor-or-self of `path`, i.e. a
/// dot-boundary prefix of it. A node is its own ancestor.
pub fn path_contains(ancestor_path: &str, path: &str) -> bool {
    path == ancestor_path
        || (path.starts_with(ancestor_path)
            && path.as_bytes().get(ancestor_path.len()) == Some(&b'.'))
}

/// The outcome of a metadata inheritance walk: the nearest
/// ancestor-or-self organization that defines the requested key, with
/// its full metadata document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResolvedMetadata {
    #[serde(with = "crate::models::i64_string")]
    pub organization_id: i64,
    pub metadata: serde_json::Value,
}

/// An organization plus, optionally, its direct active member users
/// (flag-gated by the caller's `user.read.execute` permission).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrganizationDetails {
    #[serde(flatten)]
    pub organization: Organization,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub users: Option<Vec<OrganizationUserRef>>,
}

/// Minimal user reference embedded in organization details.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrganizationUserRef {
    #[serde(with = "crate::models::i64_string")]
    pub id: i64,
    pub display_name: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_root_path_is_own_id() {
        let org = Organization::new("Root");
        assert_eq!(org.path, org.id.to_string());
        assert_eq!(parse_path(&org.path), vec![org.id]);
    }

    #[test]
    fn path_contains_is_inclusive() {
        assert!(path_contains("5", "5"));
        assert!(path_contains("5", "5.12"));
        assert!(path_contains("5.12", "5.12.47"));
        assert!(!path_contains("5.12", "5"));
        assert!(!path_contains("12", "5.12.47"));
    }

    #[test]
    fn path_contains_respects_segment_boundaries() {
        // "47" must not match "470".
        assert!(!path_contains("5.47", "5.470"));
        assert!(!path_contains("47", "470.1"));
    }
}
