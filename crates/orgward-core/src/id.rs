//! High-entropy identifier generation.
//!
//! Entity IDs double as capability-like values in two places (invite codes
//! and provisioning record IDs are handed to external parties), so they must
//! be unpredictable, not sequential.

use rand::Rng;

/// Generate a random positive 64-bit identifier.
///
/// Zero is reserved as the "absent" sentinel (unauthenticated actor,
/// no target organization), so the range starts at 1.
pub fn next_id() -> i64 {
    rand::thread_rng().gen_range(1..i64::MAX)
}
