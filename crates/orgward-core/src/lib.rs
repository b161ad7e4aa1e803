//! Orgward Core — domain models, repository trait definitions, and the
//! shared error taxonomy.
//!
//! Organizations form trees stored as materialized paths; users hold roles
//! scoped to a tree node; permission checks are ancestor-inclusive. This
//! crate has no storage or HTTP dependencies; those live in `orgward-db`
//! and behind the (out-of-scope) router respectively.

pub mod error;
pub mod id;
pub mod models;
pub mod permissions;
pub mod repository;

pub use error::{OrgwardError, OrgwardResult};
