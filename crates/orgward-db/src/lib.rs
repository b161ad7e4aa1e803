//! Orgward Database — SurrealDB connection management and repository
//! implementations.
//!
//! This crate provides:
//! - Connection management ([`DbConfig`], [`DbManager`])
//! - Schema initialization and migrations ([`run_migrations`])
//! - Reference-data seeding ([`seed_reference_data`])
//! - Error types ([`DbError`])
//! - SurrealDB implementations of the `orgward-core` repository traits

pub mod repository;

mod connection;
mod error;
mod schema;
mod seed;

pub use connection::{DbConfig, DbManager};
pub use error::DbError;
pub use schema::{run_migrations, schema_v1};
pub use seed::seed_reference_data;
