//! Orgward Service — authorization-gated, audit-wrapped operations over
//! the organization tree, user lifecycle, and resource provisioning.
//!
//! Every service is generic over the `orgward-core` repository traits so
//! this layer has no dependency on the database crate.

pub mod actions;
mod access;
mod audit;
pub mod error;
pub mod identity;
pub mod organizations;
pub mod provisioning;
pub mod system;
pub mod token;
pub mod users;

pub use error::TokenError;
pub use identity::IdentityService;
pub use organizations::OrganizationService;
pub use provisioning::ProvisioningService;
pub use system::SystemService;
pub use token::{Authenticator, StaticKeyAuthenticator, Subject};
pub use users::UserService;
