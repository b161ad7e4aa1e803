//! SurrealDB implementations of the `orgward-core` repository traits.

mod audit;
mod organization;
mod rbac;
mod resource;
mod settings;
mod user;

pub use audit::SurrealAuditRepository;
pub use organization::SurrealOrganizationRepository;
pub use rbac::SurrealRbacRepository;
pub use resource::SurrealResourceRepository;
pub use settings::SurrealSettingsRepository;
pub use user::SurrealUserRepository;
