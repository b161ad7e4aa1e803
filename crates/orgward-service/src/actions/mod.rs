//! Per-provider payload and state types for resource provisioning.
//!
//! Provider state is persisted as an opaque JSON object on the
//! provision record; the types here are the only place it is encoded
//! or decoded.

pub mod aws_iam;
pub mod gcp_service_account;
