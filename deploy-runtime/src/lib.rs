//! # Deploy Runtime
//!
//! Drives an external container runtime to realise ephemeral, per-reference
//! preview deployments. A caller-supplied reference (a branch or tag name) is
//! validated, turned into a container identity and a routable domain, and the
//! matching sequence of runtime commands is issued.
//!
//! The service holds no state of its own: the container runtime is the source
//! of truth for which deployments exist.

mod config;
mod error;
mod executor;
mod reference;
mod runtime;
mod service;
mod types;

#[cfg(any(test, feature = "testing"))]
pub mod testing;

#[cfg(test)]
mod tests;

pub use config::DeploySettings;
pub use error::Error;
pub use executor::{CommandRunner, ProcessRunner};
pub use reference::{Reference, INVALID_REFERENCE_MESSAGE};
pub use runtime::ContainerRuntime;
pub use service::DeploymentService;
pub use types::{DeleteStep, Deployment};

/// Result type for deployment operations
pub type Result<T> = std::result::Result<T, Error>;
