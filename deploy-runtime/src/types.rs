use serde::Serialize;
use std::fmt;

use crate::{config::DeploySettings, reference::Reference};

/// A deployment as derived from its reference. Never stored: the container
/// runtime is the source of truth.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Deployment {
    /// Reference the deployment was created from
    pub reference: Reference,
    /// Name of the container, identical to the reference
    pub container_name: String,
    /// Image the container runs
    pub image: String,
    /// Domain the router forwards to the container
    pub domain: String,
}

impl Deployment {
    pub fn new(reference: Reference, settings: &DeploySettings) -> Self {
        Self {
            container_name: reference.as_str().to_string(),
            image: settings.image_for(&reference),
            domain: settings.domain_for(&reference),
            reference,
        }
    }

    /// Public URL served by the router.
    pub fn url(&self) -> String {
        format!("https://{}", self.domain)
    }
}

/// The ordered steps of tearing a deployment down.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DeleteStep {
    StopContainer,
    RemoveContainer,
    RemoveImage,
}

impl DeleteStep {
    pub const ALL: [DeleteStep; 3] = [
        DeleteStep::StopContainer,
        DeleteStep::RemoveContainer,
        DeleteStep::RemoveImage,
    ];
}

impl fmt::Display for DeleteStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeleteStep::StopContainer => write!(f, "stop container"),
            DeleteStep::RemoveContainer => write!(f, "remove container"),
            DeleteStep::RemoveImage => write!(f, "remove image"),
        }
    }
}
