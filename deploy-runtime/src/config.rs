use serde::{Deserialize, Serialize};

use crate::{error::Error, reference::Reference};

const PLACEHOLDER: &str = "{}";

/// Static settings describing where and how deployments are realised.
///
/// Built once at startup and shared read-only by every request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeploySettings {
    /// Container runtime binary, resolved through `PATH`
    pub runtime: String,

    /// Image reference with a single `{}` placeholder for the reference
    pub image_template: String,

    /// Suffix appended to the domain label
    pub domain_suffix: String,

    /// Network the containers are attached to
    pub network: String,

    /// Port the application listens on inside the container
    pub container_port: u16,
}

impl DeploySettings {
    pub fn new(image_template: String, domain_suffix: String) -> Result<Self, Error> {
        let matches = image_template.matches(PLACEHOLDER).count();
        if matches != 1 {
            return Err(Error::Configuration(format!(
                "image template must contain exactly one '{}' placeholder, found {} in '{}'",
                PLACEHOLDER, matches, image_template
            )));
        }
        if domain_suffix.is_empty() {
            return Err(Error::Configuration("domain suffix must not be empty".into()));
        }

        Ok(Self {
            runtime: "podman".to_string(),
            image_template,
            domain_suffix,
            network: "web".to_string(),
            container_port: 80,
        })
    }

    pub fn with_runtime(mut self, runtime: String) -> Self {
        self.runtime = runtime;
        self
    }

    pub fn with_network(mut self, network: String) -> Self {
        self.network = network;
        self
    }

    pub fn with_container_port(mut self, container_port: u16) -> Self {
        self.container_port = container_port;
        self
    }

    /// Image reference for a deployment.
    pub fn image_for(&self, reference: &Reference) -> String {
        self.image_template.replacen(PLACEHOLDER, reference.as_str(), 1)
    }

    /// Public domain for a deployment.
    pub fn domain_for(&self, reference: &Reference) -> String {
        format!("{}.{}", reference.domain_label(), self.domain_suffix)
    }
}

impl Default for DeploySettings {
    fn default() -> Self {
        Self {
            runtime: "podman".to_string(),
            image_template: "ghcr.io/corewar-teamprojekt/aio:{}".to_string(),
            domain_suffix: "corewar.shonk.software".to_string(),
            network: "web".to_string(),
            container_port: 80,
        }
    }
}
