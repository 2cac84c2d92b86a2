use crate::{config::DeploySettings, reference::Reference, types::Deployment};

/// Builds argument vectors for a podman-compatible container runtime.
///
/// Every vector is handed to the executor as discrete arguments, so the
/// reference is never seen by a shell.
#[derive(Debug, Clone)]
pub struct ContainerRuntime {
    settings: DeploySettings,
}

impl ContainerRuntime {
    pub fn new(settings: DeploySettings) -> Self {
        Self { settings }
    }

    pub fn settings(&self) -> &DeploySettings {
        &self.settings
    }

    /// Run the deployment's container, replacing any container of the same
    /// name and re-pulling the image first.
    pub fn run_or_replace(&self, deployment: &Deployment) -> Vec<String> {
        let name = &deployment.container_name;
        let port = self.settings.container_port;

        vec![
            self.settings.runtime.clone(),
            "run".into(),
            "-d".into(),
            "--name".into(),
            name.clone(),
            "--replace".into(),
            format!("--network={}", self.settings.network),
            format!("--expose={}", port),
            "--restart=always".into(),
            "--pull".into(),
            "always".into(),
            "--label".into(),
            format!(
                "traefik.http.routers.{}.rule=Host(`{}`)",
                name, deployment.domain
            ),
            "--label".into(),
            format!(
                "traefik.http.services.{}.loadbalancer.server.port={}",
                name, port
            ),
            deployment.image.clone(),
        ]
    }

    pub fn stop(&self, reference: &Reference) -> Vec<String> {
        vec![
            self.settings.runtime.clone(),
            "stop".into(),
            "-i".into(),
            reference.to_string(),
        ]
    }

    pub fn remove(&self, reference: &Reference) -> Vec<String> {
        vec![
            self.settings.runtime.clone(),
            "rm".into(),
            "-i".into(),
            reference.to_string(),
        ]
    }

    pub fn remove_image(&self, reference: &Reference) -> Vec<String> {
        vec![
            self.settings.runtime.clone(),
            "image".into(),
            "rm".into(),
            "-i".into(),
            self.settings.image_for(reference),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_run_or_replace_arguments() {
        let runtime = ContainerRuntime::new(DeploySettings::default());
        let deployment = Deployment::new(
            Reference::parse("feature/login").unwrap(),
            runtime.settings(),
        );

        assert_eq!(
            runtime.run_or_replace(&deployment),
            vec![
                "podman",
                "run",
                "-d",
                "--name",
                "feature/login",
                "--replace",
                "--network=web",
                "--expose=80",
                "--restart=always",
                "--pull",
                "always",
                "--label",
                "traefik.http.routers.feature/login.rule=Host(`feature-login.corewar.shonk.software`)",
                "--label",
                "traefik.http.services.feature/login.loadbalancer.server.port=80",
                "ghcr.io/corewar-teamprojekt/aio:feature/login",
            ]
        );
    }

    #[test]
    fn test_teardown_arguments() {
        let runtime = ContainerRuntime::new(DeploySettings::default().with_runtime("docker".into()));
        let reference = Reference::parse("main").unwrap();

        assert_eq!(runtime.stop(&reference), vec!["docker", "stop", "-i", "main"]);
        assert_eq!(runtime.remove(&reference), vec!["docker", "rm", "-i", "main"]);
        assert_eq!(
            runtime.remove_image(&reference),
            vec!["docker", "image", "rm", "-i", "ghcr.io/corewar-teamprojekt/aio:main"]
        );
    }
}
