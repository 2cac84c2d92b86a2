use std::sync::Arc;
use tracing::{debug, error, info};

use crate::{
    config::DeploySettings,
    error::Error,
    executor::CommandRunner,
    reference::Reference,
    runtime::ContainerRuntime,
    types::{DeleteStep, Deployment},
};

/// Creates, replaces and tears down deployments through a [`CommandRunner`].
#[derive(Clone)]
pub struct DeploymentService {
    runner: Arc<dyn CommandRunner>,
    runtime: ContainerRuntime,
}

impl DeploymentService {
    pub fn new(settings: DeploySettings, runner: Arc<dyn CommandRunner>) -> Self {
        Self {
            runner,
            runtime: ContainerRuntime::new(settings),
        }
    }

    pub fn settings(&self) -> &DeploySettings {
        self.runtime.settings()
    }

    /// Run the deployment for `reference`, replacing an existing container of
    /// the same name. Idempotent.
    pub async fn create_or_update(&self, reference: &Reference) -> Result<Deployment, Error> {
        let deployment = Deployment::new(reference.clone(), self.runtime.settings());
        debug!(%reference, domain = %deployment.domain, "Creating or updating deployment");

        self.runner
            .run(&self.runtime.run_or_replace(&deployment))
            .await
            .map_err(|e| {
                error!(%reference, error = %e, "Error creating/updating deployment");
                e
            })?;

        info!(%reference, url = %deployment.url(), "Deployment created/updated");
        Ok(deployment)
    }

    /// Stop and remove the container, then remove its image.
    ///
    /// A step whose target is already gone counts as done, so deleting an
    /// absent deployment succeeds. Any other failure aborts the remaining
    /// steps.
    pub async fn delete(&self, reference: &Reference) -> Result<(), Error> {
        for step in DeleteStep::ALL {
            let argv = match step {
                DeleteStep::StopContainer => self.runtime.stop(reference),
                DeleteStep::RemoveContainer => self.runtime.remove(reference),
                DeleteStep::RemoveImage => self.runtime.remove_image(reference),
            };

            match self.runner.run(&argv).await {
                Ok(_) => {}
                Err(e) if e.is_not_found() => {
                    debug!(%reference, %step, "Target already absent");
                }
                Err(e) => {
                    error!(%reference, %step, error = %e, "Error deleting deployment");
                    return Err(e);
                }
            }
        }

        info!(%reference, "Deployment deleted");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::executor::MockCommandRunner;
    use mockall::Sequence;

    fn failure(stderr: &str) -> Error {
        Error::CommandFailed {
            command: "podman".to_string(),
            stderr: stderr.to_string(),
        }
    }

    fn reference(raw: &str) -> Reference {
        Reference::parse(raw).unwrap()
    }

    #[tokio::test]
    async fn test_create_issues_single_run() -> Result<(), Error> {
        let mut runner = MockCommandRunner::new();
        runner
            .expect_run()
            .withf(|argv: &[String]| {
                argv[..6] == ["podman", "run", "-d", "--name", "feature/x", "--replace"]
                    && argv.last().map(String::as_str) == Some("ghcr.io/corewar-teamprojekt/aio:feature/x")
            })
            .times(1)
            .returning(|_| Ok("3f2a9c".to_string()));

        let service = DeploymentService::new(DeploySettings::default(), Arc::new(runner));
        let deployment = service.create_or_update(&reference("feature/x")).await?;

        assert_eq!(deployment.domain, "feature-x.corewar.shonk.software");
        Ok(())
    }

    #[tokio::test]
    async fn test_create_propagates_failure() {
        let mut runner = MockCommandRunner::new();
        runner
            .expect_run()
            .times(1)
            .returning(|_| Err(failure("Error: initializing source: manifest unknown")));

        let service = DeploymentService::new(DeploySettings::default(), Arc::new(runner));
        let err = service.create_or_update(&reference("main")).await.unwrap_err();
        assert!(matches!(err, Error::CommandFailed { .. }));
    }

    #[tokio::test]
    async fn test_delete_runs_steps_in_order() -> Result<(), Error> {
        let mut runner = MockCommandRunner::new();
        let mut seq = Sequence::new();
        for expected in [
            vec!["podman", "stop", "-i", "main"],
            vec!["podman", "rm", "-i", "main"],
            vec!["podman", "image", "rm", "-i", "ghcr.io/corewar-teamprojekt/aio:main"],
        ] {
            runner
                .expect_run()
                .withf(move |argv: &[String]| *argv == expected[..])
                .times(1)
                .in_sequence(&mut seq)
                .returning(|_| Ok(String::new()));
        }

        let service = DeploymentService::new(DeploySettings::default(), Arc::new(runner));
        service.delete(&reference("main")).await
    }

    #[tokio::test]
    async fn test_delete_tolerates_not_found() -> Result<(), Error> {
        let mut runner = MockCommandRunner::new();
        runner
            .expect_run()
            .times(3)
            .returning(|_| Err(failure("Error: no container with name or ID \"gone\" found: no such container")));

        let service = DeploymentService::new(DeploySettings::default(), Arc::new(runner));
        service.delete(&reference("gone")).await
    }

    #[tokio::test]
    async fn test_delete_aborts_on_first_real_failure() {
        let mut runner = MockCommandRunner::new();
        runner
            .expect_run()
            .withf(|argv: &[String]| argv[1] == "stop")
            .times(1)
            .returning(|_| Err(failure("Error: cannot connect to Podman socket")));
        runner
            .expect_run()
            .withf(|argv: &[String]| argv[1] != "stop")
            .times(0);

        let service = DeploymentService::new(DeploySettings::default(), Arc::new(runner));
        let err = service.delete(&reference("main")).await.unwrap_err();
        assert!(!err.is_not_found());
    }

    #[tokio::test]
    async fn test_delete_aborts_before_image_removal() {
        let mut runner = MockCommandRunner::new();
        runner
            .expect_run()
            .withf(|argv: &[String]| argv[1] == "stop")
            .times(1)
            .returning(|_| Ok(String::new()));
        runner
            .expect_run()
            .withf(|argv: &[String]| argv[1] == "rm")
            .times(1)
            .returning(|_| Err(failure("Error: container is paused")));
        runner
            .expect_run()
            .withf(|argv: &[String]| argv[1] == "image")
            .times(0);

        let service = DeploymentService::new(DeploySettings::default(), Arc::new(runner));
        assert!(service.delete(&reference("main")).await.is_err());
    }
}
