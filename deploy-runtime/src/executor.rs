use async_trait::async_trait;
use std::process::Stdio;
use tokio::process::Command;
use tracing::{error, info};

use crate::error::Error;

/// Capability to run an external command given as a discrete argument vector.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CommandRunner: Send + Sync {
    /// Run `argv[0]` with the remaining arguments and return its trimmed
    /// stdout, or `Error::CommandFailed` carrying stderr on a nonzero exit.
    async fn run(&self, argv: &[String]) -> Result<String, Error>;
}

/// Runs commands as child processes without a shell in between.
#[derive(Debug, Clone, Default)]
pub struct ProcessRunner;

impl ProcessRunner {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl CommandRunner for ProcessRunner {
    async fn run(&self, argv: &[String]) -> Result<String, Error> {
        let (program, args) = argv.split_first().ok_or(Error::EmptyCommand)?;
        let command = argv.join(" ");

        let output = Command::new(program)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .await
            .map_err(|e| {
                error!(%command, error = %e, "Command failed to start");
                Error::Io(e)
            })?;

        let stdout = String::from_utf8_lossy(&output.stdout).trim().to_string();

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            error!(%command, status = ?output.status.code(), %stderr, "Command failed");
            return Err(Error::CommandFailed { command, stderr });
        }

        info!(%command, "Command executed");
        info!(%command, output = %stdout, "Command output");
        Ok(stdout)
    }
}
