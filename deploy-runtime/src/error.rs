use regex::Regex;
use std::sync::LazyLock;
use thiserror::Error;

/// Stderr fragments the container runtime emits when the target of a
/// stop/remove does not exist.
static NOT_FOUND: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)(no such (container|image|object)|no container with name or id|image not known|image not found|container not found)",
    )
    .expect("not-found pattern is valid")
});

#[derive(Error, Debug)]
pub enum Error {
    #[error("{0}")]
    InvalidReference(String),

    #[error("Command failed: {command}: {stderr}")]
    CommandFailed { command: String, stderr: String },

    #[error("Refusing to run an empty command")]
    EmptyCommand,

    #[error("Invalid configuration: {0}")]
    Configuration(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Whether a failed runtime command only reported that its target is absent.
    pub fn is_not_found(&self) -> bool {
        match self {
            Error::CommandFailed { stderr, .. } => NOT_FOUND.is_match(stderr),
            _ => false,
        }
    }
}
