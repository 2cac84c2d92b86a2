//! In-memory stand-in for a podman-compatible runtime, for tests that care
//! about the state a sequence of commands leaves behind.

use async_trait::async_trait;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::{Mutex, MutexGuard};

use crate::{error::Error, executor::CommandRunner};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FakeContainer {
    pub image: String,
    pub running: bool,
    pub labels: Vec<String>,
}

#[derive(Debug, Default)]
struct State {
    containers: BTreeMap<String, FakeContainer>,
    images: BTreeSet<String>,
    calls: Vec<Vec<String>>,
    failures: HashMap<String, String>,
}

/// Fake container runtime implementing [`CommandRunner`].
#[derive(Debug, Default)]
pub struct FakeRuntime {
    state: Mutex<State>,
}

impl FakeRuntime {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every later invocation of `subcommand` (`run`, `stop`, `rm`,
    /// `image`) fail with `stderr`.
    pub fn fail_on(&self, subcommand: &str, stderr: &str) {
        self.lock()
            .failures
            .insert(subcommand.to_string(), stderr.to_string());
    }

    pub fn containers(&self) -> BTreeMap<String, FakeContainer> {
        self.lock().containers.clone()
    }

    pub fn images(&self) -> BTreeSet<String> {
        self.lock().images.clone()
    }

    pub fn calls(&self) -> Vec<Vec<String>> {
        self.lock().calls.clone()
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

fn failed(argv: &[String], stderr: impl Into<String>) -> Error {
    Error::CommandFailed {
        command: argv.join(" "),
        stderr: stderr.into(),
    }
}

impl State {
    fn run(&mut self, argv: &[String]) -> Result<String, Error> {
        let args = &argv[2..];
        let name = args
            .iter()
            .position(|a| a == "--name")
            .and_then(|i| args.get(i + 1))
            .ok_or_else(|| failed(argv, "Error: missing --name"))?
            .clone();
        let image = args
            .last()
            .ok_or_else(|| failed(argv, "Error: missing image"))?
            .clone();

        if self.containers.contains_key(&name) && !args.iter().any(|a| a == "--replace") {
            return Err(failed(
                argv,
                format!("Error: the container name \"{name}\" is already in use"),
            ));
        }

        let labels = args
            .windows(2)
            .filter(|w| w[0] == "--label")
            .map(|w| w[1].clone())
            .collect();

        self.images.insert(image.clone());
        self.containers.insert(
            name.clone(),
            FakeContainer {
                image,
                running: true,
                labels,
            },
        );
        Ok(format!("fake-{name}"))
    }

    fn stop(&mut self, argv: &[String], ignore: bool, name: &str) -> Result<String, Error> {
        match self.containers.get_mut(name) {
            Some(container) => {
                container.running = false;
                Ok(name.to_string())
            }
            None if ignore => Ok(String::new()),
            None => Err(failed(
                argv,
                format!("Error: no container with name or ID \"{name}\" found: no such container"),
            )),
        }
    }

    fn remove(&mut self, argv: &[String], ignore: bool, name: &str) -> Result<String, Error> {
        match self.containers.get(name) {
            Some(container) if container.running => Err(failed(
                argv,
                format!("Error: cannot remove container {name} as it is running"),
            )),
            Some(_) => {
                self.containers.remove(name);
                Ok(name.to_string())
            }
            None if ignore => Ok(String::new()),
            None => Err(failed(
                argv,
                format!("Error: no container with name or ID \"{name}\" found: no such container"),
            )),
        }
    }

    fn remove_image(&mut self, argv: &[String], ignore: bool, image: &str) -> Result<String, Error> {
        if self.containers.values().any(|c| c.image == image) {
            return Err(failed(
                argv,
                format!("Error: image used by a container: {image}: image is in use by a container"),
            ));
        }
        if self.images.remove(image) || ignore {
            return Ok(String::new());
        }
        Err(failed(argv, format!("Error: {image}: image not known")))
    }
}

#[async_trait]
impl CommandRunner for FakeRuntime {
    async fn run(&self, argv: &[String]) -> Result<String, Error> {
        let mut state = self.lock();
        state.calls.push(argv.to_vec());

        let subcommand = argv.get(1).ok_or(Error::EmptyCommand)?.clone();
        if let Some(stderr) = state.failures.get(&subcommand).cloned() {
            return Err(failed(argv, stderr));
        }

        let ignore = argv.iter().any(|a| a == "-i" || a == "--ignore");
        let target = argv.last().cloned().unwrap_or_default();

        match subcommand.as_str() {
            "run" => state.run(argv),
            "stop" => state.stop(argv, ignore, &target),
            "rm" => state.remove(argv, ignore, &target),
            "image" if argv.get(2).map(String::as_str) == Some("rm") => {
                state.remove_image(argv, ignore, &target)
            }
            other => Err(failed(argv, format!("Error: unrecognized command `{other}`"))),
        }
    }
}
