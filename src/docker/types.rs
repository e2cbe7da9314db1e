use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use serde::Deserialize;

use crate::wait::WaitCondition;

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

/// Cooperative cancellation token backed by an `AtomicBool`.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self(Arc::new(AtomicBool::new(false)))
    }

    /// Signal cancellation. Idempotent.
    pub fn cancel(&self) {
        self.0.store(true, Ordering::Release);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}

/// A host path bind-mounted into the container.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileMount {
    pub host_path: PathBuf,
    pub container_path: String,
    pub read_only: bool,
}

impl FileMount {
    pub fn read_only(host_path: impl Into<PathBuf>, container_path: impl Into<String>) -> Self {
        Self {
            host_path: host_path.into(),
            container_path: container_path.into(),
            read_only: true,
        }
    }

    pub fn read_write(host_path: impl Into<PathBuf>, container_path: impl Into<String>) -> Self {
        Self {
            read_only: false,
            ..Self::read_only(host_path, container_path)
        }
    }
}

/// Membership in a named network, reachable under `aliases`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NetworkAttachment {
    pub name: String,
    pub aliases: Vec<String>,
}

impl NetworkAttachment {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            aliases: Vec::new(),
        }
    }

    pub fn with_alias(mut self, alias: impl Into<String>) -> Self {
        let alias = alias.into();
        if !self.aliases.contains(&alias) {
            self.aliases.push(alias);
        }
        self
    }
}

/// Declarative description of a container to launch.
///
/// Built up front, then handed by value to [`Docker::start`](super::Docker::start),
/// after which it can no longer change.
#[derive(Debug, Clone)]
pub struct ContainerSpec {
    image: String,
    name: Option<String>,
    env: BTreeMap<String, String>,
    mounts: Vec<FileMount>,
    networks: Vec<NetworkAttachment>,
    command: Vec<String>,
    wait_for: WaitCondition,
    timeout: Duration,
}

impl ContainerSpec {
    /// A spec that is ready as soon as the container has started.
    pub fn new(image: impl Into<String>) -> Self {
        Self {
            image: image.into(),
            name: None,
            env: BTreeMap::new(),
            mounts: Vec::new(),
            networks: Vec::new(),
            command: Vec::new(),
            wait_for: WaitCondition::all([]),
            timeout: DEFAULT_TIMEOUT,
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.set_name(name);
        self
    }

    pub fn with_env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.set_env(key, value);
        self
    }

    pub fn with_mount(mut self, mount: FileMount) -> Self {
        self.push_mount(mount);
        self
    }

    pub fn with_network(mut self, network: NetworkAttachment) -> Self {
        self.attach_network(network);
        self
    }

    pub fn with_command<I, S>(mut self, command: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.set_command(command);
        self
    }

    pub fn with_wait_for(mut self, condition: WaitCondition) -> Self {
        self.set_wait_for(condition);
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.set_timeout(timeout);
        self
    }

    pub fn set_image(&mut self, image: impl Into<String>) {
        self.image = image.into();
    }

    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = Some(name.into());
    }

    /// Last writer wins.
    pub fn set_env(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.env.insert(key.into(), value.into());
    }

    pub fn push_mount(&mut self, mount: FileMount) {
        self.mounts.push(mount);
    }

    pub fn set_mounts(&mut self, mounts: Vec<FileMount>) {
        self.mounts = mounts;
    }

    /// Attaching a network twice merges the aliases into the first attachment.
    pub fn attach_network(&mut self, network: NetworkAttachment) {
        match self.networks.iter_mut().find(|n| n.name == network.name) {
            Some(existing) => {
                for alias in network.aliases {
                    if !existing.aliases.contains(&alias) {
                        existing.aliases.push(alias);
                    }
                }
            }
            None => self.networks.push(network),
        }
    }

    pub fn set_command<I, S>(&mut self, command: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.command = command.into_iter().map(Into::into).collect();
    }

    pub fn set_wait_for(&mut self, condition: WaitCondition) {
        self.wait_for = condition;
    }

    pub fn set_timeout(&mut self, timeout: Duration) {
        self.timeout = timeout;
    }

    pub fn image(&self) -> &str {
        &self.image
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn env(&self, key: &str) -> Option<&str> {
        self.env.get(key).map(String::as_str)
    }

    pub fn envs(&self) -> &BTreeMap<String, String> {
        &self.env
    }

    pub fn mounts(&self) -> &[FileMount] {
        &self.mounts
    }

    pub fn networks(&self) -> &[NetworkAttachment] {
        &self.networks
    }

    pub fn command(&self) -> &[String] {
        &self.command
    }

    pub fn wait_for(&self) -> &WaitCondition {
        &self.wait_for
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }
}

/// Process state as reported by `docker inspect`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ContainerState {
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub running: bool,
    #[serde(default)]
    pub exit_code: i32,
    #[serde(default)]
    pub error: String,
    #[serde(rename = "OOMKilled", default)]
    pub oom_killed: bool,
    #[serde(default)]
    pub health: Option<HealthState>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct HealthState {
    #[serde(default)]
    pub status: String,
}

impl ContainerState {
    /// True once the process has terminated, whatever its exit code.
    pub fn has_exited(&self) -> bool {
        matches!(self.status.as_str(), "exited" | "dead")
    }

    pub fn health_status(&self) -> Option<&str> {
        self.health
            .as_ref()
            .map(|h| h.status.as_str())
            .filter(|s| !s.is_empty())
    }
}

/// Result of a command run inside a live container.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecOutput {
    pub exit_code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl ExecOutput {
    pub fn success(&self) -> bool {
        self.exit_code == Some(0)
    }
}
