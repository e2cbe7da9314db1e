use std::io::BufRead;
use std::path::{Path, PathBuf};
use std::process::{Child, Stdio};
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use anyhow::{Context, Result, bail};
use tracing::{debug, info, warn};

use super::container::Container;
use super::engine::{Docker, short_id};
use super::types::{CancelToken, ContainerSpec, FileMount, NetworkAttachment};
use crate::wait::{OUTPUT_TAIL, Probe, Snapshot, wait_until};

/// How long a finished container's log stream may take to drain.
const DRAIN_TIMEOUT: Duration = Duration::from_secs(5);
const DRAIN_POLL: Duration = Duration::from_millis(20);

impl Docker {
    /// Create and start a container, then block until its readiness
    /// condition holds.
    ///
    /// The container is removed again if anything fails after creation.
    pub fn start(&self, spec: ContainerSpec, cancel: &CancelToken) -> Result<Container> {
        let mounts = resolve_mounts(spec.mounts())?;
        let args = create_args(&spec, &mounts);

        let id = self
            .output(&args)
            .with_context(|| format!("failed to create container from {}", spec.image()))?;
        let container = Container::new(self.clone(), id, spec.name().map(str::to_string));
        debug!(id = %short_id(container.id()), image = %spec.image(), "container created");

        for network in spec.networks().iter().skip(1) {
            self.output(connect_args(network, container.id()))
                .with_context(|| format!("failed to attach network {}", network.name))?;
        }

        self.output(["start", container.id()])
            .with_context(|| format!("failed to start container {}", short_id(container.id())))?;
        info!(id = %short_id(container.id()), image = %spec.image(), "container started");

        let follower = LogFollower::spawn(self, container.id())?;
        let mut probe = DockerProbe {
            docker: self,
            id: container.id(),
            follower,
        };

        let outcome = wait_until(
            spec.wait_for(),
            &mut probe,
            spec.timeout(),
            self.config().poll_interval(),
            cancel,
        );
        let lines = probe.finish();

        if let Err(err) = outcome {
            let tail = lines.len().saturating_sub(OUTPUT_TAIL);
            warn!(
                id = %short_id(container.id()),
                error = %err,
                log_tail = %lines[tail..].join("\n"),
                "container did not become ready"
            );
            return Err(err).with_context(|| {
                format!(
                    "container {} ({}) did not become ready",
                    short_id(container.id()),
                    spec.image()
                )
            });
        }

        Ok(container)
    }
}

/// Make mount host paths absolute and check that they exist.
fn resolve_mounts(mounts: &[FileMount]) -> Result<Vec<FileMount>> {
    mounts
        .iter()
        .map(|m| {
            let host_path = absolute(&m.host_path).with_context(|| {
                format!(
                    "mount source {} (for {}) does not exist",
                    m.host_path.display(),
                    m.container_path
                )
            })?;
            Ok(FileMount {
                host_path,
                ..m.clone()
            })
        })
        .collect()
}

fn absolute(path: &Path) -> Result<PathBuf> {
    if path.as_os_str().is_empty() {
        bail!("empty path");
    }
    Ok(std::fs::canonicalize(path)?)
}

/// Arguments for `docker create`. Only the first network can be joined at
/// creation time; the rest are connected with [`connect_args`].
fn create_args(spec: &ContainerSpec, mounts: &[FileMount]) -> Vec<String> {
    let mut args = vec!["create".to_string()];

    if let Some(name) = spec.name() {
        args.extend(["--name".into(), name.to_string()]);
    }

    if let Some(network) = spec.networks().first() {
        args.extend(["--network".into(), network.name.clone()]);
        for alias in &network.aliases {
            args.extend(["--network-alias".into(), alias.clone()]);
        }
    }

    for (key, value) in spec.envs() {
        args.extend(["-e".into(), format!("{key}={value}")]);
    }

    for mount in mounts {
        let mut volume = format!("{}:{}", mount.host_path.display(), mount.container_path);
        if mount.read_only {
            volume.push_str(":ro");
        }
        args.extend(["-v".into(), volume]);
    }

    args.push(spec.image().to_string());
    args.extend(spec.command().iter().cloned());
    args
}

fn connect_args(network: &NetworkAttachment, id: &str) -> Vec<String> {
    let mut args = vec!["network".to_string(), "connect".to_string()];
    for alias in &network.aliases {
        args.extend(["--alias".into(), alias.clone()]);
    }
    args.extend([network.name.clone(), id.to_string()]);
    args
}

/// Follows `docker logs --follow`, collecting stdout and stderr lines into
/// one buffer in arrival order.
struct LogFollower {
    child: Child,
    lines: Arc<Mutex<Vec<String>>>,
    readers: Vec<JoinHandle<()>>,
}

impl LogFollower {
    fn spawn(docker: &Docker, id: &str) -> Result<Self> {
        let mut child = docker
            .command()
            .args(["logs", "--follow", id])
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .context("failed to follow container logs")?;

        let lines = Arc::new(Mutex::new(Vec::new()));
        let mut readers = Vec::with_capacity(2);
        if let Some(stdout) = child.stdout.take() {
            readers.push(read_lines(stdout, lines.clone()));
        }
        if let Some(stderr) = child.stderr.take() {
            readers.push(read_lines(stderr, lines.clone()));
        }

        Ok(Self {
            child,
            lines,
            readers,
        })
    }

    fn lines(&self) -> Vec<String> {
        match self.lines.lock() {
            Ok(lines) => lines.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    /// Wait up to `timeout` for the stream to end on its own. Returns false
    /// if the follower had to be killed, in which case output may be missing.
    fn drain(&mut self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        let complete = loop {
            match self.child.try_wait() {
                Ok(Some(_)) => break true,
                Ok(None) if Instant::now() < deadline => std::thread::sleep(DRAIN_POLL),
                Ok(None) | Err(_) => {
                    warn!("log stream did not end after container exit; killing follower");
                    let _ = self.child.kill();
                    let _ = self.child.wait();
                    break false;
                }
            }
        };
        for reader in self.readers.drain(..) {
            let _ = reader.join();
        }
        complete
    }

    /// Stop following and return everything collected.
    fn stop(mut self) -> Vec<String> {
        if matches!(self.child.try_wait(), Ok(None)) {
            let _ = self.child.kill();
            let _ = self.child.wait();
        }
        for reader in self.readers.drain(..) {
            let _ = reader.join();
        }
        self.lines()
    }
}

fn read_lines<R>(stream: R, lines: Arc<Mutex<Vec<String>>>) -> JoinHandle<()>
where
    R: std::io::Read + Send + 'static,
{
    std::thread::spawn(move || {
        let reader = std::io::BufReader::new(stream);
        for line in reader.lines() {
            match line {
                Ok(l) => {
                    if let Ok(mut buf) = lines.lock() {
                        buf.push(l);
                    }
                }
                Err(_) => break,
            }
        }
    })
}

/// Observes a live container through `docker inspect` plus its log stream.
struct DockerProbe<'a> {
    docker: &'a Docker,
    id: &'a str,
    follower: LogFollower,
}

impl DockerProbe<'_> {
    fn finish(self) -> Vec<String> {
        self.follower.stop()
    }
}

impl Probe for DockerProbe<'_> {
    fn observe(&mut self) -> Result<Snapshot> {
        let state = self.docker.inspect_state(self.id)?;
        let exited = state.has_exited();
        // The follower ends once the container stops; wait for it so the
        // snapshot carries the complete output.
        if exited && !self.follower.drain(DRAIN_TIMEOUT) {
            bail!("log stream did not end within {DRAIN_TIMEOUT:?} of container exit");
        }
        Ok(Snapshot {
            exited,
            exit_code: exited.then_some(state.exit_code),
            health: state.health_status().map(str::to_string),
            lines: self.follower.lines(),
        })
    }
}
