use anyhow::Result;
use tracing::{info, warn};

use super::engine::{Docker, short_id};
use super::types::{ContainerState, ExecOutput};

/// A container created by [`Docker::start`].
///
/// Removed on drop unless it was already terminated or the runtime is
/// configured with `keep_containers`.
#[derive(Debug)]
pub struct Container {
    docker: Docker,
    id: String,
    name: Option<String>,
    removed: bool,
}

impl Container {
    pub(crate) fn new(docker: Docker, id: String, name: Option<String>) -> Self {
        Self {
            docker,
            id,
            name,
            removed: false,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn state(&self) -> Result<ContainerState> {
        self.docker.inspect_state(&self.id)
    }

    /// Everything the container has written so far, stdout then stderr.
    pub fn logs(&self) -> Result<String> {
        self.docker.logs(&self.id)
    }

    pub fn exec(&self, args: &[&str]) -> Result<ExecOutput> {
        self.docker.exec(&self.id, args)
    }

    /// Stop the container gracefully, then remove it and its anonymous
    /// volumes. Drop skips the grace period and force-removes.
    pub fn terminate(mut self) -> Result<()> {
        self.removed = true;
        if let Err(e) = self.docker.stop_container(&self.id) {
            warn!(id = %short_id(&self.id), error = %e, "graceful stop failed");
        }
        self.docker.remove_container(&self.id)?;
        info!(id = %short_id(&self.id), "container removed");
        Ok(())
    }
}

impl Drop for Container {
    fn drop(&mut self) {
        if self.removed {
            return;
        }
        if self.docker.config().keep_containers {
            info!(id = %short_id(&self.id), "keeping container");
            return;
        }
        if let Err(e) = self.docker.remove_container(&self.id) {
            warn!(id = %short_id(&self.id), error = %e, "failed to remove container");
        }
    }
}
