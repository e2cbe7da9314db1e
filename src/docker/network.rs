use anyhow::{Context, Result};
use tracing::{info, warn};
use uuid::Uuid;

use super::engine::Docker;
use super::types::NetworkAttachment;

const NAME_PREFIX: &str = "flywaytc";

/// A disposable bridge network, removed on drop.
///
/// Drop containers attached to it first; the runtime refuses to remove a
/// network that still has endpoints.
#[derive(Debug)]
pub struct Network {
    docker: Docker,
    name: String,
    removed: bool,
}

impl Network {
    pub fn create(docker: &Docker) -> Result<Self> {
        let name = format!("{NAME_PREFIX}-{}", Uuid::new_v4().simple());
        docker
            .output(["network", "create", "--driver", "bridge", name.as_str()])
            .with_context(|| format!("failed to create network {name}"))?;
        info!(network = %name, "network created");
        Ok(Self {
            docker: docker.clone(),
            name,
            removed: false,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Attachment to this network under the given DNS aliases.
    pub fn attachment<I, S>(&self, aliases: I) -> NetworkAttachment
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        aliases
            .into_iter()
            .fold(NetworkAttachment::new(self.name.clone()), |n, a| {
                n.with_alias(a)
            })
    }

    pub fn remove(mut self) -> Result<()> {
        self.removed = true;
        self.docker
            .output(["network", "rm", self.name.as_str()])
            .with_context(|| format!("failed to remove network {}", self.name))?;
        info!(network = %self.name, "network removed");
        Ok(())
    }
}

impl Drop for Network {
    fn drop(&mut self) {
        if self.removed || self.docker.config().keep_containers {
            return;
        }
        if let Err(e) = self.docker.output(["network", "rm", self.name.as_str()]) {
            warn!(network = %self.name, error = %e, "failed to remove network");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RuntimeConfig;

    fn offline_network(name: &str) -> Network {
        Network {
            docker: Docker::new(RuntimeConfig {
                docker_binary: "/nonexistent/docker-binary".into(),
                keep_containers: true,
                ..RuntimeConfig::default()
            }),
            name: name.into(),
            removed: false,
        }
    }

    #[test]
    fn attachment_carries_name_and_aliases() {
        let network = offline_network("flywaytc-test");
        let attachment = network.attachment(["flyway", "migrator", "flyway"]);
        assert_eq!(attachment.name, "flywaytc-test");
        assert_eq!(attachment.aliases, vec!["flyway", "migrator"]);
    }

    #[test]
    fn create_fails_without_runtime() {
        let docker = Docker::new(RuntimeConfig {
            docker_binary: "/nonexistent/docker-binary".into(),
            ..RuntimeConfig::default()
        });
        let err = Network::create(&docker).unwrap_err();
        assert!(err.to_string().starts_with("failed to create network flywaytc-"));
    }
}
