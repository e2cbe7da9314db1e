use std::path::Path;
use std::time::Duration;

use anyhow::Result;
use serde::{Deserialize, Serialize};

use super::loader::FileConfig;

/// Settings for the container runtime layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    /// Program invoked for every runtime call.
    pub docker_binary: String,
    /// How often the readiness detector re-inspects a container.
    pub poll_interval_ms: u64,
    /// Leave containers and networks behind after a test (for debugging).
    pub keep_containers: bool,
    /// Grace period handed to `docker stop` before the container is killed.
    pub stop_timeout_secs: u64,
}

impl RuntimeConfig {
    /// Defaults overlaid with `.flywaytc.yaml` from `dir`, if one exists.
    pub fn discover(dir: &Path) -> Result<Self> {
        let mut config = Self::default();
        if let Some(file) = FileConfig::load(dir)? {
            file.apply_to(&mut config);
        }
        Ok(config)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms.max(1))
    }
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            docker_binary: "docker".to_string(),
            poll_interval_ms: 200,
            keep_containers: false,
            stop_timeout_secs: 10,
        }
    }
}
