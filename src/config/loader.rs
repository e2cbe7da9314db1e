use serde::Deserialize;

use super::types::RuntimeConfig;

const CONFIG_FILE: &str = ".flywaytc.yaml";

/// The on-disk form of [`RuntimeConfig`]; every field is optional.
#[derive(Debug, Deserialize, Default)]
pub struct FileConfig {
    pub docker_binary: Option<String>,
    pub poll_interval_ms: Option<u64>,
    pub keep_containers: Option<bool>,
    pub stop_timeout_secs: Option<u64>,
}

impl FileConfig {
    /// Load config from a `.flywaytc.yaml` file in the given directory.
    pub fn load(dir: &std::path::Path) -> anyhow::Result<Option<Self>> {
        let path = dir.join(CONFIG_FILE);
        if !path.exists() {
            return Ok(None);
        }
        let contents = std::fs::read_to_string(&path)?;
        let config: FileConfig = serde_yaml::from_str(&contents)?;
        Ok(Some(config))
    }

    pub fn apply_to(self, config: &mut RuntimeConfig) {
        if let Some(binary) = self.docker_binary.filter(|b| !b.trim().is_empty()) {
            config.docker_binary = binary;
        }
        if let Some(ms) = self.poll_interval_ms {
            config.poll_interval_ms = ms;
        }
        if let Some(keep) = self.keep_containers {
            config.keep_containers = keep;
        }
        if let Some(secs) = self.stop_timeout_secs {
            config.stop_timeout_secs = secs;
        }
    }
}
