use std::path::PathBuf;
use std::time::Duration;

use super::constants::{
    DEFAULT_MIGRATIONS_PATH, ENV_CONNECT_RETRIES, ENV_GROUP, ENV_LOCATIONS, ENV_PASSWORD,
    ENV_TABLE, ENV_URL, ENV_USER, LOCATION_PREFIX,
};
use super::errors::ConfigError;
use super::request::resolve_image;
use crate::docker::{ContainerSpec, FileMount, NetworkAttachment};
use crate::wait::WaitCondition;

/// One configuration step for a Flyway container, applied in order.
#[derive(Debug, Clone)]
pub enum FlywayOption {
    /// Full image reference, e.g. `flyway/flyway:10-alpine`.
    Image(String),
    /// Version tag for the stock Flyway image.
    Version(String),
    Name(String),
    DatabaseUrl(String),
    User(String),
    Password(String),
    Table(String),
    ConnectRetries(u32),
    Group(bool),
    /// Raw `FLYWAY_LOCATIONS` value.
    Locations(String),
    /// Mount `host_path` as the migrations directory, replacing every
    /// existing mount. `container_path` defaults to `/flyway/sql`.
    Migrations {
        host_path: PathBuf,
        container_path: Option<String>,
    },
    /// An extra mount, e.g. a `flyway.conf` or driver jar.
    File(FileMount),
    Env {
        key: String,
        value: String,
    },
    Network(NetworkAttachment),
    Timeout(Duration),
    /// Replaces the whole readiness condition.
    WaitFor(WaitCondition),
}

impl FlywayOption {
    pub fn apply(self, spec: &mut ContainerSpec) -> Result<(), ConfigError> {
        match self {
            Self::Image(image) => {
                require_non_blank("image", &image)?;
                spec.set_image(image);
            }
            Self::Version(version) => {
                require_non_blank("version", &version)?;
                spec.set_image(resolve_image(Some(&version)));
            }
            Self::Name(name) => {
                require_non_blank("name", &name)?;
                spec.set_name(name);
            }
            Self::DatabaseUrl(url) => spec.set_env(ENV_URL, url),
            Self::User(user) => spec.set_env(ENV_USER, user),
            Self::Password(password) => spec.set_env(ENV_PASSWORD, password),
            Self::Table(table) => {
                require_non_blank("table", &table)?;
                spec.set_env(ENV_TABLE, table);
            }
            Self::ConnectRetries(retries) => spec.set_env(ENV_CONNECT_RETRIES, retries.to_string()),
            Self::Group(group) => spec.set_env(ENV_GROUP, group.to_string()),
            Self::Locations(locations) => spec.set_env(ENV_LOCATIONS, locations),
            Self::Migrations {
                host_path,
                container_path,
            } => {
                if host_path.as_os_str().is_empty() {
                    return Err(ConfigError::invalid("migrations", "host path is empty"));
                }
                let container_path = container_path
                    .filter(|p| !p.trim().is_empty())
                    .unwrap_or_else(|| DEFAULT_MIGRATIONS_PATH.to_string());
                require_absolute("migrations", &container_path)?;
                spec.set_env(ENV_LOCATIONS, format!("{LOCATION_PREFIX}{container_path}"));
                spec.set_mounts(vec![FileMount::read_only(host_path, container_path)]);
            }
            Self::File(mount) => {
                if mount.host_path.as_os_str().is_empty() {
                    return Err(ConfigError::invalid("file", "host path is empty"));
                }
                require_absolute("file", &mount.container_path)?;
                spec.push_mount(mount);
            }
            Self::Env { key, value } => {
                require_non_blank("env", &key)?;
                if key.contains('=') {
                    return Err(ConfigError::invalid("env", format!("key `{key}` contains '='")));
                }
                spec.set_env(key, value);
            }
            Self::Network(network) => {
                require_non_blank("network", &network.name)?;
                spec.attach_network(network);
            }
            Self::Timeout(timeout) => {
                if timeout.is_zero() {
                    return Err(ConfigError::invalid("timeout", "must be greater than zero"));
                }
                spec.set_timeout(timeout);
            }
            Self::WaitFor(condition) => spec.set_wait_for(condition),
        }
        Ok(())
    }
}

fn require_non_blank(option: &'static str, value: &str) -> Result<(), ConfigError> {
    if value.trim().is_empty() {
        return Err(ConfigError::invalid(option, "value is blank"));
    }
    Ok(())
}

fn require_absolute(option: &'static str, container_path: &str) -> Result<(), ConfigError> {
    if !container_path.starts_with('/') {
        return Err(ConfigError::invalid(
            option,
            format!("container path `{container_path}` must be absolute"),
        ));
    }
    Ok(())
}
