use std::path::PathBuf;
use std::time::Duration;

use super::constants::{
    APPLIED_PATTERN, COMMAND, DEFAULT_CONNECT_RETRIES, DEFAULT_MIGRATIONS_PATH, DEFAULT_TABLE,
    DEFAULT_TIMEOUT, DEFAULT_VERSION, ENV_CONNECT_RETRIES, ENV_GROUP, ENV_LOCATIONS, ENV_PASSWORD,
    ENV_TABLE, ENV_URL, ENV_USER, IMAGE_NAME, LOCATION_PREFIX, VALIDATED_PATTERN,
};
use super::container::{FlywayContainer, run};
use super::errors::ConfigError;
use super::options::FlywayOption;
use crate::docker::{CancelToken, ContainerSpec, Docker, FileMount, NetworkAttachment};
use crate::wait::WaitCondition;

/// Image reference for a Flyway version. A missing or blank version selects
/// [`DEFAULT_VERSION`].
pub fn resolve_image(version: Option<&str>) -> String {
    let version = version
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .unwrap_or(DEFAULT_VERSION);
    format!("{IMAGE_NAME}:{version}")
}

/// Ready once the process has exited and both the "applied" and "validated"
/// summaries have been logged.
pub fn default_wait_condition() -> Result<WaitCondition, regex::Error> {
    Ok(WaitCondition::all([
        WaitCondition::for_exit(),
        WaitCondition::for_log(APPLIED_PATTERN)?,
        WaitCondition::for_log(VALIDATED_PATTERN)?,
    ]))
}

fn default_spec() -> Result<ContainerSpec, ConfigError> {
    Ok(ContainerSpec::new(resolve_image(None))
        .with_env(ENV_TABLE, DEFAULT_TABLE)
        .with_env(ENV_CONNECT_RETRIES, DEFAULT_CONNECT_RETRIES.to_string())
        .with_env(ENV_GROUP, "true")
        .with_env(ENV_LOCATIONS, format!("{LOCATION_PREFIX}{DEFAULT_MIGRATIONS_PATH}"))
        .with_command(COMMAND)
        .with_wait_for(default_wait_condition()?)
        .with_timeout(DEFAULT_TIMEOUT))
}

/// Fold `options` over the default Flyway spec and validate the result.
///
/// Stops at the first option that fails. Performs no I/O.
pub fn build<I>(options: I) -> Result<ContainerSpec, ConfigError>
where
    I: IntoIterator<Item = FlywayOption>,
{
    let mut spec = default_spec()?;
    for option in options {
        option.apply(&mut spec)?;
    }
    validate(&spec)?;
    Ok(spec)
}

/// Check that `spec` can run a migration. Migrations are checked before
/// credentials, and the first problem found is reported.
pub fn validate(spec: &ContainerSpec) -> Result<(), ConfigError> {
    let locations = non_blank(spec.env(ENV_LOCATIONS)).ok_or(ConfigError::EmptyLocations)?;

    let missing = || ConfigError::MissingMigrations {
        locations: locations.to_string(),
    };
    if spec.mounts().is_empty() {
        return Err(missing());
    }

    let mut targeted = 0;
    for path in filesystem_locations(locations) {
        let count = spec
            .mounts()
            .iter()
            .filter(|m| normalize(&m.container_path) == path)
            .count();
        if count > 1 {
            return Err(ConfigError::AmbiguousMigrations {
                path: path.to_string(),
                count,
            });
        }
        targeted += count;
    }
    if targeted == 0 {
        return Err(missing());
    }

    non_blank(spec.env(ENV_URL)).ok_or(ConfigError::MissingDatabaseUrl)?;
    non_blank(spec.env(ENV_USER)).ok_or(ConfigError::MissingUser)?;
    non_blank(spec.env(ENV_PASSWORD)).ok_or(ConfigError::MissingPassword)?;
    Ok(())
}

/// Mounts that back one of the `filesystem:` locations Flyway will scan.
pub(crate) fn migration_mounts(spec: &ContainerSpec) -> Vec<&FileMount> {
    let locations = filesystem_locations(spec.env(ENV_LOCATIONS).unwrap_or_default());
    spec.mounts()
        .iter()
        .filter(|m| locations.contains(&normalize(&m.container_path)))
        .collect()
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.trim().is_empty())
}

/// Container paths named by `filesystem:` entries of a locations list.
fn filesystem_locations(locations: &str) -> Vec<&str> {
    let mut paths: Vec<&str> = locations
        .split(',')
        .filter_map(|l| l.trim().strip_prefix(LOCATION_PREFIX))
        .map(normalize)
        .filter(|p| !p.is_empty())
        .collect();
    paths.dedup();
    paths
}

fn normalize(path: &str) -> &str {
    match path.trim().trim_end_matches('/') {
        "" if path.trim().starts_with('/') => "/",
        trimmed => trimmed,
    }
}

/// Chained builder over [`FlywayOption`]s.
///
/// ```no_run
/// use flyway_testcontainer::{CancelToken, Docker, Flyway};
///
/// let docker = Docker::discover()?;
/// let flyway = Flyway::new()
///     .with_database_url("jdbc:postgresql://pgdb:5432/test_db")
///     .with_user("postgres")
///     .with_password("postgres")
///     .with_migrations("tests/testdata/postgres")
///     .start(&docker, &CancelToken::new())?;
/// flyway.ensure_success()?;
/// # Ok::<(), anyhow::Error>(())
/// ```
#[derive(Debug, Clone, Default)]
pub struct Flyway {
    options: Vec<FlywayOption>,
}

impl Flyway {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, option: FlywayOption) -> Self {
        self.options.push(option);
        self
    }

    pub fn with_image(self, image: impl Into<String>) -> Self {
        self.with(FlywayOption::Image(image.into()))
    }

    pub fn with_version(self, version: impl Into<String>) -> Self {
        self.with(FlywayOption::Version(version.into()))
    }

    pub fn with_name(self, name: impl Into<String>) -> Self {
        self.with(FlywayOption::Name(name.into()))
    }

    pub fn with_database_url(self, url: impl Into<String>) -> Self {
        self.with(FlywayOption::DatabaseUrl(url.into()))
    }

    pub fn with_user(self, user: impl Into<String>) -> Self {
        self.with(FlywayOption::User(user.into()))
    }

    pub fn with_password(self, password: impl Into<String>) -> Self {
        self.with(FlywayOption::Password(password.into()))
    }

    pub fn with_table(self, table: impl Into<String>) -> Self {
        self.with(FlywayOption::Table(table.into()))
    }

    pub fn with_connect_retries(self, retries: u32) -> Self {
        self.with(FlywayOption::ConnectRetries(retries))
    }

    pub fn with_group(self, group: bool) -> Self {
        self.with(FlywayOption::Group(group))
    }

    pub fn with_locations(self, locations: impl Into<String>) -> Self {
        self.with(FlywayOption::Locations(locations.into()))
    }

    /// Mount a host directory at `/flyway/sql`.
    pub fn with_migrations(self, host_path: impl Into<PathBuf>) -> Self {
        self.with(FlywayOption::Migrations {
            host_path: host_path.into(),
            container_path: None,
        })
    }

    pub fn with_migrations_at(
        self,
        host_path: impl Into<PathBuf>,
        container_path: impl Into<String>,
    ) -> Self {
        self.with(FlywayOption::Migrations {
            host_path: host_path.into(),
            container_path: Some(container_path.into()),
        })
    }

    pub fn with_file(self, mount: FileMount) -> Self {
        self.with(FlywayOption::File(mount))
    }

    pub fn with_env(self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.with(FlywayOption::Env {
            key: key.into(),
            value: value.into(),
        })
    }

    pub fn with_network(self, network: NetworkAttachment) -> Self {
        self.with(FlywayOption::Network(network))
    }

    pub fn with_timeout(self, timeout: Duration) -> Self {
        self.with(FlywayOption::Timeout(timeout))
    }

    pub fn with_wait_for(self, condition: WaitCondition) -> Self {
        self.with(FlywayOption::WaitFor(condition))
    }

    pub fn options(&self) -> &[FlywayOption] {
        &self.options
    }

    pub fn build(&self) -> Result<ContainerSpec, ConfigError> {
        build(self.options.iter().cloned())
    }

    pub fn start(&self, docker: &Docker, cancel: &CancelToken) -> anyhow::Result<FlywayContainer> {
        run(docker, self.options.iter().cloned(), cancel)
    }
}
