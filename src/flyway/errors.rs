use crate::docker::ContainerState;

/// A Flyway request that cannot be launched. Raised before any container
/// exists; always fixable by passing the right option.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ConfigError {
    #[error("missing migrations: FLYWAY_LOCATIONS is empty; call `with_migrations` or `with_locations`")]
    EmptyLocations,

    #[error(
        "missing migrations: no file mount targets {locations}; call `with_migrations` with the host directory holding your scripts"
    )]
    MissingMigrations { locations: String },

    #[error(
        "ambiguous migrations: {count} file mounts target {path}; call `with_migrations` once to replace them"
    )]
    AmbiguousMigrations { path: String, count: usize },

    #[error("missing database url: FLYWAY_URL is empty; call `with_database_url`")]
    MissingDatabaseUrl,

    #[error("missing user: FLYWAY_USER is empty; call `with_user`")]
    MissingUser,

    #[error("missing password: FLYWAY_PASSWORD is empty; call `with_password`")]
    MissingPassword,

    #[error("invalid `{option}` option: {reason}")]
    InvalidOption {
        option: &'static str,
        reason: String,
    },

    #[error("invalid readiness pattern: {0}")]
    InvalidPattern(#[from] regex::Error),
}

impl ConfigError {
    pub(crate) fn invalid(option: &'static str, reason: impl Into<String>) -> Self {
        Self::InvalidOption {
            option,
            reason: reason.into(),
        }
    }
}

/// A migration run that finished but did not succeed.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MigrationError {
    #[error("flyway exited with code {exit_code}{}", health_suffix(.health))]
    Failed {
        exit_code: i32,
        health: Option<String>,
    },

    #[error("flyway container is still {status}")]
    NotFinished { status: String },
}

fn health_suffix(health: &Option<String>) -> String {
    health
        .as_deref()
        .map(|h| format!(" (health: {h})"))
        .unwrap_or_default()
}

impl MigrationError {
    /// Interpret the final state of a Flyway container: exit 0 is success.
    pub fn check(state: &ContainerState) -> Result<(), Self> {
        if !state.has_exited() {
            return Err(Self::NotFinished {
                status: state.status.clone(),
            });
        }
        if state.exit_code != 0 {
            return Err(Self::Failed {
                exit_code: state.exit_code,
                health: state.health_status().map(str::to_string),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::docker::HealthState;

    fn state(status: &str, exit_code: i32, health: Option<&str>) -> ContainerState {
        ContainerState {
            status: status.into(),
            exit_code,
            health: health.map(|h| HealthState { status: h.into() }),
            ..ContainerState::default()
        }
    }

    #[test]
    fn exit_zero_is_success() {
        assert_eq!(MigrationError::check(&state("exited", 0, None)), Ok(()));
    }

    #[test]
    fn nonzero_exit_is_failure() {
        let err = MigrationError::check(&state("exited", 1, None)).unwrap_err();
        assert_eq!(
            err,
            MigrationError::Failed {
                exit_code: 1,
                health: None
            }
        );
        assert_eq!(err.to_string(), "flyway exited with code 1");
    }

    #[test]
    fn failure_surfaces_health_status() {
        let err = MigrationError::check(&state("exited", 137, Some("unhealthy"))).unwrap_err();
        assert_eq!(
            err.to_string(),
            "flyway exited with code 137 (health: unhealthy)"
        );
    }

    #[test]
    fn running_container_is_not_finished() {
        let err = MigrationError::check(&state("running", 0, None)).unwrap_err();
        assert!(matches!(err, MigrationError::NotFinished { .. }));
    }

    #[test]
    fn messages_name_the_corrective_option() {
        assert!(ConfigError::MissingDatabaseUrl.to_string().contains("with_database_url"));
        assert!(ConfigError::MissingUser.to_string().contains("with_user"));
        assert!(ConfigError::MissingPassword.to_string().contains("with_password"));
        assert!(ConfigError::EmptyLocations.to_string().contains("with_migrations"));
    }
}
