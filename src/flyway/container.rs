use anyhow::{Context, Result};
use tracing::{info, warn};

use super::errors::MigrationError;
use super::migrations::discover_migrations;
use super::options::FlywayOption;
use super::request::{build, migration_mounts};
use crate::docker::{CancelToken, Container, ContainerSpec, ContainerState, Docker};
use crate::wait::WaitError;

/// A finished (or finishing) Flyway run.
#[derive(Debug)]
pub struct FlywayContainer {
    container: Container,
}

impl FlywayContainer {
    pub fn container(&self) -> &Container {
        &self.container
    }

    pub fn state(&self) -> Result<ContainerState> {
        self.container.state()
    }

    pub fn exit_code(&self) -> Result<i32> {
        Ok(self.state()?.exit_code)
    }

    pub fn is_running(&self) -> Result<bool> {
        Ok(self.state()?.running)
    }

    /// Runtime-reported error text, if any.
    pub fn error(&self) -> Result<Option<String>> {
        let state = self.state()?;
        Ok(Some(state.error).filter(|e| !e.is_empty()))
    }

    pub fn logs(&self) -> Result<String> {
        self.container.logs()
    }

    /// Fails with a [`MigrationError`] unless Flyway exited with code 0.
    pub fn ensure_success(&self) -> Result<()> {
        let state = self.state()?;
        MigrationError::check(&state)?;
        Ok(())
    }

    pub fn terminate(self) -> Result<()> {
        self.container.terminate()
    }
}

/// Build, validate and launch a Flyway container, blocking until its
/// readiness condition holds.
///
/// Configuration problems are returned as [`ConfigError`](super::ConfigError)
/// before any runtime command is issued. A Flyway process that exits non-zero
/// before becoming ready is reported as [`MigrationError::Failed`], with its
/// last output lines attached as context.
pub fn run<I>(docker: &Docker, options: I, cancel: &CancelToken) -> Result<FlywayContainer>
where
    I: IntoIterator<Item = FlywayOption>,
{
    let spec = build(options)?;
    log_scripts(&spec);

    let container = docker
        .start(spec, cancel)
        .map_err(failed_migration)
        .context("flyway migration did not complete")?;
    Ok(FlywayContainer { container })
}

/// Rewrap a non-zero exit seen by the readiness detector as a
/// [`MigrationError`]. Other errors pass through untouched.
fn failed_migration(err: anyhow::Error) -> anyhow::Error {
    let Some(WaitError::Unsatisfiable {
        exit_code: Some(code),
        health,
        output,
        ..
    }) = err.downcast_ref::<WaitError>()
    else {
        return err;
    };
    if *code == 0 {
        return err;
    }

    let failed = MigrationError::Failed {
        exit_code: *code,
        health: health.clone(),
    };
    if output.is_empty() {
        return failed.into();
    }
    anyhow::Error::new(failed).context(format!("flyway output:\n{}", output.join("\n")))
}

fn log_scripts(spec: &ContainerSpec) {
    for mount in migration_mounts(spec) {
        match discover_migrations(&mount.host_path) {
            Ok(scripts) => info!(
                source = %mount.host_path.display(),
                scripts = scripts.len(),
                "launching flyway"
            ),
            Err(e) => warn!(source = %mount.host_path.display(), error = %e, "cannot list migrations"),
        }
    }
}
