//! Disposable Flyway migration containers for integration tests.
//!
//! [`Flyway`] assembles a container request from options, validates it, and
//! launches it through the `docker` CLI. The call blocks until Flyway has
//! exited and logged both its "validated" and "applied" summaries, after
//! which the run's exit state can be inspected.

pub mod config;
pub mod docker;
pub mod flyway;
pub mod wait;

pub use config::RuntimeConfig;
pub use docker::{CancelToken, ContainerSpec, Docker, FileMount, Network, NetworkAttachment};
pub use flyway::{
    ConfigError, Flyway, FlywayContainer, FlywayOption, MigrationError, resolve_image,
};
pub use wait::{WaitCondition, WaitError};
