//! Flyway migration containers: request building, validation and run results.

mod constants;
mod container;
mod errors;
mod migrations;
mod options;
mod request;

pub use constants::{
    DEFAULT_CONNECT_RETRIES, DEFAULT_MIGRATIONS_PATH, DEFAULT_TABLE, DEFAULT_TIMEOUT,
    DEFAULT_VERSION, IMAGE_NAME,
};
pub use container::{FlywayContainer, run};
pub use errors::{ConfigError, MigrationError};
pub use migrations::discover_migrations;
pub use options::FlywayOption;
pub use request::{Flyway, build, default_wait_condition, resolve_image, validate};
