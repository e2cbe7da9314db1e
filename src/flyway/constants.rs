use std::time::Duration;

pub const DEFAULT_VERSION: &str = "10.10.0";
pub const IMAGE_NAME: &str = "flyway/flyway";

/// Where Flyway looks for scripts inside the container by default.
pub const DEFAULT_MIGRATIONS_PATH: &str = "/flyway/sql";
pub const DEFAULT_TABLE: &str = "schema_version";
pub const DEFAULT_CONNECT_RETRIES: u32 = 3;
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

pub const LOCATION_PREFIX: &str = "filesystem:";
pub const COMMAND: [&str; 2] = ["migrate", "info"];

pub const ENV_USER: &str = "FLYWAY_USER";
pub const ENV_PASSWORD: &str = "FLYWAY_PASSWORD";
pub const ENV_URL: &str = "FLYWAY_URL";
pub const ENV_TABLE: &str = "FLYWAY_TABLE";
pub const ENV_CONNECT_RETRIES: &str = "FLYWAY_CONNECT_RETRIES";
pub const ENV_GROUP: &str = "FLYWAY_GROUP";
pub const ENV_LOCATIONS: &str = "FLYWAY_LOCATIONS";

pub const APPLIED_PATTERN: &str = r"Successfully applied \d+ migrations? to schema";
pub const VALIDATED_PATTERN: &str = r"Successfully validated \d+ migrations?";
