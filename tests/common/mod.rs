//! Shared helpers for the Docker-backed integration tests.
#![allow(dead_code)]

use std::path::PathBuf;
use std::time::Duration;

use flyway_testcontainer::docker::{Container, Network};
use flyway_testcontainer::{CancelToken, ContainerSpec, Docker, WaitCondition};

pub const POSTGRES_IMAGE: &str = "postgres:16.3";
pub const POSTGRES_DB: &str = "test_db";
pub const POSTGRES_USER: &str = "postgres";
pub const POSTGRES_PASSWORD: &str = "postgres";

pub const MYSQL_IMAGE: &str = "mysql:8.0.36";
pub const MYSQL_DB: &str = "mysqldb";
pub const MYSQL_USER: &str = "mysql-user";
pub const MYSQL_PASSWORD: &str = "password";

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

pub fn docker() -> Docker {
    init_tracing();
    Docker::discover().expect("failed to load runtime config")
}

pub fn testdata(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests/testdata")
        .join(name)
}

/// Start Postgres on `network`, reachable from other containers as `alias`.
pub fn start_postgres(docker: &Docker, network: &Network, alias: &str) -> Container {
    // The entrypoint restarts the server once after initdb.
    let ready = WaitCondition::for_log_occurrences(
        "database system is ready to accept connections",
        2,
    )
    .unwrap();

    let spec = ContainerSpec::new(POSTGRES_IMAGE)
        .with_env("POSTGRES_DB", POSTGRES_DB)
        .with_env("POSTGRES_USER", POSTGRES_USER)
        .with_env("POSTGRES_PASSWORD", POSTGRES_PASSWORD)
        .with_network(network.attachment([alias]))
        .with_wait_for(ready)
        .with_timeout(Duration::from_secs(60));

    docker
        .start(spec, &CancelToken::new())
        .expect("failed to start postgres")
}

pub fn postgres_url(alias: &str) -> String {
    format!("jdbc:postgresql://{alias}:5432/{POSTGRES_DB}?sslmode=disable")
}

/// Run `sql` through `psql` inside the container and return the bare output.
pub fn psql(container: &Container, sql: &str) -> String {
    let out = container
        .exec(&["psql", "-U", POSTGRES_USER, "-d", POSTGRES_DB, "-tAc", sql])
        .expect("failed to exec psql");
    assert!(out.success(), "psql failed: {}", out.stderr);
    out.stdout.trim().to_string()
}

/// Start MySQL on `network`, reachable from other containers as `alias`.
pub fn start_mysql(docker: &Docker, network: &Network, alias: &str) -> Container {
    // The temporary init server listens on port 0; wait for the real one.
    let ready = WaitCondition::for_log(r"ready for connections.*port: 3306").unwrap();

    let spec = ContainerSpec::new(MYSQL_IMAGE)
        .with_env("MYSQL_DATABASE", MYSQL_DB)
        .with_env("MYSQL_USER", MYSQL_USER)
        .with_env("MYSQL_PASSWORD", MYSQL_PASSWORD)
        .with_env("MYSQL_ROOT_PASSWORD", "root")
        .with_network(network.attachment([alias]))
        .with_wait_for(ready)
        .with_timeout(Duration::from_secs(120));

    docker
        .start(spec, &CancelToken::new())
        .expect("failed to start mysql")
}

pub fn mysql_url(alias: &str) -> String {
    format!("jdbc:mysql://{alias}:3306/{MYSQL_DB}?allowPublicKeyRetrieval=true&useSSL=false")
}

pub fn mysql(container: &Container, sql: &str) -> String {
    let password = format!("-p{MYSQL_PASSWORD}");
    let out = container
        .exec(&["mysql", "-u", MYSQL_USER, &password, "-D", MYSQL_DB, "-N", "-e", sql])
        .expect("failed to exec mysql");
    assert!(out.success(), "mysql failed: {}", out.stderr);
    out.stdout.trim().to_string()
}
