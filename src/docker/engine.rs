use std::process::{Command, Stdio};
use std::sync::LazyLock;

use anyhow::{Context, Result, bail};
use regex::Regex;
use tracing::debug;

use super::types::{ContainerState, ExecOutput};
use crate::config::RuntimeConfig;

/// Environment keys whose values are masked in logged command lines.
const SECRET_MARKERS: [&str; 3] = ["PASSWORD", "SECRET", "TOKEN"];

/// `password=` parameters embedded in connection URLs.
static URL_PASSWORD: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(password=)[^&;]*").expect("constant regex pattern is valid")
});

/// Verify that the Docker daemon is reachable.
pub fn ensure_available(config: &RuntimeConfig) -> Result<()> {
    let status = Command::new(&config.docker_binary)
        .args(["version", "--format", "{{.Server.Version}}"])
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .with_context(|| {
            format!(
                "failed to invoke `{}`: is it installed and on PATH?",
                config.docker_binary
            )
        })?;

    if !status.success() {
        bail!("docker daemon is not running (exit {})", status);
    }
    Ok(())
}

/// Handle on the container runtime. Cheap to clone.
#[derive(Debug, Clone, Default)]
pub struct Docker {
    config: RuntimeConfig,
}

impl Docker {
    pub fn new(config: RuntimeConfig) -> Self {
        Self { config }
    }

    /// Runtime configured from `.flywaytc.yaml` in the current directory, if any.
    pub fn discover() -> Result<Self> {
        let cwd = std::env::current_dir().context("failed to resolve current directory")?;
        Ok(Self::new(RuntimeConfig::discover(&cwd)?))
    }

    pub fn config(&self) -> &RuntimeConfig {
        &self.config
    }

    pub(crate) fn command(&self) -> Command {
        let mut cmd = Command::new(&self.config.docker_binary);
        cmd.stdin(Stdio::null());
        cmd
    }

    /// Run a docker subcommand to completion and return its trimmed stdout.
    pub(crate) fn output<I, S>(&self, args: I) -> Result<String>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let args: Vec<String> = args.into_iter().map(|a| a.as_ref().to_string()).collect();
        let subcommand = args.first().cloned().unwrap_or_default();
        debug!(command = %self.render(&args), "invoking container runtime");

        let output = self
            .command()
            .args(&args)
            .output()
            .with_context(|| format!("failed to invoke `{}`", self.config.docker_binary))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            bail!(
                "`{} {}` failed ({}): {}",
                self.config.docker_binary,
                subcommand,
                output.status,
                stderr.trim()
            );
        }
        Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    }

    pub(crate) fn inspect_state(&self, id: &str) -> Result<ContainerState> {
        let raw = self
            .output(["inspect", "--format", "{{json .State}}", id])
            .with_context(|| format!("failed to inspect container {}", short_id(id)))?;
        serde_json::from_str(&raw).context("failed to parse container state")
    }

    /// Combined stdout and stderr of a container, stdout first.
    pub(crate) fn logs(&self, id: &str) -> Result<String> {
        let output = self
            .command()
            .args(["logs", id])
            .output()
            .with_context(|| format!("failed to invoke `{}`", self.config.docker_binary))?;
        if !output.status.success() {
            bail!(
                "failed to read logs of {}: {}",
                short_id(id),
                String::from_utf8_lossy(&output.stderr).trim()
            );
        }
        let mut log = String::from_utf8_lossy(&output.stdout).into_owned();
        log.push_str(&String::from_utf8_lossy(&output.stderr));
        Ok(log)
    }

    /// Run `args` inside a live container. A non-zero exit is not an error.
    pub(crate) fn exec(&self, id: &str, args: &[&str]) -> Result<ExecOutput> {
        let mut full = vec!["exec".to_string(), id.to_string()];
        full.extend(args.iter().map(|a| a.to_string()));
        debug!(command = %self.render(&full), "invoking container runtime");

        let output = self
            .command()
            .args(&full)
            .output()
            .with_context(|| format!("failed to invoke `{}`", self.config.docker_binary))?;
        Ok(ExecOutput {
            exit_code: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }

    /// `docker stop`, giving the process `stop_timeout_secs` to shut down.
    pub(crate) fn stop_container(&self, id: &str) -> Result<()> {
        let grace = self.config.stop_timeout_secs.to_string();
        self.output(["stop", "--time", grace.as_str(), id])
            .with_context(|| format!("failed to stop container {}", short_id(id)))?;
        Ok(())
    }

    pub(crate) fn remove_container(&self, id: &str) -> Result<()> {
        self.output(["rm", "--force", "--volumes", id])
            .with_context(|| format!("failed to remove container {}", short_id(id)))?;
        Ok(())
    }

    fn render(&self, args: &[String]) -> String {
        let mut words = vec![self.config.docker_binary.clone()];
        words.extend(redact(args));
        shell_words::join(words)
    }
}

/// Mask the values of secret-looking `-e KEY=VALUE` arguments, and any
/// `password=` parameter inside other `-e` values.
fn redact(args: &[String]) -> Vec<String> {
    let mut out = Vec::with_capacity(args.len());
    let mut after_env_flag = false;
    for arg in args {
        match arg.split_once('=') {
            Some((key, _)) if after_env_flag && is_secret(key) => {
                out.push(format!("{key}=***"));
            }
            Some((key, value)) if after_env_flag => {
                let value = URL_PASSWORD.replace_all(value, "${1}***");
                out.push(format!("{key}={value}"));
            }
            _ => out.push(arg.clone()),
        }
        after_env_flag = arg == "-e";
    }
    out
}

fn is_secret(key: &str) -> bool {
    let key = key.to_ascii_uppercase();
    SECRET_MARKERS.iter().any(|m| key.contains(m))
}

/// First twelve characters of a container id, as `docker ps` shows them.
pub(crate) fn short_id(id: &str) -> &str {
    id.get(..12).unwrap_or(id)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ensure_available_does_not_panic() {
        // We only assert it doesn't panic; CI may or may not have Docker.
        let _ = ensure_available(&RuntimeConfig::default());
    }

    #[test]
    fn ensure_available_reports_missing_binary() {
        let cfg = RuntimeConfig {
            docker_binary: "/nonexistent/docker-binary".into(),
            ..RuntimeConfig::default()
        };
        let err = ensure_available(&cfg).unwrap_err();
        assert!(err.to_string().contains("/nonexistent/docker-binary"));
    }

    #[test]
    fn output_fails_with_context_for_missing_binary() {
        let docker = Docker::new(RuntimeConfig {
            docker_binary: "/nonexistent/docker-binary".into(),
            ..RuntimeConfig::default()
        });
        assert!(docker.output(["ps"]).is_err());
    }

    #[test]
    fn redact_masks_secret_env_values() {
        let args: Vec<String> = [
            "create",
            "-e",
            "FLYWAY_PASSWORD=hunter2",
            "-e",
            "FLYWAY_USER=postgres",
            "FLYWAY_PASSWORD=positional",
        ]
        .iter()
        .map(|s| s.to_string())
        .collect();
        let redacted = redact(&args);
        assert_eq!(redacted[2], "FLYWAY_PASSWORD=***");
        assert_eq!(redacted[4], "FLYWAY_USER=postgres");
        // Only values that follow `-e` are masked.
        assert_eq!(redacted[5], "FLYWAY_PASSWORD=positional");
    }

    #[test]
    fn redact_masks_passwords_inside_urls() {
        let args: Vec<String> = [
            "-e",
            "FLYWAY_URL=jdbc:postgresql://pgdb:5432/db?user=app&Password=hunter2&ssl=true",
            "-e",
            "FLYWAY_URL=jdbc:sqlserver://db:1433;password=s3cret;encrypt=false",
            "-e",
            "FLYWAY_URL=jdbc:postgresql://pgdb:5432/db?sslmode=disable",
        ]
        .iter()
        .map(|s| s.to_string())
        .collect();
        let redacted = redact(&args);
        assert_eq!(
            redacted[1],
            "FLYWAY_URL=jdbc:postgresql://pgdb:5432/db?user=app&Password=***&ssl=true"
        );
        assert_eq!(
            redacted[3],
            "FLYWAY_URL=jdbc:sqlserver://db:1433;password=***;encrypt=false"
        );
        assert_eq!(redacted[5], args[5]);
        assert!(!redacted.join(" ").contains("hunter2"));
    }

    #[test]
    fn short_id_truncates() {
        assert_eq!(short_id("0123456789abcdef"), "0123456789ab");
        assert_eq!(short_id("abc"), "abc");
    }
}
