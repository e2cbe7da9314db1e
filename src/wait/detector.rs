use std::time::{Duration, Instant};

use anyhow::Result;
use tracing::{debug, info};

use super::condition::{Snapshot, WaitCondition};
use crate::docker::CancelToken;

/// Lines of output kept on [`WaitError::Unsatisfiable`].
pub(crate) const OUTPUT_TAIL: usize = 20;

/// Source of [`Snapshot`]s for the readiness detector.
pub trait Probe {
    fn observe(&mut self) -> Result<Snapshot>;
}

/// Why a container never became ready.
#[derive(Debug, thiserror::Error)]
pub enum WaitError {
    #[error("timed out after {timeout:?} waiting for {pending}")]
    TimedOut { timeout: Duration, pending: String },

    #[error("wait cancelled")]
    Cancelled,

    /// The process exited and its final output can never satisfy the condition.
    /// `output` holds the last lines it wrote.
    #[error(
        "process exited{}{} before {pending} was observed",
        exit_suffix(.exit_code),
        health_suffix(.health)
    )]
    Unsatisfiable {
        exit_code: Option<i32>,
        health: Option<String>,
        pending: String,
        output: Vec<String>,
    },

    #[error("failed to observe container: {0:#}")]
    Probe(anyhow::Error),
}

fn exit_suffix(code: &Option<i32>) -> String {
    code.map(|c| format!(" with code {c}")).unwrap_or_default()
}

fn health_suffix(health: &Option<String>) -> String {
    health
        .as_deref()
        .map(|h| format!(" (health: {h})"))
        .unwrap_or_default()
}

/// Block until `condition` holds for a snapshot from `probe`.
///
/// Every leg of the condition is re-evaluated against each fresh snapshot.
/// Fails with [`WaitError::Unsatisfiable`] as soon as a final (exited)
/// snapshot still does not satisfy the condition, rather than waiting out
/// `timeout`.
pub fn wait_until<P: Probe + ?Sized>(
    condition: &WaitCondition,
    probe: &mut P,
    timeout: Duration,
    poll_interval: Duration,
    cancel: &CancelToken,
) -> Result<Snapshot, WaitError> {
    let start = Instant::now();
    let mut last_pending: Option<Vec<String>> = None;

    loop {
        if cancel.is_cancelled() {
            return Err(WaitError::Cancelled);
        }

        let snapshot = probe.observe().map_err(WaitError::Probe)?;
        let pending = condition.pending(&snapshot);

        if pending.is_empty() {
            info!(elapsed = ?start.elapsed(), "readiness condition satisfied");
            return Ok(snapshot);
        }

        if last_pending.as_ref() != Some(&pending) {
            debug!(pending = %pending.join(", "), lines = snapshot.lines.len(), "waiting");
            last_pending = Some(pending.clone());
        }

        if snapshot.exited {
            let tail = snapshot.lines.len().saturating_sub(OUTPUT_TAIL);
            return Err(WaitError::Unsatisfiable {
                exit_code: snapshot.exit_code,
                health: snapshot.health,
                pending: pending.join(", "),
                output: snapshot.lines[tail..].to_vec(),
            });
        }

        let elapsed = start.elapsed();
        if elapsed >= timeout {
            return Err(WaitError::TimedOut {
                timeout,
                pending: pending.join(", "),
            });
        }

        std::thread::sleep(poll_interval.min(timeout - elapsed));
    }
}
