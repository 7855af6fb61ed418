//! Remote command poller: submit once, then poll at a fixed interval up to an
//! attempt ceiling.
//!
//! Imports only from `crate::domain` and `crate::application::ports`.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};

use crate::application::ports::{RemoteCommandApi, RemoteScript};
use crate::domain::{PollOutcome, RemoteCommandStatus, Timing};

/// Drives an asynchronous remote command to a terminal classification.
#[derive(Clone)]
pub struct CommandPoller {
    api: Arc<dyn RemoteCommandApi>,
    interval: Duration,
    max_attempts: u32,
}

impl CommandPoller {
    #[must_use]
    pub fn new(api: Arc<dyn RemoteCommandApi>, interval: Duration, max_attempts: u32) -> Self {
        Self {
            api,
            interval,
            max_attempts: max_attempts.max(1),
        }
    }

    #[must_use]
    pub fn from_timing(api: Arc<dyn RemoteCommandApi>, timing: &Timing) -> Self {
        Self::new(
            api,
            timing.remote_command_interval(),
            timing.remote_command_max_attempts,
        )
    }

    /// Upper bound on time spent polling one command.
    #[must_use]
    pub fn ceiling(&self) -> Duration {
        self.interval
            .checked_mul(self.max_attempts)
            .unwrap_or(Duration::MAX)
    }

    /// Submit `script` and poll it to completion.
    ///
    /// # Errors
    ///
    /// Returns an error only if submission itself fails. Every outcome after
    /// submission, including running out of attempts, is a [`PollOutcome`].
    pub async fn run(&self, script: &RemoteScript) -> Result<PollOutcome> {
        let command_id = self
            .api
            .submit(script)
            .await
            .with_context(|| format!("submitting remote command to {}", script.instance_id))?;
        tracing::info!(command_id, instance = %script.instance_id, comment = %script.comment, "remote command submitted");
        Ok(self.poll(&command_id, &script.instance_id).await)
    }

    /// Poll an already-submitted command.
    ///
    /// Sleeps one interval before every poll, so a command is never queried
    /// before it had a chance to register and total time stays within
    /// `interval × max_attempts`.
    pub async fn poll(&self, command_id: &str, instance_id: &str) -> PollOutcome {
        for attempt in 1..=self.max_attempts {
            tokio::time::sleep(self.interval).await;
            let status = match self.api.status(command_id, instance_id).await {
                Ok(status) => status,
                Err(e) => {
                    tracing::debug!(command_id, attempt, error = %e, "remote command status unavailable");
                    continue;
                }
            };
            tracing::debug!(command_id, attempt, ?status, "remote command polled");
            if !status.is_terminal() {
                continue;
            }
            return match status {
                RemoteCommandStatus::Success => PollOutcome::Success {
                    stdout: self.stdout(command_id, instance_id).await,
                    polls: attempt,
                },
                RemoteCommandStatus::Cancelled => PollOutcome::Cancelled {
                    reason: self.diagnostics(command_id, instance_id, "cancelled").await,
                    polls: attempt,
                },
                RemoteCommandStatus::TimedOut => PollOutcome::TimedOut {
                    reason: self.diagnostics(command_id, instance_id, "timed out remotely").await,
                    polls: attempt,
                },
                _ => PollOutcome::Failed {
                    reason: self.diagnostics(command_id, instance_id, "failed").await,
                    polls: attempt,
                },
            };
        }
        tracing::warn!(command_id, attempts = self.max_attempts, "remote command did not settle");
        PollOutcome::TimedOut {
            reason: format!(
                "no terminal status after {} polls ({}s)",
                self.max_attempts,
                self.ceiling().as_secs()
            ),
            polls: self.max_attempts,
        }
    }

    async fn stdout(&self, command_id: &str, instance_id: &str) -> String {
        match self.api.output(command_id, instance_id).await {
            Ok(out) => out.stdout,
            Err(e) => {
                tracing::warn!(command_id, error = %e, "could not fetch remote command output");
                String::new()
            }
        }
    }

    /// Failure reason from the command's own output, falling back to `fallback`.
    async fn diagnostics(&self, command_id: &str, instance_id: &str, fallback: &str) -> String {
        match self.api.output(command_id, instance_id).await {
            Ok(out) if !out.stderr.trim().is_empty() => out.stderr.trim().to_string(),
            Ok(out) if !out.stdout.trim().is_empty() => out.stdout.trim().to_string(),
            Ok(_) => format!("remote command {fallback}"),
            Err(e) => format!("remote command {fallback} (output unavailable: {e})"),
        }
    }
}
