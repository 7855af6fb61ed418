//! Remote output reader: stack outputs with bounded retry, and
//! `wait_for_status` polling.
//!
//! Imports only from `crate::domain` and `crate::application::ports`.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Result, anyhow};
use tokio::time::Instant;

use crate::application::ports::{StackApi, StackDescription};
use crate::domain::{StackStatus, Timing, WaitOutcome};

/// Fixed-backoff retry with an attempt ceiling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub attempts: u32,
    pub backoff: Duration,
}

impl RetryPolicy {
    #[must_use]
    pub fn output_reads(timing: &Timing) -> Self {
        Self {
            attempts: timing.output_read_attempts,
            backoff: timing.output_read_backoff(),
        }
    }
}

/// Fixed-interval polling with a hard deadline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollPolicy {
    pub timeout: Duration,
    pub interval: Duration,
}

impl PollPolicy {
    #[must_use]
    pub fn stack_waits(timing: &Timing) -> Self {
        Self {
            timeout: timing.stack_wait_timeout(),
            interval: timing.stack_poll_interval(),
        }
    }
}

/// Reads remote stack state on top of a single-shot [`StackApi`].
#[derive(Clone)]
pub struct StackReader {
    api: Arc<dyn StackApi>,
    retry: RetryPolicy,
}

impl StackReader {
    #[must_use]
    pub fn new(api: Arc<dyn StackApi>, retry: RetryPolicy) -> Self {
        Self { api, retry }
    }

    /// The underlying provider API, for submit-style operations.
    #[must_use]
    pub fn api(&self) -> &Arc<dyn StackApi> {
        &self.api
    }

    /// One read of status and outputs.
    ///
    /// # Errors
    ///
    /// Returns an error if the provider cannot be queried.
    pub async fn describe(&self, stack: &str) -> Result<StackDescription> {
        self.api.describe(stack).await
    }

    /// One read of the stack status.
    ///
    /// # Errors
    ///
    /// Returns an error if the provider cannot be queried.
    pub async fn status(&self, stack: &str) -> Result<StackStatus> {
        Ok(self.api.describe(stack).await?.status)
    }

    /// Read a stack's outputs, retrying with fixed backoff while the stack is
    /// missing, unreadable, or has not materialized any outputs yet.
    ///
    /// An existing stack that still has no outputs after the last attempt
    /// yields an empty map.
    ///
    /// # Errors
    ///
    /// Returns the last error once every attempt failed to read the stack.
    pub async fn read_outputs(&self, stack: &str) -> Result<BTreeMap<String, String>> {
        let attempts = self.retry.attempts.max(1);
        let mut last: Result<BTreeMap<String, String>> =
            Err(anyhow!("stack {stack} was not read"));
        for attempt in 1..=attempts {
            if attempt > 1 {
                tokio::time::sleep(self.retry.backoff).await;
            }
            match self.api.describe(stack).await {
                Ok(d) if d.status == StackStatus::NotFound => {
                    last = Err(anyhow!("stack {stack} does not exist"));
                }
                Ok(d) if d.outputs.is_empty() => last = Ok(d.outputs),
                Ok(d) => return Ok(d.outputs),
                Err(e) => {
                    tracing::debug!(stack, attempt, error = %e, "stack output read failed");
                    last = Err(e);
                }
            }
        }
        if let Err(e) = &last {
            tracing::warn!(stack, attempts, error = %e, "giving up reading stack outputs");
        }
        last
    }

    /// Poll until the stack reaches one of `targets`.
    ///
    /// Returns `Reached` when a target status is observed strictly before the
    /// deadline, `Terminal` when a different settled status is observed, and
    /// `Timeout` otherwise. No poll is issued once the deadline has passed.
    /// Read errors count as "unknown" and polling continues.
    pub async fn wait_for_status(
        &self,
        stack: &str,
        targets: &[StackStatus],
        policy: PollPolicy,
    ) -> WaitOutcome {
        let started = Instant::now();
        loop {
            match self.api.describe(stack).await {
                Ok(d) if targets.contains(&d.status) => return WaitOutcome::Reached(d.status),
                Ok(d) if d.status.is_terminal() => {
                    tracing::debug!(stack, status = %d.status, "stack settled outside target");
                    return WaitOutcome::Terminal(d.status);
                }
                Ok(d) => tracing::debug!(stack, status = %d.status, "stack still changing"),
                Err(e) => tracing::debug!(stack, error = %e, "stack status unknown"),
            }
            let remaining = policy.timeout.saturating_sub(started.elapsed());
            tokio::time::sleep(policy.interval.min(remaining)).await;
            if started.elapsed() >= policy.timeout {
                tracing::warn!(stack, timeout_secs = policy.timeout.as_secs(), "stopped waiting for stack");
                return WaitOutcome::Timeout;
            }
        }
    }
}
