//! Per-layer, per-run lifecycle states and the outcomes lifecycle calls
//! return.
//!
//! ```text
//! Pending → Verifying → Skipped   → OutputsCaptured
//!                     → Deploying → Deployed → OutputsCaptured
//!                                 → Failed | TimedOut
//! Pending → SkippedDisabled | DependencyFailed
//! ```

use std::fmt;
use std::time::Duration;

use serde::Serialize;
use strata_common::LayerOutput;

use crate::domain::error::LayerError;

/// Where a layer is within the current run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LayerStatus {
    Pending,
    Verifying,
    Skipped,
    Deploying,
    Deployed,
    OutputsCaptured,
    Failed,
    TimedOut,
    SkippedDisabled,
    DependencyFailed,
}

impl LayerStatus {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Verifying => "verifying",
            Self::Skipped => "skipped",
            Self::Deploying => "deploying",
            Self::Deployed => "deployed",
            Self::OutputsCaptured => "outputs_captured",
            Self::Failed => "failed",
            Self::TimedOut => "timed_out",
            Self::SkippedDisabled => "skipped_disabled",
            Self::DependencyFailed => "dependency_failed",
        }
    }

    fn allowed_transitions(self) -> &'static [LayerStatus] {
        match self {
            Self::Pending => &[Self::Verifying, Self::SkippedDisabled, Self::DependencyFailed],
            Self::Verifying => &[Self::Skipped, Self::Deploying],
            Self::Skipped => &[Self::OutputsCaptured],
            Self::Deploying => &[Self::Deployed, Self::Failed, Self::TimedOut],
            // Output capture can still fail after a successful deploy.
            Self::Deployed => &[Self::OutputsCaptured, Self::Failed],
            Self::OutputsCaptured
            | Self::Failed
            | Self::TimedOut
            | Self::SkippedDisabled
            | Self::DependencyFailed => &[],
        }
    }

    #[must_use]
    pub fn can_transition(self, to: LayerStatus) -> bool {
        self.allowed_transitions().contains(&to)
    }

    /// `true` once no further transition is possible.
    #[must_use]
    pub fn is_terminal(self) -> bool {
        self.allowed_transitions().is_empty()
    }

    /// States that make the whole run unsuccessful.
    #[must_use]
    pub fn is_failure(self) -> bool {
        matches!(self, Self::Failed | Self::TimedOut | Self::DependencyFailed)
    }
}

impl fmt::Display for LayerStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

/// Tracks one layer's state and rejects illegal moves.
#[derive(Debug, Clone)]
pub struct LayerProgress {
    layer: String,
    status: LayerStatus,
}

impl LayerProgress {
    #[must_use]
    pub fn new(layer: impl Into<String>) -> Self {
        Self {
            layer: layer.into(),
            status: LayerStatus::Pending,
        }
    }

    #[must_use]
    pub fn status(&self) -> LayerStatus {
        self.status
    }

    /// Move to `to`.
    ///
    /// # Errors
    ///
    /// Returns [`LayerError::InvalidTransition`] if the move is not allowed
    /// from the current state.
    pub fn advance(&mut self, to: LayerStatus) -> Result<(), LayerError> {
        if !self.status.can_transition(to) {
            return Err(LayerError::InvalidTransition {
                layer: self.layer.clone(),
                from: self.status.to_string(),
                to: to.to_string(),
            });
        }
        self.status = to;
        Ok(())
    }
}

/// Result of `verify()`.
///
/// Skipping without an output is unrepresentable.
#[derive(Debug, Clone)]
pub enum VerifyOutcome {
    /// Existing remote state is healthy; reuse it.
    Skip { reason: String, output: LayerOutput },
    /// Deploy is required (or state could not be confirmed).
    Deploy { reason: String },
}

impl VerifyOutcome {
    pub fn deploy(reason: impl Into<String>) -> Self {
        Self::Deploy {
            reason: reason.into(),
        }
    }

    pub fn skip(reason: impl Into<String>, output: LayerOutput) -> Self {
        Self::Skip {
            reason: reason.into(),
            output,
        }
    }

    #[must_use]
    pub fn is_skip(&self) -> bool {
        matches!(self, Self::Skip { .. })
    }

    #[must_use]
    pub fn reason(&self) -> &str {
        match self {
            Self::Skip { reason, .. } | Self::Deploy { reason } => reason,
        }
    }
}

/// Result of a `deploy()` call as seen by the driver.
#[derive(Debug, Clone, Serialize)]
pub struct DeployOutcome {
    pub success: bool,
    /// Set when the local wait expired; the remote side's state is unknown.
    pub timed_out: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(serialize_with = "serialize_secs")]
    pub duration: Duration,
}

impl DeployOutcome {
    /// Build an outcome from a lifecycle result.
    #[must_use]
    pub fn from_result(result: &Result<(), LayerError>, duration: Duration) -> Self {
        match result {
            Ok(()) => Self {
                success: true,
                timed_out: false,
                error: None,
                duration,
            },
            Err(e) => Self {
                success: false,
                timed_out: e.is_timeout(),
                error: Some(format!("{e:#}")),
                duration,
            },
        }
    }
}

#[allow(clippy::trivially_copy_pass_by_ref)] // serde's serialize_with signature
fn serialize_secs<S: serde::Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_f64(d.as_secs_f64())
}
