//! Typed domain error enums.
//!
//! This module has zero imports from `crate::infra`, `crate::commands`,
//! `crate::application`, `tokio`, `std::fs`, `std::process`, or `std::net`.
//! All error types implement `thiserror::Error` and convert to `anyhow::Error`
//! via the `?` operator.

use std::time::Duration;

use thiserror::Error;

// ── Config errors ─────────────────────────────────────────────────────────────

/// Errors in the layer graph or run settings. Always fatal before any
/// deployment begins.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("cyclic dependency involving layer '{layer}'")]
    CyclicDependency { layer: String },

    #[error("layer '{layer}' depends on '{dependency}', which is not an enabled layer")]
    UnknownDependency { layer: String, dependency: String },

    #[error("layer '{0}' is declared more than once")]
    DuplicateLayer(String),

    #[error("layer '{layer}' has unknown kind '{kind}'. Valid kinds: {valid}")]
    UnknownKind {
        layer: String,
        kind: String,
        valid: String,
    },

    #[error("invalid configuration for layer '{layer}': {message}")]
    InvalidLayerConfig { layer: String, message: String },

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

// ── Layer errors ──────────────────────────────────────────────────────────────

/// Errors raised by a layer's lifecycle operations.
///
/// `RemoteOperationTimeout` is deliberately distinct from
/// `RemoteOperationFailed`: the remote side's final state is unknown.
#[derive(Debug, Error)]
pub enum LayerError {
    #[error("layer '{layer}' requires outputs from '{dependency}', which are not available")]
    MissingDependencyOutput { layer: String, dependency: String },

    #[error("output '{field}' of layer '{layer}' is missing")]
    MissingField { layer: String, field: String },

    #[error("{operation} failed: {detail}")]
    RemoteOperationFailed { operation: String, detail: String },

    #[error("{operation} did not finish within {}s; remote state unknown", waited.as_secs())]
    RemoteOperationTimeout { operation: String, waited: Duration },

    #[error("destroy of layer '{layer}' incomplete:\n  - {}", failures.join("\n  - "))]
    PartialDestroyFailure { layer: String, failures: Vec<String> },

    #[error("layer '{layer}' cannot move from {from} to {to}")]
    InvalidTransition {
        layer: String,
        from: String,
        to: String,
    },

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl LayerError {
    /// Shorthand for a failed remote operation.
    pub fn failed(operation: impl Into<String>, detail: impl Into<String>) -> Self {
        Self::RemoteOperationFailed {
            operation: operation.into(),
            detail: detail.into(),
        }
    }

    /// Shorthand for a remote operation that outlived its local wait.
    pub fn timeout(operation: impl Into<String>, waited: Duration) -> Self {
        Self::RemoteOperationTimeout {
            operation: operation.into(),
            waited,
        }
    }

    /// `true` when the error means "stopped waiting", not "failed".
    #[must_use]
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::RemoteOperationTimeout { .. })
    }
}
