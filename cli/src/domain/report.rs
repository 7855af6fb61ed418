//! Run summaries produced by the orchestrator.

use serde::Serialize;

use crate::domain::lifecycle::{DeployOutcome, LayerStatus};

/// How a layer's outputs were obtained this run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Capture {
    Skipped,
    Deployed,
}

/// One line of the run summary.
#[derive(Debug, Clone, Serialize)]
pub struct LayerReport {
    pub layer: String,
    pub status: LayerStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub capture: Option<Capture>,
    /// Verify reason on success paths; diagnostic text on failure paths.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deploy: Option<DeployOutcome>,
}

impl LayerReport {
    #[must_use]
    pub fn pending(layer: impl Into<String>) -> Self {
        Self {
            layer: layer.into(),
            status: LayerStatus::Pending,
            capture: None,
            detail: None,
            deploy: None,
        }
    }
}

/// Summary of a deploy run.
#[derive(Debug, Clone, Default, Serialize)]
pub struct RunReport {
    pub layers: Vec<LayerReport>,
    /// Set when a failure stopped the run with layers still pending.
    pub aborted: bool,
}

impl RunReport {
    /// A run succeeds only with zero failed, timed-out or dependency-failed
    /// layers, and was not aborted.
    #[must_use]
    pub fn success(&self) -> bool {
        !self.aborted && !self.layers.iter().any(|l| l.status.is_failure())
    }

    #[must_use]
    pub fn get(&self, layer: &str) -> Option<&LayerReport> {
        self.layers.iter().find(|l| l.layer == layer)
    }

    #[must_use]
    pub fn status_of(&self, layer: &str) -> Option<LayerStatus> {
        self.get(layer).map(|l| l.status)
    }

    /// Layers that need attention, with their diagnostics.
    pub fn failures(&self) -> impl Iterator<Item = &LayerReport> {
        self.layers.iter().filter(|l| l.status.is_failure())
    }
}

/// Result of destroying one layer.
#[derive(Debug, Clone, Serialize)]
pub struct DestroyEntry {
    pub layer: String,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Summary of a destroy run.
#[derive(Debug, Clone, Default, Serialize)]
pub struct DestroyReport {
    pub layers: Vec<DestroyEntry>,
}

impl DestroyReport {
    #[must_use]
    pub fn success(&self) -> bool {
        self.layers.iter().all(|l| l.success)
    }
}
