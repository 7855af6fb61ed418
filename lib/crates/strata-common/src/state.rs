use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Format version written into every state document.
pub const STATE_FORMAT_VERSION: u32 = 1;

/// Outputs a layer publishes for its dependents.
///
/// Owned by the layer that produced it. Other layers only read it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LayerOutput {
    pub layer: String,
    pub deployed: bool,
    #[serde(default)]
    pub outputs: BTreeMap<String, String>,
    pub timestamp: DateTime<Utc>,
}

impl LayerOutput {
    #[must_use]
    pub fn new(layer: impl Into<String>, outputs: BTreeMap<String, String>) -> Self {
        Self {
            layer: layer.into(),
            deployed: true,
            outputs,
            timestamp: Utc::now(),
        }
    }

    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.outputs.get(key).map(String::as_str)
    }
}

/// Durable record of each layer's most recent outputs.
///
/// Accumulates across a run; entries from earlier runs stay until the same
/// layer records a newer output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeploymentState {
    #[serde(default = "default_version")]
    pub version: u32,
    /// Bumped on every recorded output.
    #[serde(default)]
    pub revision: u64,
    pub updated_at: DateTime<Utc>,
    #[serde(default)]
    pub layers: BTreeMap<String, LayerOutput>,
}

fn default_version() -> u32 {
    STATE_FORMAT_VERSION
}

impl Default for DeploymentState {
    fn default() -> Self {
        Self {
            version: STATE_FORMAT_VERSION,
            revision: 0,
            updated_at: Utc::now(),
            layers: BTreeMap::new(),
        }
    }
}

impl DeploymentState {
    #[must_use]
    pub fn get(&self, layer: &str) -> Option<&LayerOutput> {
        self.layers.get(layer)
    }

    /// Insert or replace the entry for `output.layer`.
    pub fn record(&mut self, output: LayerOutput) {
        self.layers.insert(output.layer.clone(), output);
        self.revision += 1;
        self.updated_at = Utc::now();
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }
}
