//! Per-layer output contracts.
//!
//! A contract names the keys a layer publishes. Required keys must be present
//! and non-empty; optional keys may be absent. Anything else a remote stack
//! happens to expose is dropped at the boundary so dependents can only rely
//! on declared keys.

use std::collections::BTreeMap;

use strata_common::LayerOutput;

use crate::domain::error::LayerError;

/// The stable key set a layer publishes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OutputContract {
    pub required: &'static [&'static str],
    pub optional: &'static [&'static str],
}

impl OutputContract {
    /// A contract that accepts nothing. Used by layers that publish no outputs.
    pub const EMPTY: Self = Self {
        required: &[],
        optional: &[],
    };

    #[must_use]
    pub fn declares(&self, key: &str) -> bool {
        self.required.contains(&key) || self.optional.contains(&key)
    }

    /// Keep only declared keys, dropping empty values.
    #[must_use]
    pub fn project(&self, raw: &BTreeMap<String, String>) -> BTreeMap<String, String> {
        raw.iter()
            .filter(|(k, v)| self.declares(k) && !v.trim().is_empty())
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }

    /// First required key missing from `outputs`, if any.
    #[must_use]
    pub fn first_missing(&self, outputs: &BTreeMap<String, String>) -> Option<&'static str> {
        self.required
            .iter()
            .copied()
            .find(|k| outputs.get(*k).is_none_or(|v| v.trim().is_empty()))
    }

    /// Check a published output against the contract.
    ///
    /// # Errors
    ///
    /// Returns [`LayerError::MissingField`] naming the first absent required key.
    pub fn validate(&self, output: &LayerOutput) -> Result<(), LayerError> {
        match self.first_missing(&output.outputs) {
            Some(field) => Err(LayerError::MissingField {
                layer: output.layer.clone(),
                field: field.to_string(),
            }),
            None => Ok(()),
        }
    }

    /// Project `raw` and build a validated [`LayerOutput`].
    ///
    /// # Errors
    ///
    /// Returns [`LayerError::MissingField`] if a required key is absent.
    pub fn publish(
        &self,
        layer: &str,
        raw: &BTreeMap<String, String>,
    ) -> Result<LayerOutput, LayerError> {
        let output = LayerOutput::new(layer, self.project(raw));
        self.validate(&output)?;
        Ok(output)
    }
}
