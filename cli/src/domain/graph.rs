//! Dependency resolution over the layer graph.
//!
//! Pure functions only. Disabled layers are removed before ordering, so a
//! dependency on a disabled layer is reported as unknown rather than treated
//! as satisfied.

use std::collections::{HashMap, HashSet};

use strata_common::{LayerGraph, LayerSpec};

use crate::domain::error::ConfigError;

/// The result of resolving a layer graph.
#[derive(Debug, Clone)]
pub struct ResolvedPlan {
    /// Enabled layers, each after everything it depends on.
    pub order: Vec<LayerSpec>,
    /// Disabled layers in declaration order.
    pub disabled: Vec<LayerSpec>,
}

impl ResolvedPlan {
    /// Names in deployment order.
    #[must_use]
    pub fn names(&self) -> Vec<&str> {
        self.order.iter().map(|l| l.name.as_str()).collect()
    }
}

/// Resolve a full graph: drop disabled layers, then order the rest.
///
/// # Errors
///
/// Returns a [`ConfigError`] for duplicate names, unknown (or disabled)
/// dependencies, and cycles.
pub fn resolve(graph: &LayerGraph) -> Result<ResolvedPlan, ConfigError> {
    let (enabled, disabled): (Vec<_>, Vec<_>) = graph.iter().cloned().partition(|l| l.enabled);
    let order = order_layers(&enabled)?;
    Ok(ResolvedPlan { order, disabled })
}

/// Topologically order a set of layers.
///
/// Every layer in the result appears after all layers it depends on. When two
/// layers are unconstrained relative to each other, the one declared first
/// comes first.
///
/// # Errors
///
/// Returns a [`ConfigError`] for duplicate names, dependencies outside the
/// input set, and cycles.
pub fn order_layers(layers: &[LayerSpec]) -> Result<Vec<LayerSpec>, ConfigError> {
    let mut index: HashMap<&str, usize> = HashMap::with_capacity(layers.len());
    for (i, layer) in layers.iter().enumerate() {
        if index.insert(layer.name.as_str(), i).is_some() {
            return Err(ConfigError::DuplicateLayer(layer.name.clone()));
        }
    }
    for layer in layers {
        if let Some(dep) = layer.depends_on.iter().find(|d| !index.contains_key(d.as_str())) {
            return Err(ConfigError::UnknownDependency {
                layer: layer.name.clone(),
                dependency: dep.clone(),
            });
        }
    }

    let mut placed: HashSet<&str> = HashSet::with_capacity(layers.len());
    let mut order = Vec::with_capacity(layers.len());
    while order.len() < layers.len() {
        let next = layers.iter().find(|l| {
            !placed.contains(l.name.as_str())
                && l.depends_on.iter().all(|d| placed.contains(d.as_str()))
        });
        match next {
            Some(layer) => {
                placed.insert(layer.name.as_str());
                order.push(layer.clone());
            }
            None => {
                return Err(ConfigError::CyclicDependency {
                    layer: find_cycle_member(layers, &index, &placed),
                });
            }
        }
    }
    Ok(order)
}

/// Walk unplaced dependency edges until a layer repeats; that layer lies on
/// a cycle. Only called when every unplaced layer has an unplaced dependency.
fn find_cycle_member(
    layers: &[LayerSpec],
    index: &HashMap<&str, usize>,
    placed: &HashSet<&str>,
) -> String {
    let Some(mut current) = layers.iter().find(|l| !placed.contains(l.name.as_str())) else {
        return String::new();
    };
    let mut seen: HashSet<&str> = HashSet::new();
    while seen.insert(current.name.as_str()) {
        let next = current
            .depends_on
            .iter()
            .find(|d| !placed.contains(d.as_str()))
            .and_then(|d| index.get(d.as_str()))
            .map(|&i| &layers[i]);
        match next {
            Some(layer) => current = layer,
            None => break,
        }
    }
    current.name.clone()
}
