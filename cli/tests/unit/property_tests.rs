//! Property-based tests for dependency resolution.
//!
//! Uses `proptest` to check ordering invariants across random layer graphs.

#![allow(clippy::expect_used)]

use std::collections::HashMap;

use proptest::prelude::*;

use strata_cli::domain::{ConfigError, order_layers, resolve};
use strata_common::{LayerGraph, LayerSpec};

const MAX_LAYERS: usize = 12;

/// Layer `i` may only depend on layers declared before it, so the graph is
/// always acyclic. `chain` additionally links every layer to its predecessor.
fn build_layers(edges: &[Vec<bool>], chain: bool) -> Vec<LayerSpec> {
    edges
        .iter()
        .enumerate()
        .map(|(i, row)| {
            let deps = (0..i)
                .filter(|&j| row[j] || (chain && j + 1 == i))
                .map(|j| format!("layer-{j}"));
            LayerSpec::new(format!("layer-{i}")).depends_on(deps)
        })
        .collect()
}

fn graph_edges() -> impl Strategy<Value = Vec<Vec<bool>>> {
    prop::collection::vec(prop::collection::vec(any::<bool>(), MAX_LAYERS), 1..MAX_LAYERS)
}

fn positions(order: &[LayerSpec]) -> HashMap<&str, usize> {
    order
        .iter()
        .enumerate()
        .map(|(i, l)| (l.name.as_str(), i))
        .collect()
}

proptest! {
    /// Every layer comes after everything it depends on.
    #[test]
    fn prop_dependencies_precede_dependents(edges in graph_edges()) {
        let layers = build_layers(&edges, false);
        let order = order_layers(&layers).expect("acyclic graph resolves");
        let at = positions(&order);
        for layer in &order {
            for dep in &layer.depends_on {
                prop_assert!(
                    at[dep.as_str()] < at[layer.name.as_str()],
                    "{} placed before its dependency {}", layer.name, dep
                );
            }
        }
    }

    /// Ordering is a permutation of the input.
    #[test]
    fn prop_order_contains_every_layer_once(edges in graph_edges()) {
        let layers = build_layers(&edges, false);
        let order = order_layers(&layers).expect("acyclic graph resolves");
        prop_assert_eq!(order.len(), layers.len());
        prop_assert_eq!(positions(&order).len(), layers.len());
    }

    /// Declaration order does not affect whether a graph resolves.
    #[test]
    fn prop_reversed_declaration_still_resolves(edges in graph_edges()) {
        let mut layers = build_layers(&edges, false);
        layers.reverse();
        let order = order_layers(&layers).expect("acyclic graph resolves");
        let at = positions(&order);
        for layer in &order {
            for dep in &layer.depends_on {
                prop_assert!(at[dep.as_str()] < at[layer.name.as_str()]);
            }
        }
    }

    /// Closing the chain into a loop is always reported as a cycle.
    #[test]
    fn prop_back_edge_is_a_cycle(edges in graph_edges()) {
        let mut layers = build_layers(&edges, true);
        let last = format!("layer-{}", layers.len() - 1);
        let first = layers[0].clone().depends_on([last]);
        layers[0] = first;

        let err = order_layers(&layers).expect_err("cycle must be rejected");
        prop_assert!(
            matches!(err, ConfigError::CyclicDependency { .. }),
            "unexpected error: {err}"
        );
    }

    /// Disabled leaves never show up in the deployment order.
    #[test]
    fn prop_disabled_layers_are_excluded(edges in graph_edges(), extra in 1usize..4) {
        let mut layers = build_layers(&edges, false);
        for i in 0..extra {
            layers.push(LayerSpec::new(format!("off-{i}")).disabled());
        }
        let plan = resolve(&LayerGraph::new(layers)).expect("resolves");
        prop_assert!(plan.names().iter().all(|n| !n.starts_with("off-")));
        prop_assert_eq!(plan.disabled.len(), extra);
    }
}

#[test]
fn first_declared_wins_among_independent_layers() {
    let layers = vec![
        LayerSpec::new("zeta"),
        LayerSpec::new("alpha"),
        LayerSpec::new("mid").depends_on(["alpha"]),
    ];
    let order = order_layers(&layers).expect("resolves");
    let names: Vec<_> = order.iter().map(|l| l.name.as_str()).collect();
    assert_eq!(names, ["zeta", "alpha", "mid"]);
}
