//! Shared document types for strata: the declarative layer graph and the
//! per-run deployment state document.
//!
//! Nothing in this crate performs I/O. Both documents round-trip through
//! serde so callers can persist them in whatever format they choose.

pub mod layer;
pub mod state;

pub use layer::{LayerConfig, LayerGraph, LayerSpec};
pub use state::{DeploymentState, LayerOutput, STATE_FORMAT_VERSION};
