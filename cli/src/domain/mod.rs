//! Domain layer: pure types and validation.
//!
//! This module has zero imports from `crate::infra`, `crate::commands`,
//! `crate::application`, `tokio`, `std::fs`, `std::process`, or `std::net`.
//! All functions are synchronous and take data in, returning data out.

pub mod config;
pub mod contract;
pub mod error;
pub mod graph;
pub mod lifecycle;
pub mod remote;
pub mod report;

pub use config::{RepoRef, RunSettings, StrataConfig, Timing, parse_config};
pub use contract::OutputContract;
pub use error::{ConfigError, LayerError};
pub use graph::{ResolvedPlan, order_layers, resolve};
pub use lifecycle::{DeployOutcome, LayerProgress, LayerStatus, VerifyOutcome};
pub use remote::{PollOutcome, RemoteCommandStatus, StackStatus, WaitOutcome};
pub use report::{Capture, DestroyEntry, DestroyReport, LayerReport, RunReport};
