//! Application services: use-case orchestration.
//!
//! Each service module composes domain logic with port trait calls. Services
//! import only from `crate::domain` and `crate::application::ports`, never
//! from `crate::infra`, `crate::commands`, or `crate::output`.

pub mod layers;
pub mod lifecycle;
pub mod orchestrator;
pub mod remote_command;
pub mod stack_reader;

pub use lifecycle::{Layer, LayerContext, OutputsView, ProbeSummary, ScopedWorkdir, Teardown, Toolkit};
pub use orchestrator::{Orchestrator, PlannedLayer, RunPlan};
pub use remote_command::CommandPoller;
pub use stack_reader::{PollPolicy, RetryPolicy, StackReader};
