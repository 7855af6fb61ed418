//! Destroy command: tear down layers in reverse dependency order.

use std::process::ExitCode;

use anyhow::Result;
use clap::Args;

use crate::app::AppContext;
use crate::application::ports::DeploymentStateStore;
use crate::application::services::layers::build_layer;
use crate::application::services::{Orchestrator, RunPlan};
use crate::output::{HumanRenderer, JsonRenderer};

/// Arguments for the destroy command.
#[derive(Args)]
pub struct DestroyArgs {
    /// Layers to destroy (default: every enabled layer)
    #[arg(value_name = "LAYER")]
    pub layers: Vec<String>,
}

/// Run the destroy command.
///
/// # Errors
///
/// Returns an error for invalid configuration, an unknown layer name, or a
/// failed prompt. Per-layer destroy failures are reported, not returned.
pub async fn run(app: &AppContext, args: &DestroyArgs) -> Result<ExitCode> {
    let config = app.load_config()?;
    let settings = &config.settings;
    let store = app.state_store(settings);
    let recorded = store.load().await?;

    let toolkit = app.toolkit(settings);
    let mut plan = RunPlan::build(&config, &toolkit, recorded.as_ref(), build_layer)?;
    if !args.layers.is_empty() {
        plan.retain_named(&args.layers)?;
    }
    if let Some(state) = &recorded {
        plan.seed_outputs(state);
    }

    let names = plan.names().join(", ");
    let prompt = format!("Destroy {names} in {}?", settings.environment);
    if !app.non_interactive && !app.confirm(&prompt, false)? {
        app.output.info("Aborted.");
        return Ok(ExitCode::SUCCESS);
    }

    let report = {
        let reporter = app.reporter();
        Orchestrator::new(&store, &reporter, false).destroy(&plan).await
    };
    if app.is_json() {
        JsonRenderer::render_destroy(&report)?;
    } else {
        HumanRenderer::new(&app.output).render_destroy(&report);
    }
    Ok(super::exit_code(report.success()))
}
