//! Deploy command: run every enabled layer in dependency order.

use std::process::ExitCode;

use anyhow::Result;
use clap::Args;

use crate::app::AppContext;
use crate::application::ports::DeploymentStateStore;
use crate::application::services::layers::build_layer;
use crate::application::services::{Orchestrator, RunPlan};
use crate::output::{HumanRenderer, JsonRenderer};

/// Arguments for the deploy command.
#[derive(Args)]
pub struct DeployArgs {
    /// Keep going after a layer fails; its dependents are not attempted
    #[arg(long)]
    pub continue_on_error: bool,

    /// Ignore recorded state from earlier runs
    #[arg(long)]
    pub fresh: bool,
}

/// Run the deploy command.
///
/// # Errors
///
/// Returns an error for invalid configuration, an unreadable state
/// document, or a state write failure mid-run.
pub async fn run(app: &AppContext, args: &DeployArgs) -> Result<ExitCode> {
    let config = app.load_config()?;
    let settings = &config.settings;
    let store = app.state_store(settings);
    let previous = if args.fresh {
        None
    } else {
        store.load().await?
    };
    if previous.is_some() {
        tracing::info!(state = %store.location().display(), "resuming from recorded state");
    }

    let toolkit = app.toolkit(settings);
    let plan = RunPlan::build(&config, &toolkit, previous.as_ref(), build_layer)?;
    app.output.header(&format!(
        "Deploying {} ({} layers)",
        settings.environment,
        plan.names().len()
    ));

    let report = {
        let reporter = app.reporter();
        let orchestrator = Orchestrator::new(
            &store,
            &reporter,
            args.continue_on_error || settings.continue_on_error,
        );
        orchestrator.run(&plan, previous.unwrap_or_default()).await?
    };

    if app.is_json() {
        JsonRenderer::render_run(&report)?;
    } else {
        HumanRenderer::new(&app.output).render_run(&report);
    }
    Ok(super::exit_code(report.success()))
}
