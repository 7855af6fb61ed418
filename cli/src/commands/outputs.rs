//! Outputs command: print one layer's recorded outputs.

use std::process::ExitCode;

use anyhow::Result;
use clap::Args;

use crate::app::AppContext;
use crate::application::ports::DeploymentStateStore;
use crate::output::{HumanRenderer, JsonRenderer};

/// Arguments for the outputs command.
#[derive(Args)]
pub struct OutputsArgs {
    /// Layer name
    pub layer: String,
}

/// Run the outputs command.
///
/// # Errors
///
/// Returns an error if the state cannot be read or holds nothing for the layer.
pub async fn run(app: &AppContext, args: &OutputsArgs) -> Result<ExitCode> {
    let store = app.recorded_state()?;
    let state = store.load().await?;
    let Some(output) = state.as_ref().and_then(|s| s.get(&args.layer)) else {
        anyhow::bail!(
            "no outputs recorded for layer '{}' in {}",
            args.layer,
            store.location().display()
        );
    };
    if app.is_json() {
        JsonRenderer::render_outputs(output)?;
    } else {
        HumanRenderer::new(&app.output).render_outputs(output);
    }
    Ok(ExitCode::SUCCESS)
}
