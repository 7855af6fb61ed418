//! Status command: show the recorded deployment state.

use std::process::ExitCode;

use anyhow::Result;

use crate::app::AppContext;
use crate::application::ports::DeploymentStateStore;
use crate::output::{HumanRenderer, JsonRenderer};

/// Run the status command.
///
/// # Errors
///
/// Returns an error if the state document cannot be read.
pub async fn run(app: &AppContext) -> Result<ExitCode> {
    let store = app.recorded_state()?;
    let state = store.load().await?;
    if app.is_json() {
        JsonRenderer::render_state(state.as_ref())?;
    } else {
        HumanRenderer::new(&app.output).render_state(state.as_ref(), store.location());
    }
    Ok(ExitCode::SUCCESS)
}
