//! Plan command: resolve and print the deployment order.

use std::process::ExitCode;

use anyhow::Result;

use crate::app::AppContext;
use crate::application::services::layers::KINDS;
use crate::domain::{ConfigError, resolve};
use crate::output::{HumanRenderer, JsonRenderer};

/// Run the plan command. Touches no remote state.
///
/// # Errors
///
/// Returns an error if the configuration or layer graph is invalid.
pub fn run(app: &AppContext) -> Result<ExitCode> {
    let config = app.load_config()?;
    let plan = resolve(&config.layers)?;
    if let Some(spec) = plan.order.iter().find(|s| !KINDS.contains(&s.kind())) {
        return Err(ConfigError::UnknownKind {
            layer: spec.name.clone(),
            kind: spec.kind().to_string(),
            valid: KINDS.join(", "),
        }
        .into());
    }
    let environment = &config.settings.environment;
    if app.is_json() {
        JsonRenderer::render_plan(environment, &plan)?;
    } else {
        HumanRenderer::new(&app.output).render_plan(environment, &plan);
    }
    Ok(ExitCode::SUCCESS)
}
