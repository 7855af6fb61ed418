//! Human-readable terminal renderer.

use std::path::Path;

use chrono::{DateTime, Utc};
use owo_colors::OwoColorize as _;
use strata_common::{DeploymentState, LayerOutput};

use crate::domain::{Capture, DestroyReport, LayerReport, ResolvedPlan, RunReport};
use crate::output::OutputContext;

/// Renders domain types as human-readable terminal output using `OutputContext`.
pub struct HumanRenderer<'a> {
    ctx: &'a OutputContext,
}

impl<'a> HumanRenderer<'a> {
    /// Create a new `HumanRenderer` wrapping the given output context.
    #[must_use]
    pub fn new(ctx: &'a OutputContext) -> Self {
        Self { ctx }
    }

    /// Render the CLI version information.
    pub fn render_version(&self, version: &str) {
        if self.ctx.quiet {
            return;
        }
        self.ctx.info(&format!("strata v{version}"));
    }

    /// Render the deployment order.
    pub fn render_plan(&self, environment: &str, plan: &ResolvedPlan) {
        if self.ctx.quiet {
            return;
        }
        self.ctx.header(&format!("Deployment order ({environment}):"));
        for (i, spec) in plan.order.iter().enumerate() {
            let deps = if spec.depends_on.is_empty() {
                String::new()
            } else {
                format!("after {}", spec.depends_on.join(", "))
            };
            println!(
                "  {:>2}. {:<16} {:<10} {}",
                i + 1,
                spec.name,
                spec.kind(),
                deps.style(self.ctx.styles.dim)
            );
        }
        if !plan.disabled.is_empty() {
            println!();
            let names: Vec<&str> = plan.disabled.iter().map(|s| s.name.as_str()).collect();
            self.ctx.kv("Disabled:", &names.join(", "));
        }
    }

    /// Render the run summary: one line per layer, then the verdict.
    pub fn render_run(&self, report: &RunReport) {
        if !self.ctx.quiet {
            println!();
            self.ctx.header("Summary:");
            for layer in &report.layers {
                self.render_layer_line(layer);
            }
            println!();
        }
        if report.success() {
            self.ctx.success("All layers deployed");
        } else {
            let failed: Vec<&str> = report.failures().map(|l| l.layer.as_str()).collect();
            self.ctx.error(&format!("Deployment failed: {}", failed.join(", ")));
            if report.aborted {
                self.ctx
                    .info("Fix the failure and rerun; healthy layers will be skipped.");
            }
        }
    }

    fn render_layer_line(&self, layer: &LayerReport) {
        let how = match layer.capture {
            Some(Capture::Skipped) => "reused",
            Some(Capture::Deployed) => "deployed",
            None => "",
        };
        let took = layer
            .deploy
            .as_ref()
            .map(|d| format!("{:.0}s", d.duration.as_secs_f64()))
            .unwrap_or_default();
        println!(
            "  {:<16} {:<18} {:<9} {:>6}  {}",
            layer.layer,
            layer.status.style(self.ctx.styles.status(layer.status)),
            how,
            took,
            layer.detail.as_deref().unwrap_or("").style(self.ctx.styles.dim)
        );
    }

    /// Render a destroy summary.
    pub fn render_destroy(&self, report: &DestroyReport) {
        for entry in &report.layers {
            match &entry.error {
                None => self.ctx.success(&format!("{} destroyed", entry.layer)),
                Some(e) => self.ctx.error(&format!("{}: {e}", entry.layer)),
            }
        }
    }

    /// Render the persisted state document.
    pub fn render_state(&self, state: Option<&DeploymentState>, location: &Path) {
        let Some(state) = state.filter(|s| !s.is_empty()) else {
            self.ctx
                .info(&format!("No deployment recorded at {}", location.display()));
            return;
        };
        self.ctx.kv("State:", &location.display().to_string());
        self.ctx.kv("Revision:", &state.revision.to_string());
        let now = Utc::now();
        self.ctx.kv(
            "Updated:",
            &format!(
                "{} ({})",
                state.updated_at.format("%Y-%m-%d %H:%M:%S UTC"),
                age(state.updated_at, now)
            ),
        );
        println!();
        for (name, output) in &state.layers {
            println!(
                "  {:<16} {:<9} {:>3} outputs  {}",
                name,
                if output.deployed { "deployed" } else { "recorded" },
                output.outputs.len(),
                age(output.timestamp, now).style(self.ctx.styles.dim)
            );
        }
    }

    /// Render one layer's recorded outputs.
    pub fn render_outputs(&self, output: &LayerOutput) {
        let width = output.outputs.keys().map(String::len).max().unwrap_or(0) + 1;
        for (key, value) in &output.outputs {
            println!("  {:<width$} {value}", format!("{key}:").style(self.ctx.styles.dim));
        }
    }
}

/// Coarse relative age, e.g. `3h ago`.
fn age(at: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let elapsed = now.signed_duration_since(at);
    if elapsed.num_seconds() < 60 {
        "just now".to_string()
    } else if elapsed.num_hours() < 1 {
        format!("{}m ago", elapsed.num_minutes())
    } else if elapsed.num_days() < 2 {
        format!("{}h ago", elapsed.num_hours())
    } else {
        format!("{}d ago", elapsed.num_days())
    }
}
