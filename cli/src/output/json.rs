//! JSON output helpers.
//!
//! Provides the error-object formatter used by all `--json` code paths when
//! a command fails, and the JSON renderer for command results.

use anyhow::{Context, Result};
use serde::Serialize;
use strata_common::{DeploymentState, LayerOutput};

use crate::domain::{DestroyReport, ResolvedPlan, RunReport};

/// Format a JSON error object.
///
/// Output (pretty-printed):
/// ```json
/// {
///   "error": true,
///   "message": "...",
///   "code": "..."
/// }
/// ```
///
/// # Errors
///
/// Returns an error if JSON serialization fails.
pub fn format_error(message: &str, code: &str) -> Result<String> {
    let obj = serde_json::json!({
        "error": true,
        "message": message,
        "code": code,
    });
    serde_json::to_string_pretty(&obj).context("JSON serialization failed")
}

/// Renders command results as pretty-printed JSON on stdout.
pub struct JsonRenderer;

impl JsonRenderer {
    fn print<T: Serialize + ?Sized>(value: &T) -> Result<()> {
        println!(
            "{}",
            serde_json::to_string_pretty(value).context("JSON serialization failed")?
        );
        Ok(())
    }

    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn render_version(version: &str) -> Result<()> {
        Self::print(&serde_json::json!({ "version": version }))
    }

    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn render_plan(environment: &str, plan: &ResolvedPlan) -> Result<()> {
        let order: Vec<_> = plan
            .order
            .iter()
            .map(|s| {
                serde_json::json!({
                    "layer": s.name,
                    "kind": s.kind(),
                    "depends_on": s.depends_on,
                })
            })
            .collect();
        Self::print(&serde_json::json!({
            "environment": environment,
            "order": order,
            "disabled": plan.disabled.iter().map(|s| s.name.as_str()).collect::<Vec<_>>(),
        }))
    }

    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn render_run(report: &RunReport) -> Result<()> {
        Self::print(&serde_json::json!({
            "success": report.success(),
            "aborted": report.aborted,
            "layers": report.layers,
        }))
    }

    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn render_destroy(report: &DestroyReport) -> Result<()> {
        Self::print(&serde_json::json!({
            "success": report.success(),
            "layers": report.layers,
        }))
    }

    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn render_state(state: Option<&DeploymentState>) -> Result<()> {
        match state {
            Some(state) => Self::print(state),
            None => Self::print(&serde_json::json!({ "layers": {} })),
        }
    }

    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn render_outputs(output: &LayerOutput) -> Result<()> {
        Self::print(output)
    }
}
