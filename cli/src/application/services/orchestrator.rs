//! Orchestrator driver: walks the resolved plan one layer at a time.
//!
//! For each enabled layer: verify, then skip (publishing verified outputs)
//! or deploy and capture outputs. Outputs become visible to later layers
//! only after capture. State is persisted after every layer so an
//! interrupted run can resume.
//!
//! Imports only from `crate::domain` and `crate::application::ports`.

use std::collections::HashSet;

use anyhow::{Context, Result};
use strata_common::{DeploymentState, LayerOutput, LayerSpec};
use tokio::time::Instant;

use crate::application::ports::{DeploymentStateStore, ProgressReporter};
use crate::application::services::lifecycle::{Layer, LayerContext, OutputsView, Toolkit};
use crate::domain::{
    Capture, ConfigError, DeployOutcome, DestroyEntry, DestroyReport, LayerError, LayerProgress,
    LayerReport, LayerStatus, OutputContract, RunReport, StrataConfig, VerifyOutcome, resolve,
};

/// One entry of a plan, in execution order.
pub struct PlannedLayer {
    pub spec: LayerSpec,
    /// `None` for disabled layers; they are never constructed.
    pub layer: Option<Box<dyn Layer>>,
}

/// Layers in execution order, sharing one outputs view.
pub struct RunPlan {
    layers: Vec<PlannedLayer>,
    outputs: OutputsView,
}

impl RunPlan {
    #[must_use]
    pub fn new(layers: Vec<PlannedLayer>, outputs: OutputsView) -> Self {
        Self { layers, outputs }
    }

    /// Resolve `config` and build every enabled layer with `build`.
    ///
    /// Disabled layers are appended after the ordered ones and never built.
    /// `previous` supplies per-layer hints from an earlier run.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] for an invalid graph or an unbuildable layer.
    /// Nothing remote has been touched at that point.
    pub fn build<F>(
        config: &StrataConfig,
        toolkit: &Toolkit,
        previous: Option<&DeploymentState>,
        build: F,
    ) -> Result<Self, ConfigError>
    where
        F: Fn(LayerContext) -> Result<Box<dyn Layer>, ConfigError>,
    {
        let resolved = resolve(&config.layers)?;
        let settings = std::sync::Arc::new(config.settings.clone());
        let outputs = OutputsView::new();
        let mut layers = Vec::with_capacity(resolved.order.len() + resolved.disabled.len());
        for spec in resolved.order {
            let hint = previous.and_then(|s| s.get(&spec.name)).cloned();
            let ctx = LayerContext::new(
                settings.clone(),
                spec.clone(),
                toolkit.clone(),
                outputs.clone(),
                hint,
            );
            layers.push(PlannedLayer {
                layer: Some(build(ctx)?),
                spec,
            });
        }
        layers.extend(
            resolved
                .disabled
                .into_iter()
                .map(|spec| PlannedLayer { spec, layer: None }),
        );
        Ok(Self { layers, outputs })
    }

    /// Layer names in execution order, disabled ones last.
    #[must_use]
    pub fn names(&self) -> Vec<&str> {
        self.layers.iter().map(|p| p.spec.name.as_str()).collect()
    }

    /// Keep only the named layers (for targeted destroy).
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] naming the first unknown layer.
    pub fn retain_named(&mut self, names: &[String]) -> Result<(), ConfigError> {
        if let Some(unknown) = names
            .iter()
            .find(|n| !self.layers.iter().any(|p| &p.spec.name == *n))
        {
            return Err(ConfigError::Invalid(format!("unknown layer '{unknown}'")));
        }
        self.layers.retain(|p| names.contains(&p.spec.name));
        Ok(())
    }

    /// Make previously recorded outputs visible, for destroy runs where
    /// teardown steps may need dependency identifiers.
    pub fn seed_outputs(&self, state: &DeploymentState) {
        for output in state.layers.values() {
            self.outputs.publish(output.clone());
        }
    }
}

/// An output is recorded under its own layer name only, and must satisfy
/// the layer's contract.
fn accept(name: &str, contract: OutputContract, output: &LayerOutput) -> Result<(), LayerError> {
    if output.layer != name {
        return Err(LayerError::Other(anyhow::anyhow!(
            "output is labelled '{}', expected '{name}'",
            output.layer
        )));
    }
    contract.validate(output)
}

/// Drives a [`RunPlan`] against remote state.
pub struct Orchestrator<'a> {
    store: &'a dyn DeploymentStateStore,
    reporter: &'a dyn ProgressReporter,
    continue_on_error: bool,
}

impl<'a> Orchestrator<'a> {
    #[must_use]
    pub fn new(
        store: &'a dyn DeploymentStateStore,
        reporter: &'a dyn ProgressReporter,
        continue_on_error: bool,
    ) -> Self {
        Self {
            store,
            reporter,
            continue_on_error,
        }
    }

    /// Run every layer in plan order.
    ///
    /// Without `continue_on_error`, the first failed or timed-out layer stops
    /// the run and every later layer stays `Pending`. With it, later layers
    /// still run, but a layer whose dependency did not capture outputs is
    /// marked `DependencyFailed` without calling verify or deploy.
    ///
    /// # Errors
    ///
    /// Returns an error if the state document cannot be persisted, or on an
    /// illegal lifecycle transition. Layer failures are reported in the
    /// [`RunReport`], not as errors.
    pub async fn run(&self, plan: &RunPlan, mut state: DeploymentState) -> Result<RunReport> {
        let mut report = RunReport {
            layers: plan
                .layers
                .iter()
                .map(|p| LayerReport::pending(&p.spec.name))
                .collect(),
            aborted: false,
        };
        let mut captured: HashSet<String> = HashSet::new();

        for (index, planned) in plan.layers.iter().enumerate() {
            let entry = &mut report.layers[index];
            let name = planned.spec.name.as_str();
            let mut progress = LayerProgress::new(name);

            match &planned.layer {
                Some(layer) if planned.spec.enabled => {
                    if let Some(dep) = planned
                        .spec
                        .depends_on
                        .iter()
                        .find(|d| !captured.contains(d.as_str()))
                    {
                        progress.advance(LayerStatus::DependencyFailed)?;
                        entry.detail = Some(format!("dependency '{dep}' did not capture outputs"));
                        self.reporter
                            .warn(&format!("{name}: not attempted, '{dep}' has no outputs"));
                    } else if let Some(output) =
                        self.run_layer(layer.as_ref(), &mut progress, entry).await?
                    {
                        plan.outputs.publish(output.clone());
                        state.record(output);
                        captured.insert(name.to_string());
                    }
                }
                _ => {
                    progress.advance(LayerStatus::SkippedDisabled)?;
                    tracing::info!(layer = name, "layer disabled");
                }
            }
            entry.status = progress.status();

            self.store.save(&state).await.with_context(|| {
                format!(
                    "persisting state to {} after layer '{name}'",
                    self.store.location().display()
                )
            })?;

            if progress.status().is_failure() && !self.continue_on_error {
                report.aborted = true;
                self.reporter
                    .warn(&format!("stopping after '{name}' failed; later layers not attempted"));
                break;
            }
        }
        Ok(report)
    }

    /// Verify, then skip or deploy and capture. Returns the captured output,
    /// or `None` when the layer ended in a failure state.
    async fn run_layer(
        &self,
        layer: &dyn Layer,
        progress: &mut LayerProgress,
        entry: &mut LayerReport,
    ) -> Result<Option<LayerOutput>, LayerError> {
        let name = layer.name();
        let contract = layer.contract();
        progress.advance(LayerStatus::Verifying)?;
        self.reporter.step(&format!("{name}: verifying"));

        let reason = match layer.verify().await {
            Ok(VerifyOutcome::Skip { reason, output }) => match accept(name, contract, &output) {
                Ok(()) => {
                    progress.advance(LayerStatus::Skipped)?;
                    progress.advance(LayerStatus::OutputsCaptured)?;
                    self.reporter.success(&format!("{name}: up to date ({reason})"));
                    entry.capture = Some(Capture::Skipped);
                    entry.detail = Some(reason);
                    return Ok(Some(output));
                }
                Err(e) => format!("verified outputs rejected: {e}"),
            },
            Ok(VerifyOutcome::Deploy { reason }) => reason,
            Err(e) => format!("verify failed: {e}"),
        };
        tracing::info!(layer = name, %reason, "deploy required");

        progress.advance(LayerStatus::Deploying)?;
        self.reporter.step(&format!("{name}: deploying ({reason})"));
        let started = Instant::now();
        let result = layer.deploy().await;
        let outcome = DeployOutcome::from_result(&result, started.elapsed());
        entry.deploy = Some(outcome);

        if let Err(e) = result {
            let status = if e.is_timeout() {
                LayerStatus::TimedOut
            } else {
                LayerStatus::Failed
            };
            progress.advance(status)?;
            self.reporter.warn(&format!("{name}: {status}: {e}"));
            entry.detail = Some(e.to_string());
            return Ok(None);
        }
        progress.advance(LayerStatus::Deployed)?;

        let captured = match layer.get_outputs().await {
            Ok(output) => accept(name, contract, &output).map(|()| output),
            Err(e) => Err(e),
        };
        match captured {
            Ok(mut output) => {
                output.deployed = true;
                progress.advance(LayerStatus::OutputsCaptured)?;
                self.reporter.success(&format!("{name}: deployed"));
                entry.capture = Some(Capture::Deployed);
                entry.detail = Some(reason);
                Ok(Some(output))
            }
            Err(e) => {
                progress.advance(LayerStatus::Failed)?;
                self.reporter
                    .warn(&format!("{name}: deployed but outputs unusable: {e}"));
                entry.detail = Some(format!("output capture failed: {e}"));
                Ok(None)
            }
        }
    }

    /// Destroy every enabled layer in reverse plan order.
    ///
    /// Best-effort: a failing layer is recorded and the next one is still
    /// attempted. The state document is left untouched.
    pub async fn destroy(&self, plan: &RunPlan) -> DestroyReport {
        let mut report = DestroyReport::default();
        for planned in plan.layers.iter().rev() {
            let Some(layer) = planned.layer.as_ref().filter(|_| planned.spec.enabled) else {
                continue;
            };
            let name = layer.name();
            self.reporter.step(&format!("{name}: destroying"));
            match layer.destroy().await {
                Ok(()) => {
                    self.reporter.success(&format!("{name}: destroyed"));
                    report.layers.push(DestroyEntry {
                        layer: name.to_string(),
                        success: true,
                        error: None,
                    });
                }
                Err(e) => {
                    self.reporter.warn(&format!("{name}: destroy failed: {e}"));
                    report.layers.push(DestroyEntry {
                        layer: name.to_string(),
                        success: false,
                        error: Some(e.to_string()),
                    });
                }
            }
        }
        report
    }
}
