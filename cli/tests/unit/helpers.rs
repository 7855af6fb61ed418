//! Scripted layers for driving the orchestrator without any remote state.

#![allow(dead_code)]

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use strata_cli::application::services::{Layer, OutputsView, PlannedLayer, RunPlan};
use strata_cli::domain::{LayerError, OutputContract, VerifyOutcome};
use strata_common::{LayerOutput, LayerSpec};

use crate::mocks::map;

/// Ordered record of lifecycle calls across every layer in a test.
pub type CallLog = Arc<Mutex<Vec<String>>>;

pub fn call_log() -> CallLog {
    Arc::new(Mutex::new(Vec::new()))
}

pub fn calls(log: &CallLog) -> Vec<String> {
    log.lock().map(|l| l.clone()).unwrap_or_default()
}

pub fn called(log: &CallLog, entry: &str) -> bool {
    calls(log).iter().any(|c| c == entry)
}

pub const CONTRACT: OutputContract = OutputContract {
    required: &["Id"],
    optional: &["Extra"],
};

#[derive(Debug, Clone, Copy)]
pub enum Verify {
    Healthy,
    Missing,
    Error,
    /// Claims healthy but hands back an output without the required key.
    IncompleteSkip,
    /// Claims healthy but hands back an output labelled for another layer.
    ForeignSkip,
}

#[derive(Debug, Clone, Copy)]
pub enum Deploy {
    Succeeds,
    Fails,
    TimesOut,
}

pub struct ScriptedLayer {
    name: String,
    verify: Verify,
    deploy: Deploy,
    publishes_outputs: bool,
    destroy_fails: bool,
    watch: Option<(OutputsView, String)>,
    log: CallLog,
}

impl ScriptedLayer {
    pub fn new(name: &str, log: &CallLog) -> Self {
        Self {
            name: name.to_string(),
            verify: Verify::Healthy,
            deploy: Deploy::Succeeds,
            publishes_outputs: true,
            destroy_fails: false,
            watch: None,
            log: log.clone(),
        }
    }

    #[must_use]
    pub fn verifying(mut self, verify: Verify) -> Self {
        self.verify = verify;
        self
    }

    #[must_use]
    pub fn deploying(mut self, deploy: Deploy) -> Self {
        self.verify = match self.verify {
            Verify::Healthy => Verify::Missing,
            other => other,
        };
        self.deploy = deploy;
        self
    }

    #[must_use]
    pub fn without_outputs(mut self) -> Self {
        self.publishes_outputs = false;
        self
    }

    #[must_use]
    pub fn failing_destroy(mut self) -> Self {
        self.destroy_fails = true;
        self
    }

    /// Record during verify whether `dependency` is visible in `view`.
    #[must_use]
    pub fn watching(mut self, view: &OutputsView, dependency: &str) -> Self {
        self.watch = Some((view.clone(), dependency.to_string()));
        self
    }

    fn record(&self, call: &str) {
        if let Ok(mut log) = self.log.lock() {
            log.push(format!("{}:{call}", self.name));
        }
    }

    fn output(&self) -> LayerOutput {
        let id = format!("{}-id", self.name);
        LayerOutput::new(&self.name, map(&[("Id", id.as_str())]))
    }
}

#[async_trait]
impl Layer for ScriptedLayer {
    fn name(&self) -> &str {
        &self.name
    }

    fn contract(&self) -> OutputContract {
        CONTRACT
    }

    async fn verify(&self) -> Result<VerifyOutcome, LayerError> {
        self.record("verify");
        if let Some((view, dependency)) = &self.watch {
            let seen = if view.contains(dependency) { "sees" } else { "blind" };
            self.record(&format!("{seen}:{dependency}"));
        }
        match self.verify {
            Verify::Healthy => Ok(VerifyOutcome::skip("stack healthy", self.output())),
            Verify::Missing => Ok(VerifyOutcome::deploy("stack missing")),
            Verify::Error => Err(LayerError::failed("describe stack", "Throttling")),
            Verify::IncompleteSkip => Ok(VerifyOutcome::skip(
                "stack healthy",
                LayerOutput::new(&self.name, BTreeMap::new()),
            )),
            Verify::ForeignSkip => Ok(VerifyOutcome::skip(
                "stack healthy",
                LayerOutput::new("intruder", map(&[("Id", "intruder-id")])),
            )),
        }
    }

    async fn deploy(&self) -> Result<(), LayerError> {
        self.record("deploy");
        match self.deploy {
            Deploy::Succeeds => Ok(()),
            Deploy::Fails => Err(LayerError::failed(
                format!("stack devnet-{}", self.name),
                "settled in ROLLBACK_COMPLETE",
            )),
            Deploy::TimesOut => Err(LayerError::timeout(
                format!("waiting for stack devnet-{}", self.name),
                Duration::from_secs(2700),
            )),
        }
    }

    async fn get_outputs(&self) -> Result<LayerOutput, LayerError> {
        self.record("get_outputs");
        if self.publishes_outputs {
            Ok(self.output())
        } else {
            Ok(LayerOutput::new(&self.name, BTreeMap::new()))
        }
    }

    async fn destroy(&self) -> Result<(), LayerError> {
        self.record("destroy");
        if self.destroy_fails {
            Err(LayerError::PartialDestroyFailure {
                layer: self.name.clone(),
                failures: vec!["delete stack: DELETE_FAILED".to_string()],
            })
        } else {
            Ok(())
        }
    }
}

pub fn spec(name: &str, deps: &[&str]) -> LayerSpec {
    LayerSpec::new(name).depends_on(deps.iter().copied())
}

/// A plan over already-ordered layers sharing `view`.
pub fn plan(view: &OutputsView, layers: Vec<(LayerSpec, ScriptedLayer)>) -> RunPlan {
    let planned = layers
        .into_iter()
        .map(|(spec, layer)| PlannedLayer {
            spec,
            layer: Some(Box::new(layer) as Box<dyn Layer>),
        })
        .collect();
    RunPlan::new(planned, view.clone())
}
