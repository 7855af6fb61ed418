//! The layer lifecycle contract and the toolkit layers are built from.
//!
//! Every layer variant implements [`Layer`] and receives a [`LayerContext`]
//! at construction: run settings, its own config block, the shared
//! [`Toolkit`], and read access to dependency outputs captured this run.
//!
//! Imports only from `crate::domain` and `crate::application::ports`.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, PoisonError, RwLock};

use anyhow::Context;
use async_trait::async_trait;
use futures_util::future::join_all;
use serde::de::DeserializeOwned;
use strata_common::{LayerOutput, LayerSpec};
use tempfile::TempDir;

use crate::application::ports::{
    CommandOutcome, CommandRunner, CommandSpec, HealthOutcome, HealthProbe, ProbeTarget,
    RemoteScript, RepositoryMaterializer, StackDeployRequest,
};
use crate::application::services::remote_command::CommandPoller;
use crate::application::services::stack_reader::{PollPolicy, StackReader};
use crate::domain::{
    ConfigError, LayerError, OutputContract, PollOutcome, RepoRef, RunSettings, StackStatus,
    VerifyOutcome, WaitOutcome,
};

// ── Lifecycle contract ────────────────────────────────────────────────────────

/// A deployable unit.
///
/// `verify` is read-only and must never provision anything. When it cannot
/// confirm healthy state it answers `Deploy`, never `Skip`. `get_outputs`
/// omits optional keys it cannot read rather than failing the whole call.
#[async_trait]
pub trait Layer: Send + Sync {
    fn name(&self) -> &str;

    /// Keys this layer publishes.
    fn contract(&self) -> OutputContract;

    /// Decide whether existing remote state can be reused.
    async fn verify(&self) -> Result<VerifyOutcome, LayerError>;

    /// Provision or update remote state.
    async fn deploy(&self) -> Result<(), LayerError>;

    /// Read the published key/value set from remote state.
    async fn get_outputs(&self) -> Result<LayerOutput, LayerError>;

    /// Tear down remote state. Attempts every sub-step before reporting.
    async fn destroy(&self) -> Result<(), LayerError>;
}

// ── Shared run data ───────────────────────────────────────────────────────────

/// Outputs captured so far in the current run, shared between the driver
/// (writer) and every layer context (readers).
#[derive(Debug, Clone, Default)]
pub struct OutputsView {
    inner: Arc<RwLock<BTreeMap<String, LayerOutput>>>,
}

impl OutputsView {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Outputs of `layer`, if captured.
    #[must_use]
    pub fn get(&self, layer: &str) -> Option<LayerOutput> {
        self.inner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(layer)
            .cloned()
    }

    /// Record a captured output, replacing any earlier one for that layer.
    pub fn publish(&self, output: LayerOutput) {
        self.inner
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(output.layer.clone(), output);
    }

    #[must_use]
    pub fn contains(&self, layer: &str) -> bool {
        self.inner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(layer)
    }
}

/// The four shared components every layer variant is built from.
#[derive(Clone)]
pub struct Toolkit {
    pub commands: Arc<dyn CommandRunner>,
    pub stacks: StackReader,
    pub remote: CommandPoller,
    pub health: Arc<dyn HealthProbe>,
    pub repos: Arc<dyn RepositoryMaterializer>,
}

/// Everything a layer instance can see.
#[derive(Clone)]
pub struct LayerContext {
    pub settings: Arc<RunSettings>,
    pub spec: LayerSpec,
    pub toolkit: Toolkit,
    outputs: OutputsView,
    previous: Option<LayerOutput>,
}

impl LayerContext {
    #[must_use]
    pub fn new(
        settings: Arc<RunSettings>,
        spec: LayerSpec,
        toolkit: Toolkit,
        outputs: OutputsView,
        previous: Option<LayerOutput>,
    ) -> Self {
        Self {
            settings,
            spec,
            toolkit,
            outputs,
            previous,
        }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.spec.name
    }

    /// Outputs a dependency captured earlier in this run.
    #[must_use]
    pub fn outputs_of(&self, dependency: &str) -> Option<LayerOutput> {
        self.outputs.get(dependency)
    }

    /// Output recorded for this layer by a previous run. Read-only hint.
    #[must_use]
    pub fn previous(&self) -> Option<&LayerOutput> {
        self.previous.as_ref()
    }

    /// Outputs of `dependency`, or an error naming it.
    ///
    /// # Errors
    ///
    /// Returns [`LayerError::MissingDependencyOutput`] if nothing was captured.
    pub fn dependency(&self, dependency: &str) -> Result<LayerOutput, LayerError> {
        self.outputs_of(dependency)
            .ok_or_else(|| LayerError::MissingDependencyOutput {
                layer: self.name().to_string(),
                dependency: dependency.to_string(),
            })
    }

    /// One required value from a dependency's outputs.
    ///
    /// # Errors
    ///
    /// Returns [`LayerError::MissingDependencyOutput`] if the dependency has
    /// no captured outputs, or [`LayerError::MissingField`] if the key is
    /// absent or empty.
    pub fn require(&self, dependency: &str, key: &str) -> Result<String, LayerError> {
        let output = self.dependency(dependency)?;
        match output.get(key) {
            Some(v) if !v.trim().is_empty() => Ok(v.to_string()),
            _ => Err(LayerError::MissingField {
                layer: dependency.to_string(),
                field: key.to_string(),
            }),
        }
    }

    /// Deserialize this layer's config block.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidLayerConfig`] if the block does not match `T`.
    pub fn config<T: DeserializeOwned>(&self) -> Result<T, ConfigError> {
        serde_json::from_value(serde_json::Value::Object(self.spec.config.clone())).map_err(|e| {
            ConfigError::InvalidLayerConfig {
                layer: self.name().to_string(),
                message: e.to_string(),
            }
        })
    }

    /// The configured infrastructure repository.
    ///
    /// # Errors
    ///
    /// Returns an error if `settings.infra_repo` is not set.
    pub fn infra_repo(&self) -> Result<RepoRef, LayerError> {
        self.settings.infra_repo.clone().ok_or_else(|| {
            LayerError::Other(anyhow::anyhow!(
                "layer '{}' needs settings.infra_repo or its own `repo`",
                self.name()
            ))
        })
    }

    // ── Helpers built on the toolkit ──────────────────────────────────────────

    /// Clone or update `repo` and return its local path.
    ///
    /// # Errors
    ///
    /// Returns [`LayerError::RemoteOperationFailed`] if the source tree cannot
    /// be materialized.
    pub async fn materialize(&self, repo: &RepoRef) -> Result<PathBuf, LayerError> {
        self.toolkit
            .repos
            .ensure(repo)
            .await
            .map_err(|e| LayerError::failed(format!("fetch {}", repo.url), format!("{e:#}")))
    }

    /// Local path of `repo` if it is already checked out. Read-only, for
    /// use during verify.
    pub async fn checkout(&self, repo: &RepoRef) -> Option<PathBuf> {
        self.toolkit.repos.existing(repo).await
    }

    /// A scratch directory removed when the guard drops.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory cannot be created.
    pub fn scratch(&self) -> Result<ScopedWorkdir, LayerError> {
        ScopedWorkdir::create(&self.settings.scratch_dir(), self.name())
    }

    /// Current stack outputs if the stack exists in a healthy settled state.
    ///
    /// Used by `verify`; a failed read yields `None` so the caller deploys.
    pub async fn healthy_stack(&self, stack: &str) -> Option<BTreeMap<String, String>> {
        match self.toolkit.stacks.describe(stack).await {
            Ok(d) if d.status.is_healthy() => Some(d.outputs),
            Ok(d) => {
                tracing::info!(layer = self.name(), stack, status = %d.status, "stack not reusable");
                None
            }
            Err(e) => {
                tracing::info!(layer = self.name(), stack, error = %e, "stack state unknown");
                None
            }
        }
    }

    /// Stack outputs with bounded retry.
    ///
    /// # Errors
    ///
    /// Returns [`LayerError::RemoteOperationFailed`] once retries are exhausted.
    pub async fn stack_outputs(&self, stack: &str) -> Result<BTreeMap<String, String>, LayerError> {
        self.toolkit
            .stacks
            .read_outputs(stack)
            .await
            .map_err(|e| LayerError::failed(format!("read outputs of {stack}"), format!("{e:#}")))
    }

    /// Submit a create-or-update and wait for it to settle.
    ///
    /// # Errors
    ///
    /// Returns [`LayerError::RemoteOperationTimeout`] if the submission or the
    /// wait outlives its limit, and [`LayerError::RemoteOperationFailed`] if
    /// the stack settles anywhere but a complete state.
    pub async fn deploy_stack(&self, request: &StackDeployRequest) -> Result<(), LayerError> {
        let operation = format!("deploy stack {}", request.stack_name);
        tracing::info!(layer = self.name(), stack = %request.stack_name, "deploying stack");
        let outcome = self
            .toolkit
            .stacks
            .api()
            .deploy(request)
            .await
            .with_context(|| operation.clone())?;
        if outcome.timed_out {
            return Err(LayerError::timeout(operation, request.timeout));
        }
        if !outcome.success {
            return Err(LayerError::failed(operation, outcome.diagnostic()));
        }
        self.await_stack(
            &request.stack_name,
            &[StackStatus::CreateComplete, StackStatus::UpdateComplete],
        )
        .await
    }

    /// Submit a delete and wait for the stack to disappear. A stack that is
    /// already gone is a success.
    ///
    /// # Errors
    ///
    /// Returns an error if the delete is rejected, settles elsewhere, or the
    /// wait times out.
    pub async fn destroy_stack(&self, stack: &str) -> Result<(), LayerError> {
        let operation = format!("delete stack {stack}");
        let current = self
            .toolkit
            .stacks
            .status(stack)
            .await
            .with_context(|| operation.clone())?;
        if current == StackStatus::NotFound {
            tracing::info!(layer = self.name(), stack, "stack already absent");
            return Ok(());
        }
        let outcome = self
            .toolkit
            .stacks
            .api()
            .delete(stack)
            .await
            .with_context(|| operation.clone())?;
        if outcome.timed_out {
            return Err(LayerError::timeout(operation, self.settings.timing.command_timeout()));
        }
        if !outcome.success {
            return Err(LayerError::failed(operation, outcome.diagnostic()));
        }
        self.await_stack(stack, &[StackStatus::NotFound]).await
    }

    async fn await_stack(&self, stack: &str, targets: &[StackStatus]) -> Result<(), LayerError> {
        let policy = PollPolicy::stack_waits(&self.settings.timing);
        match self.toolkit.stacks.wait_for_status(stack, targets, policy).await {
            WaitOutcome::Reached(status) => {
                tracing::info!(layer = self.name(), stack, %status, "stack settled");
                Ok(())
            }
            WaitOutcome::Terminal(status) => Err(LayerError::failed(
                format!("stack {stack}"),
                format!("settled in {status}"),
            )),
            WaitOutcome::Timeout => Err(LayerError::timeout(
                format!("waiting for stack {stack}"),
                policy.timeout,
            )),
        }
    }

    /// Run a script from a materialized repository with an explicit working
    /// directory and environment.
    ///
    /// # Errors
    ///
    /// Returns [`LayerError::RemoteOperationTimeout`] if the script is killed
    /// at its deadline, [`LayerError::RemoteOperationFailed`] on a non-zero exit.
    pub async fn run_script(
        &self,
        workdir: &Path,
        script: &str,
        args: &[String],
        env: &BTreeMap<String, String>,
    ) -> Result<CommandOutcome, LayerError> {
        let timeout = self.settings.timing.command_timeout();
        let spec = CommandSpec::new("bash", std::iter::once(script.to_string()).chain(args.iter().cloned()))
            .in_dir(workdir)
            .envs(env)
            .timeout(timeout)
            .streamed();
        let operation = format!("script {script}");
        tracing::info!(layer = self.name(), command = %spec.display(), "running script");
        let outcome = self
            .toolkit
            .commands
            .run(&spec)
            .await
            .with_context(|| operation.clone())?;
        if outcome.timed_out {
            return Err(LayerError::timeout(operation, timeout));
        }
        if !outcome.success {
            return Err(LayerError::failed(operation, outcome.diagnostic()));
        }
        Ok(outcome)
    }

    /// Run shell commands on a remote instance and return their stdout.
    ///
    /// # Errors
    ///
    /// Returns [`LayerError::RemoteOperationTimeout`] if the command never
    /// settled, [`LayerError::RemoteOperationFailed`] if it failed or was
    /// cancelled.
    pub async fn run_remote(&self, script: &RemoteScript) -> Result<String, LayerError> {
        let operation = format!("remote command '{}' on {}", script.comment, script.instance_id);
        let outcome = self
            .toolkit
            .remote
            .run(script)
            .await
            .with_context(|| operation.clone())?;
        match outcome {
            PollOutcome::Success { stdout, .. } => Ok(stdout),
            PollOutcome::Failed { reason, .. } => Err(LayerError::failed(operation, reason)),
            PollOutcome::Cancelled { reason, .. } => {
                Err(LayerError::failed(operation, format!("cancelled: {reason}")))
            }
            PollOutcome::TimedOut { reason, .. } => {
                tracing::warn!(layer = self.name(), %reason, "remote command timed out");
                Err(LayerError::timeout(operation, self.toolkit.remote.ceiling()))
            }
        }
    }

    /// Probe every target concurrently, each under the same deadline.
    pub async fn probe_all(&self, targets: &[ProbeTarget]) -> ProbeSummary {
        let deadline = self.settings.timing.probe_timeout();
        let probes = targets.iter().map(|t| self.toolkit.health.probe(t, deadline));
        let outcomes = join_all(probes).await;
        ProbeSummary::new(targets, outcomes)
    }
}

/// Aggregated result of concurrent probes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeSummary {
    pub failures: Vec<String>,
}

impl ProbeSummary {
    fn new(targets: &[ProbeTarget], outcomes: Vec<HealthOutcome>) -> Self {
        let failures = targets
            .iter()
            .zip(outcomes)
            .filter(|(_, o)| !o.healthy)
            .map(|(t, o)| {
                format!(
                    "{}: {}",
                    t.url,
                    o.error.unwrap_or_else(|| "unhealthy".to_string())
                )
            })
            .collect();
        Self { failures }
    }

    #[must_use]
    pub fn all_healthy(&self) -> bool {
        self.failures.is_empty()
    }

    /// One-line description for verify reasons.
    #[must_use]
    pub fn describe(&self) -> String {
        if self.all_healthy() {
            "all probes healthy".to_string()
        } else {
            self.failures.join("; ")
        }
    }
}

// ── Destroy bookkeeping ───────────────────────────────────────────────────────

/// Collects sub-step failures during `destroy` so every step runs before the
/// layer reports.
#[derive(Debug)]
pub struct Teardown {
    layer: String,
    failures: Vec<String>,
}

impl Teardown {
    pub fn new(layer: impl Into<String>) -> Self {
        Self {
            layer: layer.into(),
            failures: Vec::new(),
        }
    }

    /// Record the result of one sub-step.
    pub fn record(&mut self, step: &str, result: Result<(), LayerError>) {
        if let Err(e) = result {
            tracing::warn!(layer = %self.layer, step, error = %e, "destroy step failed");
            self.failures.push(format!("{step}: {e}"));
        }
    }

    /// # Errors
    ///
    /// Returns [`LayerError::PartialDestroyFailure`] listing every failed step.
    pub fn finish(self) -> Result<(), LayerError> {
        if self.failures.is_empty() {
            Ok(())
        } else {
            Err(LayerError::PartialDestroyFailure {
                layer: self.layer,
                failures: self.failures,
            })
        }
    }
}

// ── Scratch space ─────────────────────────────────────────────────────────────

/// A per-layer scratch directory, removed on drop whatever the exit path.
#[derive(Debug)]
pub struct ScopedWorkdir {
    dir: TempDir,
}

impl ScopedWorkdir {
    /// Create `<root>/<layer>-XXXXXX`, creating `root` as needed.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory cannot be created.
    pub fn create(root: &Path, layer: &str) -> Result<Self, LayerError> {
        std::fs::create_dir_all(root)
            .with_context(|| format!("creating scratch root {}", root.display()))?;
        let dir = tempfile::Builder::new()
            .prefix(&format!("{layer}-"))
            .tempdir_in(root)
            .with_context(|| format!("creating scratch dir under {}", root.display()))?;
        Ok(Self { dir })
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        self.dir.path()
    }
}
