//! Port trait definitions for the Application layer.
//!
//! Ports are the interfaces (contracts) that infrastructure must fulfill.
//! This file imports only from `crate::domain`, never from `crate::infra`,
//! `crate::commands`, or `crate::output`.
//!
//! Ports are object-safe (`async_trait`) because layer variants hold them as
//! shared `Arc<dyn …>` handles.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use strata_common::DeploymentState;

use crate::domain::{RemoteCommandStatus, RepoRef, StackStatus, StrataConfig};

// ── Value Types ───────────────────────────────────────────────────────────────

/// A fully described external program invocation.
///
/// The working directory is always explicit; nothing relies on the process
/// current directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandSpec {
    pub program: String,
    pub args: Vec<String>,
    pub working_dir: Option<PathBuf>,
    pub env: BTreeMap<String, String>,
    /// Hard wall-clock limit. The process is killed when it expires.
    pub timeout: Duration,
    /// Forward output lines to the log as they arrive.
    pub stream_output: bool,
}

impl CommandSpec {
    /// Default hard limit for commands that do not set one.
    pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

    pub fn new<I, S>(program: impl Into<String>, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            program: program.into(),
            args: args.into_iter().map(Into::into).collect(),
            working_dir: None,
            env: BTreeMap::new(),
            timeout: Self::DEFAULT_TIMEOUT,
            stream_output: false,
        }
    }

    #[must_use]
    pub fn in_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_dir = Some(dir.into());
        self
    }

    #[must_use]
    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.insert(key.into(), value.into());
        self
    }

    #[must_use]
    pub fn envs(mut self, vars: &BTreeMap<String, String>) -> Self {
        self.env
            .extend(vars.iter().map(|(k, v)| (k.clone(), v.clone())));
        self
    }

    #[must_use]
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    #[must_use]
    pub fn streamed(mut self) -> Self {
        self.stream_output = true;
        self
    }

    /// `program arg1 arg2 …` for logs and error messages.
    #[must_use]
    pub fn display(&self) -> String {
        std::iter::once(self.program.as_str())
            .chain(self.args.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// Captured result of a finished (or killed) program.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandOutcome {
    pub success: bool,
    pub stdout: String,
    pub stderr: String,
    /// `None` when the process was killed or terminated by a signal.
    pub exit_code: Option<i32>,
    pub duration: Duration,
    /// The hard timeout fired and the process was killed.
    pub timed_out: bool,
}

impl CommandOutcome {
    /// Best available failure text: stderr, else the tail of stdout.
    #[must_use]
    pub fn diagnostic(&self) -> String {
        let stderr = self.stderr.trim();
        if !stderr.is_empty() {
            return stderr.to_string();
        }
        let stdout = self.stdout.trim();
        let tail: Vec<&str> = stdout.lines().rev().take(20).collect();
        if tail.is_empty() {
            match self.exit_code {
                Some(code) => format!("exit code {code}"),
                None => "terminated without exit code".to_string(),
            }
        } else {
            tail.into_iter().rev().collect::<Vec<_>>().join("\n")
        }
    }
}

/// A remote stack's status and published outputs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StackDescription {
    pub status: StackStatus,
    pub outputs: BTreeMap<String, String>,
}

impl StackDescription {
    #[must_use]
    pub fn not_found() -> Self {
        Self {
            status: StackStatus::NotFound,
            outputs: BTreeMap::new(),
        }
    }
}

/// Request to create or update a stack from a template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StackDeployRequest {
    pub stack_name: String,
    /// Template path, relative to `working_dir`.
    pub template: PathBuf,
    pub parameters: BTreeMap<String, String>,
    pub working_dir: PathBuf,
    pub timeout: Duration,
}

/// Shape of a health probe.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProbeKind {
    /// A successful HTTP response within the deadline.
    Reachability,
    /// JSON-RPC `method` must answer with `expected` (e.g. a chain id).
    Rpc { method: String, expected: String },
    /// The probe URL must be reachable AND the JSON-RPC endpoint `rpc_url`
    /// must report `expected` for `method`, where `expected` is the identity
    /// another system published.
    Composite {
        rpc_url: String,
        method: String,
        expected: String,
    },
}

/// A single endpoint to probe.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeTarget {
    pub url: String,
    pub kind: ProbeKind,
}

impl ProbeTarget {
    pub fn reachability(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            kind: ProbeKind::Reachability,
        }
    }

    pub fn rpc(url: impl Into<String>, method: impl Into<String>, expected: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            kind: ProbeKind::Rpc {
                method: method.into(),
                expected: expected.into(),
            },
        }
    }
}

/// Result of a single health probe.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HealthOutcome {
    pub healthy: bool,
    pub response_time: Option<Duration>,
    pub error: Option<String>,
}

impl HealthOutcome {
    #[must_use]
    pub fn healthy(response_time: Duration) -> Self {
        Self {
            healthy: true,
            response_time: Some(response_time),
            error: None,
        }
    }

    pub fn unhealthy(error: impl Into<String>) -> Self {
        Self {
            healthy: false,
            response_time: None,
            error: Some(error.into()),
        }
    }
}

/// Shell commands to run asynchronously on a remote instance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteScript {
    pub instance_id: String,
    pub commands: Vec<String>,
    pub comment: String,
}

/// Output captured from a remote command.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RemoteCommandOutput {
    pub stdout: String,
    pub stderr: String,
}

// ── Command Runner Port ───────────────────────────────────────────────────────

/// Abstracts process execution so infrastructure can be swapped or mocked.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CommandRunner: Send + Sync {
    /// Run a program to completion or until its timeout.
    ///
    /// A timeout is reported as an outcome with `timed_out = true`, not as an
    /// error; the child must be killed, not left orphaned.
    ///
    /// # Errors
    ///
    /// Returns an error only if the process cannot be spawned or waited on.
    async fn run(&self, spec: &CommandSpec) -> Result<CommandOutcome>;
}

// ── Remote Provider Ports ─────────────────────────────────────────────────────

/// Single-shot operations on named remote stacks. Retries and waiting are
/// layered on top by the application.
#[async_trait]
pub trait StackApi: Send + Sync {
    /// Current status and outputs. A missing stack is `StackStatus::NotFound`,
    /// not an error.
    async fn describe(&self, stack_name: &str) -> Result<StackDescription>;
    /// Submit a create-or-update. Returns once the provider CLI exits.
    async fn deploy(&self, request: &StackDeployRequest) -> Result<CommandOutcome>;
    /// Submit a delete. Completion is observed with `describe`.
    async fn delete(&self, stack_name: &str) -> Result<CommandOutcome>;
}

/// Asynchronous remote command execution, observed by polling.
#[async_trait]
pub trait RemoteCommandApi: Send + Sync {
    /// Submit `script`; returns the operation identifier.
    async fn submit(&self, script: &RemoteScript) -> Result<String>;
    /// Current status of a submitted command on `instance_id`.
    async fn status(&self, command_id: &str, instance_id: &str) -> Result<RemoteCommandStatus>;
    /// Captured output of a submitted command.
    async fn output(&self, command_id: &str, instance_id: &str) -> Result<RemoteCommandOutput>;
}

// ── Health Port ───────────────────────────────────────────────────────────────

/// Single-attempt health probing. Never errors for connectivity problems;
/// those come back as `healthy = false` with diagnostic text.
#[async_trait]
pub trait HealthProbe: Send + Sync {
    async fn probe(&self, target: &ProbeTarget, deadline: Duration) -> HealthOutcome;
}

// ── Repository Port ───────────────────────────────────────────────────────────

/// Idempotent clone-or-update of a remote source tree.
#[async_trait]
pub trait RepositoryMaterializer: Send + Sync {
    /// Ensure `repo` is present locally at its branch; returns the local path.
    async fn ensure(&self, repo: &RepoRef) -> Result<PathBuf>;

    /// The local path of an existing checkout of `repo`, without touching
    /// the network or the working tree.
    async fn existing(&self, repo: &RepoRef) -> Option<PathBuf>;
}

// ── Progress Reporting Port ───────────────────────────────────────────────────

/// Abstracts progress reporting so services can emit events without
/// depending on the Presentation layer. Synchronous.
pub trait ProgressReporter: Send + Sync {
    /// Emit an in-progress step message.
    fn step(&self, message: &str);
    /// Emit a success message.
    fn success(&self, message: &str);
    /// Emit a warning message.
    fn warn(&self, message: &str);
}

// ── State and Config Ports ────────────────────────────────────────────────────

/// Abstracts deployment state persistence (load/save).
#[async_trait]
pub trait DeploymentStateStore: Send + Sync {
    /// Load the persisted document, returning `None` if none exists.
    async fn load(&self) -> Result<Option<DeploymentState>>;
    /// Persist the given document, replacing any previous one.
    async fn save(&self, state: &DeploymentState) -> Result<()>;
    /// Where the document lives, for messages.
    fn location(&self) -> &Path;
}

/// Abstracts loading the layer graph and run settings.
pub trait ConfigSource {
    /// Load and validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the source is unreadable or invalid.
    fn load(&self) -> Result<StrataConfig>;
}
