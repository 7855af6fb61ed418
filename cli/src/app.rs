//! Application context: the state every command handler receives.
//!
//! `AppContext` owns output settings, the resolved file locations, and the
//! production wiring of every port. Adding a new cross-cutting concern
//! requires only one field change here, not in any command signature.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;

use crate::application::ports::{CommandRunner, ConfigSource};
use crate::application::services::{CommandPoller, RetryPolicy, StackReader, Toolkit};
use crate::domain::{RunSettings, StrataConfig};
use crate::infra::aws::{AwsCloudFormation, AwsScope, AwsSsm};
use crate::infra::command_runner::TokioCommandRunner;
use crate::infra::config::{DEFAULT_CONFIG_FILE, YamlConfigFile};
use crate::infra::health::HttpHealthChecker;
use crate::infra::repository::GitRepositories;
use crate::infra::state::JsonStateStore;
use crate::output::{OutputContext, TerminalReporter};

/// Output rendering mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputMode {
    /// Human-readable terminal output (default).
    Human,
    /// Machine-readable JSON output.
    Json,
}

/// Output rendering flags.
pub struct OutputFlags {
    /// Disable ANSI color output.
    pub no_color: bool,
    /// Suppress non-error output.
    pub quiet: bool,
    /// Enable JSON output mode.
    pub json: bool,
    /// Log verbosely; disables spinners so log lines stay readable.
    pub verbose: bool,
}

/// File locations.
pub struct PathFlags {
    /// Configuration file (defaults to `./strata.yaml`).
    pub config: Option<PathBuf>,
    /// State document (defaults to `<workspace>/state.json`).
    pub state: Option<PathBuf>,
}

/// Flags passed from the top-level CLI to `AppContext::new`.
pub struct AppFlags {
    pub output: OutputFlags,
    pub paths: PathFlags,
    /// Skip interactive prompts (also set by `CI` / `STRATA_YES` env vars).
    pub yes: bool,
}

/// Unified application context passed to every command handler.
pub struct AppContext {
    /// Terminal output context (colors, quiet mode).
    pub output: OutputContext,
    /// Output rendering mode (human vs JSON).
    pub mode: OutputMode,
    /// When `true`, skip interactive prompts and use defaults.
    pub non_interactive: bool,
    verbose: bool,
    config_path: PathBuf,
    state_path: Option<PathBuf>,
}

impl AppContext {
    /// Construct an `AppContext` from top-level CLI flags.
    #[must_use]
    pub fn new(flags: AppFlags) -> Self {
        let ci_env = std::env::var("CI").is_ok() || std::env::var("STRATA_YES").is_ok();
        let mode = if flags.output.json {
            OutputMode::Json
        } else {
            OutputMode::Human
        };
        // JSON goes to stdout; human chatter would corrupt it.
        let quiet = flags.output.quiet || flags.output.json;
        Self {
            output: OutputContext::new(flags.output.no_color, quiet),
            mode,
            non_interactive: flags.yes || ci_env,
            verbose: flags.output.verbose,
            config_path: flags
                .paths
                .config
                .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE)),
            state_path: flags.paths.state,
        }
    }

    /// Returns `true` when JSON output mode is active.
    #[must_use]
    pub fn is_json(&self) -> bool {
        self.mode == OutputMode::Json
    }

    /// Load and validate the configuration file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file is unreadable or invalid.
    pub fn load_config(&self) -> Result<StrataConfig> {
        YamlConfigFile::new(self.config_path.clone()).load()
    }

    /// The state store for `settings`, honouring `--state`.
    #[must_use]
    pub fn state_store(&self, settings: &RunSettings) -> JsonStateStore {
        JsonStateStore::with_path(
            self.state_path
                .clone()
                .unwrap_or_else(|| settings.default_state_path()),
        )
    }

    /// The state store for read-only commands: `--state` if given, otherwise
    /// the location the configuration implies.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration must be read and cannot be.
    pub fn recorded_state(&self) -> Result<JsonStateStore> {
        match &self.state_path {
            Some(path) => Ok(JsonStateStore::with_path(path.clone())),
            None => Ok(self.state_store(&self.load_config()?.settings)),
        }
    }

    /// Progress reporter for long-running commands.
    #[must_use]
    pub fn reporter(&self) -> TerminalReporter<'_> {
        TerminalReporter::new(&self.output, !self.verbose)
    }

    /// Production wiring of the shared layer toolkit.
    #[must_use]
    pub fn toolkit(&self, settings: &RunSettings) -> Toolkit {
        let runner: Arc<dyn CommandRunner> = Arc::new(TokioCommandRunner::new());
        let scope = AwsScope::from_settings(settings);
        let timing = &settings.timing;
        Toolkit {
            commands: runner.clone(),
            stacks: StackReader::new(
                Arc::new(AwsCloudFormation::new(runner.clone(), scope.clone())),
                RetryPolicy::output_reads(timing),
            ),
            remote: CommandPoller::from_timing(Arc::new(AwsSsm::new(runner.clone(), scope)), timing),
            health: Arc::new(HttpHealthChecker::new()),
            repos: Arc::new(GitRepositories::new(runner, settings.repos_dir())),
        }
    }

    /// Ask the user for confirmation.
    ///
    /// When `non_interactive` is `true` (CI, `--yes` flag, or `STRATA_YES` env),
    /// returns `default` immediately without prompting.
    ///
    /// # Errors
    ///
    /// Returns an error if the terminal prompt fails (e.g. no TTY available).
    pub fn confirm(&self, prompt: &str, default: bool) -> Result<bool> {
        if self.non_interactive {
            return Ok(default);
        }
        let confirmed = dialoguer::Confirm::new()
            .with_prompt(prompt)
            .default(default)
            .interact()?;
        Ok(confirmed)
    }
}
