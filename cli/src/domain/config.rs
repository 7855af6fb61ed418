//! Domain types and validators for the strata configuration file.
//!
//! Pure functions only. Nothing here performs I/O.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use strata_common::LayerGraph;

use crate::domain::error::ConfigError;

// ── Config schema ────────────────────────────────────────────────────────────

/// Top-level configuration stored in `strata.yaml`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StrataConfig {
    pub settings: RunSettings,
    #[serde(default)]
    pub layers: LayerGraph,
}

/// Process-wide settings. Immutable for the duration of a run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunSettings {
    /// Environment name; prefixes every stack this run manages.
    pub environment: String,
    /// Credential profile handed to the provider CLI.
    #[serde(default = "default_profile")]
    pub profile: String,
    pub region: String,
    /// Root for materialized repositories, scratch space and the default
    /// state file.
    #[serde(default = "default_workspace")]
    pub workspace: PathBuf,
    #[serde(default)]
    pub continue_on_error: bool,
    /// Repository holding the infrastructure templates.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub infra_repo: Option<RepoRef>,
    #[serde(default)]
    pub timing: Timing,
}

/// A remote repository at a branch or revision.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepoRef {
    pub url: String,
    #[serde(default = "default_branch")]
    pub branch: String,
}

/// Per-operation wait policies.
///
/// Different remote operations settle at very different speeds, so each has
/// its own interval and ceiling.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Timing {
    pub command_timeout_secs: u64,
    pub stack_wait_timeout_secs: u64,
    pub stack_poll_interval_secs: u64,
    pub output_read_attempts: u32,
    pub output_read_backoff_secs: u64,
    pub remote_command_interval_secs: u64,
    pub remote_command_max_attempts: u32,
    pub probe_timeout_secs: u64,
}

impl Default for Timing {
    fn default() -> Self {
        Self {
            command_timeout_secs: 1800,
            stack_wait_timeout_secs: 2700,
            stack_poll_interval_secs: 15,
            output_read_attempts: 5,
            output_read_backoff_secs: 3,
            remote_command_interval_secs: 5,
            remote_command_max_attempts: 120,
            probe_timeout_secs: 10,
        }
    }
}

impl Timing {
    #[must_use]
    pub fn command_timeout(&self) -> Duration {
        Duration::from_secs(self.command_timeout_secs)
    }

    #[must_use]
    pub fn stack_wait_timeout(&self) -> Duration {
        Duration::from_secs(self.stack_wait_timeout_secs)
    }

    #[must_use]
    pub fn stack_poll_interval(&self) -> Duration {
        Duration::from_secs(self.stack_poll_interval_secs)
    }

    #[must_use]
    pub fn output_read_backoff(&self) -> Duration {
        Duration::from_secs(self.output_read_backoff_secs)
    }

    #[must_use]
    pub fn remote_command_interval(&self) -> Duration {
        Duration::from_secs(self.remote_command_interval_secs)
    }

    #[must_use]
    pub fn probe_timeout(&self) -> Duration {
        Duration::from_secs(self.probe_timeout_secs)
    }
}

fn default_profile() -> String {
    "default".to_string()
}

fn default_workspace() -> PathBuf {
    PathBuf::from(".strata")
}

fn default_branch() -> String {
    "main".to_string()
}

impl RunSettings {
    /// Stack name for a layer: `<environment>-<layer>`.
    #[must_use]
    pub fn stack_name(&self, layer: &str) -> String {
        format!("{}-{layer}", self.environment)
    }

    /// Default state document location.
    #[must_use]
    pub fn default_state_path(&self) -> PathBuf {
        self.workspace.join("state.json")
    }

    /// Directory repositories are materialized into.
    #[must_use]
    pub fn repos_dir(&self) -> PathBuf {
        self.workspace.join("repos")
    }

    /// Directory per-layer scratch space is created under.
    #[must_use]
    pub fn scratch_dir(&self) -> PathBuf {
        self.workspace.join("scratch")
    }
}

// ── Validators ───────────────────────────────────────────────────────────────

/// Parse and validate a YAML configuration document.
///
/// # Errors
///
/// Returns [`ConfigError::Invalid`] if the document does not parse or fails
/// validation.
pub fn parse_config(yaml: &str) -> Result<StrataConfig, ConfigError> {
    let config: StrataConfig =
        serde_yaml::from_str(yaml).map_err(|e| ConfigError::Invalid(e.to_string()))?;
    validate_settings(&config.settings)?;
    Ok(config)
}

/// Longest accepted duration for any single timing setting (one week).
pub const MAX_TIMING_SECS: u64 = 7 * 24 * 60 * 60;

/// Highest accepted attempt ceiling.
pub const MAX_ATTEMPTS: u32 = 10_000;

/// Validate run settings.
///
/// # Errors
///
/// Returns [`ConfigError::Invalid`] describing the first problem found.
pub fn validate_settings(settings: &RunSettings) -> Result<(), ConfigError> {
    validate_environment(&settings.environment)?;
    if settings.region.trim().is_empty() {
        return Err(ConfigError::Invalid("settings.region must not be empty".into()));
    }
    let t = &settings.timing;
    if t.stack_poll_interval_secs == 0 || t.remote_command_interval_secs == 0 {
        return Err(ConfigError::Invalid(
            "poll intervals must be at least one second".into(),
        ));
    }
    if t.output_read_attempts == 0 || t.remote_command_max_attempts == 0 {
        return Err(ConfigError::Invalid("attempt ceilings must be at least 1".into()));
    }
    let durations = [
        ("command_timeout_secs", t.command_timeout_secs),
        ("stack_wait_timeout_secs", t.stack_wait_timeout_secs),
        ("stack_poll_interval_secs", t.stack_poll_interval_secs),
        ("output_read_backoff_secs", t.output_read_backoff_secs),
        ("remote_command_interval_secs", t.remote_command_interval_secs),
        ("probe_timeout_secs", t.probe_timeout_secs),
    ];
    if let Some((key, value)) = durations.iter().find(|(_, v)| *v > MAX_TIMING_SECS) {
        return Err(ConfigError::Invalid(format!(
            "timing.{key} is {value}, the maximum is {MAX_TIMING_SECS}"
        )));
    }
    let attempts = [
        ("output_read_attempts", t.output_read_attempts),
        ("remote_command_max_attempts", t.remote_command_max_attempts),
    ];
    if let Some((key, value)) = attempts.iter().find(|(_, v)| *v > MAX_ATTEMPTS) {
        return Err(ConfigError::Invalid(format!(
            "timing.{key} is {value}, the maximum is {MAX_ATTEMPTS}"
        )));
    }
    Ok(())
}

/// Environment names become stack name prefixes: start with a letter, then
/// letters, digits, or hyphens, at most 32 characters.
///
/// # Errors
///
/// Returns [`ConfigError::Invalid`] if the name is unusable as a prefix.
pub fn validate_environment(name: &str) -> Result<(), ConfigError> {
    let valid = !name.is_empty()
        && name.len() <= 32
        && name.starts_with(|c: char| c.is_ascii_alphabetic())
        && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '-');
    if valid {
        Ok(())
    } else {
        Err(ConfigError::Invalid(format!(
            "environment '{name}' must start with a letter and contain only letters, digits and '-' (max 32)"
        )))
    }
}

// ── Unit tests ───────────────────────────────────────────────────────────────
