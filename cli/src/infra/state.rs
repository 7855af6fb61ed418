//! Infrastructure implementation of the `DeploymentStateStore` port.
//!
//! `JsonStateStore` provides async load/save using `tokio::task::spawn_blocking`
//! with atomic write (temp file + rename) so an interrupted save never leaves
//! a truncated document behind.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use async_trait::async_trait;
use strata_common::{DeploymentState, STATE_FORMAT_VERSION};

use crate::application::ports::DeploymentStateStore;

/// State document on local disk.
#[derive(Debug, Clone)]
pub struct JsonStateStore {
    path: PathBuf,
}

impl JsonStateStore {
    #[must_use]
    pub fn with_path(path: PathBuf) -> Self {
        Self { path }
    }

    fn load_sync(path: &Path) -> Result<Option<DeploymentState>> {
        if !path.exists() {
            return Ok(None);
        }
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("reading state file {}", path.display()))?;
        let state: DeploymentState = serde_json::from_str(&content)
            .with_context(|| format!("parsing state file {}", path.display()))?;
        if state.version > STATE_FORMAT_VERSION {
            anyhow::bail!(
                "state file {} has format version {}, this build understands up to {STATE_FORMAT_VERSION}",
                path.display(),
                state.version
            );
        }
        Ok(Some(state))
    }

    fn save_sync(path: &Path, state: &DeploymentState) -> Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("creating directory {}", parent.display()))?;
        }
        let content = serde_json::to_string_pretty(state).context("serializing state")?;

        let temp_path = path.with_extension("json.tmp");
        std::fs::write(&temp_path, &content)
            .with_context(|| format!("writing temp file {}", temp_path.display()))?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(&temp_path, std::fs::Permissions::from_mode(0o600))
                .with_context(|| format!("setting permissions on {}", temp_path.display()))?;
        }

        std::fs::rename(&temp_path, path)
            .with_context(|| format!("finalizing state file {}", path.display()))?;
        Ok(())
    }
}

#[async_trait]
impl DeploymentStateStore for JsonStateStore {
    async fn load(&self) -> Result<Option<DeploymentState>> {
        let path = self.path.clone();
        tokio::task::spawn_blocking(move || Self::load_sync(&path))
            .await
            .context("state load task panicked")?
    }

    async fn save(&self, state: &DeploymentState) -> Result<()> {
        let path = self.path.clone();
        let state = state.clone();
        tokio::task::spawn_blocking(move || Self::save_sync(&path, &state))
            .await
            .context("state save task panicked")?
    }

    fn location(&self) -> &Path {
        &self.path
    }
}
