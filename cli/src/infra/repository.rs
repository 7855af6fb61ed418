//! Infrastructure implementation of the `RepositoryMaterializer` port.
//!
//! Repositories are shallow-cloned once under the workspace and fast-forwarded
//! to the configured branch on every later call.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;

use crate::application::ports::{CommandRunner, CommandSpec, RepositoryMaterializer};
use crate::domain::RepoRef;

/// Timeout for a clone or fetch.
pub const GIT_TIMEOUT: Duration = Duration::from_secs(600);

/// Git checkouts under one root directory, driven through the `git` CLI.
pub struct GitRepositories<R: CommandRunner + ?Sized> {
    runner: Arc<R>,
    root: PathBuf,
}

impl<R: CommandRunner + ?Sized> GitRepositories<R> {
    pub fn new(runner: Arc<R>, root: PathBuf) -> Self {
        Self { runner, root }
    }

    async fn git(&self, args: &[&str], dir: &Path) -> Result<()> {
        let spec = CommandSpec::new("git", args.iter().copied())
            .in_dir(dir)
            .env("GIT_TERMINAL_PROMPT", "0")
            .timeout(GIT_TIMEOUT);
        let outcome = self.runner.run(&spec).await?;
        if outcome.timed_out {
            anyhow::bail!("{} timed out after {}s", spec.display(), GIT_TIMEOUT.as_secs());
        }
        if !outcome.success {
            anyhow::bail!("{} failed: {}", spec.display(), outcome.diagnostic());
        }
        Ok(())
    }
}

/// Local directory name for a repository URL: the last path segment without
/// `.git`, restricted to filename-safe characters.
#[must_use]
pub fn checkout_name(url: &str) -> String {
    let last = url
        .trim_end_matches('/')
        .rsplit(['/', ':'])
        .next()
        .unwrap_or_default();
    let name: String = last
        .trim_end_matches(".git")
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' || c == '.' {
                c
            } else {
                '_'
            }
        })
        .collect();
    if name.is_empty() || name.chars().all(|c| c == '.') {
        "repo".to_string()
    } else {
        name
    }
}

#[async_trait]
impl<R: CommandRunner + ?Sized> RepositoryMaterializer for GitRepositories<R> {
    async fn ensure(&self, repo: &RepoRef) -> Result<PathBuf> {
        let dir = self.root.join(checkout_name(&repo.url));
        if tokio::fs::try_exists(dir.join(".git")).await.unwrap_or(false) {
            tracing::info!(url = %repo.url, branch = %repo.branch, dir = %dir.display(), "updating repository");
            self.git(&["fetch", "--depth", "1", "origin", &repo.branch], &dir)
                .await?;
            self.git(&["reset", "--hard", "FETCH_HEAD"], &dir).await?;
        } else {
            tracing::info!(url = %repo.url, branch = %repo.branch, dir = %dir.display(), "cloning repository");
            tokio::fs::create_dir_all(&self.root)
                .await
                .with_context(|| format!("creating {}", self.root.display()))?;
            let target = dir.display().to_string();
            self.git(
                &["clone", "--depth", "1", "--branch", &repo.branch, &repo.url, &target],
                &self.root,
            )
            .await?;
        }
        Ok(dir)
    }

    async fn existing(&self, repo: &RepoRef) -> Option<PathBuf> {
        let dir = self.root.join(checkout_name(&repo.url));
        tokio::fs::try_exists(dir.join(".git"))
            .await
            .unwrap_or(false)
            .then_some(dir)
    }
}
