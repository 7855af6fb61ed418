//! `RemoteCommandApi` over `aws ssm`.

use std::sync::Arc;

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::Deserialize;

use super::{AwsCli, AwsScope};
use crate::application::ports::{CommandRunner, RemoteCommandApi, RemoteCommandOutput, RemoteScript};
use crate::domain::RemoteCommandStatus;

const DOCUMENT: &str = "AWS-RunShellScript";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct SendCommand {
    command: CommandRecord,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct CommandRecord {
    command_id: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct Invocation {
    status: String,
    #[serde(default)]
    standard_output_content: String,
    #[serde(default)]
    standard_error_content: String,
}

/// Remote shell commands through Systems Manager, driven by the `aws` CLI.
pub struct AwsSsm<R: CommandRunner + ?Sized> {
    cli: AwsCli<R>,
}

impl<R: CommandRunner + ?Sized> AwsSsm<R> {
    pub fn new(runner: Arc<R>, scope: AwsScope) -> Self {
        Self {
            cli: AwsCli { runner, scope },
        }
    }

    /// `None` while the invocation is not yet registered.
    async fn invocation(&self, command_id: &str, instance_id: &str) -> Result<Option<Invocation>> {
        let spec = self.cli.scope.command(
            "ssm",
            "get-command-invocation",
            ["--command-id", command_id, "--instance-id", instance_id],
        );
        let outcome = self.cli.runner.run(&spec).await?;
        if !outcome.success {
            if outcome.stderr.contains("InvocationDoesNotExist") {
                return Ok(None);
            }
            anyhow::bail!("get-command-invocation {command_id}: {}", outcome.diagnostic());
        }
        let invocation = serde_json::from_str(&outcome.stdout)
            .context("parsing get-command-invocation output")?;
        Ok(Some(invocation))
    }
}

#[async_trait]
impl<R: CommandRunner + ?Sized> RemoteCommandApi for AwsSsm<R> {
    async fn submit(&self, script: &RemoteScript) -> Result<String> {
        let parameters = serde_json::json!({ "commands": script.commands }).to_string();
        let mut comment: String = script.comment.chars().take(100).collect();
        if comment.is_empty() {
            comment.push_str("strata");
        }
        let spec = self.cli.scope.command(
            "ssm",
            "send-command",
            [
                "--instance-ids",
                script.instance_id.as_str(),
                "--document-name",
                DOCUMENT,
                "--comment",
                comment.as_str(),
                "--parameters",
                parameters.as_str(),
            ],
        );
        let outcome = self.cli.runner.run(&spec).await?;
        if !outcome.success {
            anyhow::bail!("send-command to {}: {}", script.instance_id, outcome.diagnostic());
        }
        let sent: SendCommand =
            serde_json::from_str(&outcome.stdout).context("parsing send-command output")?;
        Ok(sent.command.command_id)
    }

    async fn status(&self, command_id: &str, instance_id: &str) -> Result<RemoteCommandStatus> {
        Ok(self
            .invocation(command_id, instance_id)
            .await?
            .map_or(RemoteCommandStatus::Pending, |i| {
                RemoteCommandStatus::parse(&i.status)
            }))
    }

    async fn output(&self, command_id: &str, instance_id: &str) -> Result<RemoteCommandOutput> {
        Ok(self
            .invocation(command_id, instance_id)
            .await?
            .map(|i| RemoteCommandOutput {
                stdout: i.standard_output_content,
                stderr: i.standard_error_content,
            })
            .unwrap_or_default())
    }
}
