//! `StackApi` over `aws cloudformation`.

use std::collections::BTreeMap;
use std::sync::Arc;

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::Deserialize;

use super::{AwsCli, AwsScope};
use crate::application::ports::{
    CommandOutcome, CommandRunner, StackApi, StackDeployRequest, StackDescription,
};
use crate::domain::StackStatus;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct DescribeStacks {
    #[serde(default)]
    stacks: Vec<StackRecord>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct StackRecord {
    stack_status: String,
    #[serde(default)]
    outputs: Vec<OutputRecord>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct OutputRecord {
    output_key: String,
    #[serde(default)]
    output_value: String,
}

/// Parse `describe-stacks` output.
fn parse_description(json: &str) -> Result<StackDescription> {
    let parsed: DescribeStacks =
        serde_json::from_str(json).context("parsing describe-stacks output")?;
    let Some(stack) = parsed.stacks.into_iter().next() else {
        return Ok(StackDescription::not_found());
    };
    let outputs: BTreeMap<String, String> = stack
        .outputs
        .into_iter()
        .map(|o| (o.output_key, o.output_value))
        .collect();
    Ok(StackDescription {
        status: StackStatus::parse(&stack.stack_status),
        outputs,
    })
}

/// CloudFormation stacks driven through the `aws` CLI.
pub struct AwsCloudFormation<R: CommandRunner + ?Sized> {
    cli: AwsCli<R>,
}

impl<R: CommandRunner + ?Sized> AwsCloudFormation<R> {
    pub fn new(runner: Arc<R>, scope: AwsScope) -> Self {
        Self {
            cli: AwsCli { runner, scope },
        }
    }
}

#[async_trait]
impl<R: CommandRunner + ?Sized> StackApi for AwsCloudFormation<R> {
    async fn describe(&self, stack_name: &str) -> Result<StackDescription> {
        let spec = self
            .cli
            .scope
            .command("cloudformation", "describe-stacks", ["--stack-name", stack_name]);
        let outcome = self.cli.runner.run(&spec).await?;
        if outcome.success {
            return parse_description(&outcome.stdout);
        }
        if outcome.stderr.contains("does not exist") {
            return Ok(StackDescription::not_found());
        }
        anyhow::bail!("describe-stacks {stack_name}: {}", outcome.diagnostic())
    }

    async fn deploy(&self, request: &StackDeployRequest) -> Result<CommandOutcome> {
        let mut args = vec![
            "--stack-name".to_string(),
            request.stack_name.clone(),
            "--template-file".to_string(),
            request.template.display().to_string(),
            "--no-fail-on-empty-changeset".to_string(),
            "--capabilities".to_string(),
            "CAPABILITY_IAM".to_string(),
            "CAPABILITY_NAMED_IAM".to_string(),
        ];
        if !request.parameters.is_empty() {
            args.push("--parameter-overrides".to_string());
            args.extend(request.parameters.iter().map(|(k, v)| format!("{k}={v}")));
        }
        let spec = self
            .cli
            .scope
            .command("cloudformation", "deploy", args)
            .in_dir(&request.working_dir)
            .timeout(request.timeout)
            .streamed();
        self.cli.runner.run(&spec).await
    }

    async fn delete(&self, stack_name: &str) -> Result<CommandOutcome> {
        let spec = self
            .cli
            .scope
            .command("cloudformation", "delete-stack", ["--stack-name", stack_name]);
        self.cli.runner.run(&spec).await
    }
}
