//! Signing infrastructure: a stack with one instance, bootstrapped by a
//! remote command. The signer's address only exists on the instance, so it
//! is read back with a read-only remote command.

use std::collections::BTreeMap;
use std::sync::LazyLock;

use async_trait::async_trait;
use regex::Regex;
use serde::Deserialize;
use strata_common::LayerOutput;

use super::{StackLayer, StackSettings, drift, join_url, params};
use crate::application::ports::{ProbeTarget, RemoteScript};
use crate::application::services::lifecycle::{Layer, LayerContext, Teardown};
use crate::domain::{ConfigError, LayerError, OutputContract, VerifyOutcome};

const CONTRACT: OutputContract = OutputContract {
    required: &["SignerEndpoint", "SignerAddress", "InstanceId"],
    optional: &[],
};

static ADDRESS_RE: LazyLock<Regex> = LazyLock::new(|| {
    #[allow(clippy::expect_used)]
    Regex::new(r"0x[0-9a-fA-F]{40}").expect("valid regex")
});

#[derive(Debug, Deserialize)]
#[serde(default)]
struct SignerConfig {
    #[serde(flatten)]
    stack: StackSettings,
    network_layer: String,
    /// Commands run on the instance after every stack deploy.
    bootstrap: Vec<String>,
    /// Read-only command that prints the signer address.
    address_command: String,
    /// Commands run on the instance before the stack is deleted.
    teardown: Vec<String>,
    health_path: String,
}

impl Default for SignerConfig {
    fn default() -> Self {
        Self {
            stack: StackSettings::default(),
            network_layer: "network".to_string(),
            bootstrap: vec!["sudo /opt/signer/bootstrap.sh".to_string()],
            address_command: "cat /etc/signer/address".to_string(),
            teardown: vec!["sudo /opt/signer/teardown.sh".to_string()],
            health_path: "/health".to_string(),
        }
    }
}

pub struct SignerLayer {
    stack: StackLayer,
    config: SignerConfig,
}

/// First address-shaped token in `text`.
fn parse_address(text: &str) -> Option<String> {
    ADDRESS_RE.find(text).map(|m| m.as_str().to_string())
}

impl SignerLayer {
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidLayerConfig`] if the config block is
    /// malformed or the bootstrap command list is empty.
    pub fn new(ctx: LayerContext) -> Result<Self, ConfigError> {
        let config: SignerConfig = ctx.config()?;
        if config.bootstrap.is_empty() {
            return Err(ConfigError::InvalidLayerConfig {
                layer: ctx.name().to_string(),
                message: "bootstrap must list at least one command".into(),
            });
        }
        Ok(Self {
            stack: StackLayer::new(ctx, config.stack.clone()),
            config,
        })
    }

    fn script(&self, instance_id: &str, commands: &[String], comment: &str) -> RemoteScript {
        RemoteScript {
            instance_id: instance_id.to_string(),
            commands: commands.to_vec(),
            comment: format!("{} {comment}", self.stack.stack_name()),
        }
    }

    async fn read_address(&self, instance_id: &str) -> Result<String, LayerError> {
        let stdout = self
            .stack
            .ctx
            .run_remote(&self.script(
                instance_id,
                std::slice::from_ref(&self.config.address_command),
                "read address",
            ))
            .await?;
        parse_address(&stdout).ok_or_else(|| {
            LayerError::failed(
                format!("read signer address on {instance_id}"),
                "command printed no address",
            )
        })
    }

    /// Stack outputs plus the on-instance address when it can be read.
    async fn collect(&self, mut raw: BTreeMap<String, String>) -> BTreeMap<String, String> {
        if let Some(instance_id) = raw.get("InstanceId").cloned() {
            match self.read_address(&instance_id).await {
                Ok(address) => {
                    raw.insert("SignerAddress".to_string(), address);
                }
                Err(e) => tracing::warn!(layer = self.name(), error = %e, "signer address unavailable"),
            }
        }
        raw
    }
}

#[async_trait]
impl Layer for SignerLayer {
    fn name(&self) -> &str {
        self.stack.name()
    }

    fn contract(&self) -> OutputContract {
        CONTRACT
    }

    async fn verify(&self) -> Result<VerifyOutcome, LayerError> {
        let vpc = self.stack.ctx.require(&self.config.network_layer, "VpcId")?;
        let Some(raw) = self.stack.healthy_outputs().await else {
            return Ok(VerifyOutcome::deploy("signer stack missing or unhealthy"));
        };
        if let Some(reason) = drift(&raw, &[("VpcId", &vpc)]) {
            return Ok(VerifyOutcome::deploy(reason));
        }
        let Some(endpoint) = raw.get("SignerEndpoint").cloned() else {
            return Ok(VerifyOutcome::deploy("signer stack publishes no endpoint"));
        };
        let probes = self
            .stack
            .ctx
            .probe_all(&[ProbeTarget::reachability(join_url(&endpoint, &self.config.health_path))])
            .await;
        if !probes.all_healthy() {
            return Ok(VerifyOutcome::deploy(format!("signer unhealthy: {}", probes.describe())));
        }
        match CONTRACT.publish(self.name(), &self.collect(raw).await) {
            Ok(output) => Ok(VerifyOutcome::skip("signer healthy and bootstrapped", output)),
            Err(e) => Ok(VerifyOutcome::deploy(format!("signer not bootstrapped: {e}"))),
        }
    }

    async fn deploy(&self) -> Result<(), LayerError> {
        let ctx = &self.stack.ctx;
        let derived = params([
            ("VpcId", ctx.require(&self.config.network_layer, "VpcId")?),
            (
                "PrivateSubnetIds",
                ctx.require(&self.config.network_layer, "PrivateSubnetIds")?,
            ),
        ]);
        self.stack.deploy(derived).await?;
        let raw = self.stack.outputs().await?;
        let instance_id = raw
            .get("InstanceId")
            .filter(|v| !v.trim().is_empty())
            .ok_or_else(|| LayerError::MissingField {
                layer: self.name().to_string(),
                field: "InstanceId".to_string(),
            })?;
        ctx.run_remote(&self.script(instance_id, &self.config.bootstrap, "bootstrap"))
            .await?;
        Ok(())
    }

    async fn get_outputs(&self) -> Result<LayerOutput, LayerError> {
        let raw = self.stack.outputs().await?;
        let raw = self.collect(raw).await;
        Ok(LayerOutput::new(self.name(), CONTRACT.project(&raw)))
    }

    async fn destroy(&self) -> Result<(), LayerError> {
        let mut teardown = Teardown::new(self.name());
        if !self.config.teardown.is_empty() {
            let instance = self
                .stack
                .healthy_outputs()
                .await
                .and_then(|raw| raw.get("InstanceId").cloned());
            if let Some(instance_id) = instance {
                let result = self
                    .stack
                    .ctx
                    .run_remote(&self.script(&instance_id, &self.config.teardown, "teardown"))
                    .await
                    .map(drop);
                teardown.record("wipe signer keys", result);
            }
        }
        teardown.record("delete signer stack", self.stack.destroy().await);
        teardown.finish()
    }
}
