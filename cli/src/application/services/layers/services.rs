//! Shared services stack, built inside the network layer's VPC.

use async_trait::async_trait;
use serde::Deserialize;
use strata_common::LayerOutput;

use super::{StackLayer, StackSettings, drift, join_url, params};
use crate::application::ports::ProbeTarget;
use crate::application::services::lifecycle::{Layer, LayerContext};
use crate::domain::{ConfigError, LayerError, OutputContract, VerifyOutcome};

const CONTRACT: OutputContract = OutputContract {
    required: &["ServiceEndpoint", "ClusterName"],
    optional: &["LogGroup"],
};

#[derive(Debug, Deserialize)]
#[serde(default)]
struct ServicesConfig {
    #[serde(flatten)]
    stack: StackSettings,
    /// Layer whose `VpcId` and `PrivateSubnetIds` the stack is built on.
    network_layer: String,
    health_path: String,
}

impl Default for ServicesConfig {
    fn default() -> Self {
        Self {
            stack: StackSettings::default(),
            network_layer: "network".to_string(),
            health_path: "/health".to_string(),
        }
    }
}

pub struct ServicesLayer {
    stack: StackLayer,
    network_layer: String,
    health_path: String,
}

impl ServicesLayer {
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidLayerConfig`] if the config block is malformed.
    pub fn new(ctx: LayerContext) -> Result<Self, ConfigError> {
        let config: ServicesConfig = ctx.config()?;
        Ok(Self {
            stack: StackLayer::new(ctx, config.stack),
            network_layer: config.network_layer,
            health_path: config.health_path,
        })
    }
}

#[async_trait]
impl Layer for ServicesLayer {
    fn name(&self) -> &str {
        self.stack.name()
    }

    fn contract(&self) -> OutputContract {
        CONTRACT
    }

    async fn verify(&self) -> Result<VerifyOutcome, LayerError> {
        let vpc = self.stack.ctx.require(&self.network_layer, "VpcId")?;
        let Some(raw) = self.stack.healthy_outputs().await else {
            return Ok(VerifyOutcome::deploy("services stack missing or unhealthy"));
        };
        if let Some(reason) = drift(&raw, &[("VpcId", &vpc)]) {
            return Ok(VerifyOutcome::deploy(reason));
        }
        let output = match CONTRACT.publish(self.name(), &raw) {
            Ok(output) => output,
            Err(e) => return Ok(VerifyOutcome::deploy(format!("services stack incomplete: {e}"))),
        };
        let endpoint = output.get("ServiceEndpoint").unwrap_or_default();
        let probes = self
            .stack
            .ctx
            .probe_all(&[ProbeTarget::reachability(join_url(endpoint, &self.health_path))])
            .await;
        if !probes.all_healthy() {
            return Ok(VerifyOutcome::deploy(format!(
                "service endpoint unhealthy: {}",
                probes.describe()
            )));
        }
        Ok(VerifyOutcome::skip("services stack healthy and reachable", output))
    }

    async fn deploy(&self) -> Result<(), LayerError> {
        let ctx = &self.stack.ctx;
        let derived = params([
            ("VpcId", ctx.require(&self.network_layer, "VpcId")?),
            ("PrivateSubnetIds", ctx.require(&self.network_layer, "PrivateSubnetIds")?),
        ]);
        self.stack.deploy(derived).await
    }

    async fn get_outputs(&self) -> Result<LayerOutput, LayerError> {
        let raw = self.stack.outputs().await?;
        Ok(LayerOutput::new(self.name(), CONTRACT.project(&raw)))
    }

    async fn destroy(&self) -> Result<(), LayerError> {
        self.stack.destroy().await
    }
}
