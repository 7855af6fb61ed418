//! Base network stack.

use std::collections::BTreeMap;

use async_trait::async_trait;
use serde::Deserialize;
use strata_common::LayerOutput;

use super::{StackLayer, StackSettings};
use crate::application::services::lifecycle::{Layer, LayerContext};
use crate::domain::{ConfigError, LayerError, OutputContract, VerifyOutcome};

const CONTRACT: OutputContract = OutputContract {
    required: &["VpcId", "PrivateSubnetIds"],
    optional: &["PublicSubnetIds", "NatGatewayIp"],
};

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct NetworkConfig {
    #[serde(flatten)]
    stack: StackSettings,
}

pub struct NetworkLayer {
    stack: StackLayer,
}

impl NetworkLayer {
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidLayerConfig`] if the config block is malformed.
    pub fn new(ctx: LayerContext) -> Result<Self, ConfigError> {
        let config: NetworkConfig = ctx.config()?;
        Ok(Self {
            stack: StackLayer::new(ctx, config.stack),
        })
    }
}

#[async_trait]
impl Layer for NetworkLayer {
    fn name(&self) -> &str {
        self.stack.name()
    }

    fn contract(&self) -> OutputContract {
        CONTRACT
    }

    async fn verify(&self) -> Result<VerifyOutcome, LayerError> {
        let Some(raw) = self.stack.healthy_outputs().await else {
            return Ok(VerifyOutcome::deploy("network stack missing or unhealthy"));
        };
        match CONTRACT.publish(self.name(), &raw) {
            Ok(output) => Ok(VerifyOutcome::skip("network stack healthy", output)),
            Err(e) => Ok(VerifyOutcome::deploy(format!("network stack incomplete: {e}"))),
        }
    }

    async fn deploy(&self) -> Result<(), LayerError> {
        self.stack.deploy(BTreeMap::new()).await
    }

    async fn get_outputs(&self) -> Result<LayerOutput, LayerError> {
        let raw = self.stack.outputs().await?;
        Ok(LayerOutput::new(self.name(), CONTRACT.project(&raw)))
    }

    async fn destroy(&self) -> Result<(), LayerError> {
        self.stack.destroy().await
    }
}
