//! Secondary chain node fleet.
//!
//! Verification probes every RPC node concurrently and cross-checks the
//! first node's bridge identity against the bridge layer.

use async_trait::async_trait;
use serde::Deserialize;
use strata_common::LayerOutput;

use super::{StackLayer, StackSettings, drift, join_url, params};
use crate::application::ports::{ProbeKind, ProbeTarget};
use crate::application::services::lifecycle::{Layer, LayerContext};
use crate::domain::{ConfigError, LayerError, OutputContract, VerifyOutcome};

const CONTRACT: OutputContract = OutputContract {
    required: &["RpcUrls", "ChainId"],
    optional: &["ExplorerUrl"],
};

#[derive(Debug, Deserialize)]
#[serde(default)]
struct ChainConfig {
    #[serde(flatten)]
    stack: StackSettings,
    network_layer: String,
    bridge_layer: String,
    chain_id: Option<u64>,
    /// JSON-RPC method a node answers with the bridge address it follows.
    identity_method: String,
    health_path: String,
}

impl Default for ChainConfig {
    fn default() -> Self {
        Self {
            stack: StackSettings::default(),
            network_layer: "network".to_string(),
            bridge_layer: "bridge".to_string(),
            chain_id: None,
            identity_method: "strata_bridgeAddress".to_string(),
            health_path: "/health".to_string(),
        }
    }
}

pub struct ChainLayer {
    stack: StackLayer,
    config: ChainConfig,
    chain_id: u64,
}

/// Node URLs from the comma-separated `RpcUrls` output.
fn split_urls(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

impl ChainLayer {
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidLayerConfig`] if the config block is
    /// malformed or lacks `chain_id`.
    pub fn new(ctx: LayerContext) -> Result<Self, ConfigError> {
        let config: ChainConfig = ctx.config()?;
        let chain_id = config.chain_id.ok_or_else(|| ConfigError::InvalidLayerConfig {
            layer: ctx.name().to_string(),
            message: "`chain_id` is required".into(),
        })?;
        Ok(Self {
            stack: StackLayer::new(ctx, config.stack.clone()),
            config,
            chain_id,
        })
    }

    fn probes(&self, urls: &[String], bridge: &str) -> Vec<ProbeTarget> {
        let mut targets: Vec<ProbeTarget> = urls
            .iter()
            .map(|url| ProbeTarget::rpc(url, "eth_chainId", self.chain_id.to_string()))
            .collect();
        if let Some(first) = urls.first() {
            targets.push(ProbeTarget {
                url: join_url(first, &self.config.health_path),
                kind: ProbeKind::Composite {
                    rpc_url: first.clone(),
                    method: self.config.identity_method.clone(),
                    expected: bridge.to_string(),
                },
            });
        }
        targets
    }
}

#[async_trait]
impl Layer for ChainLayer {
    fn name(&self) -> &str {
        self.stack.name()
    }

    fn contract(&self) -> OutputContract {
        CONTRACT
    }

    async fn verify(&self) -> Result<VerifyOutcome, LayerError> {
        let bridge = self.stack.ctx.require(&self.config.bridge_layer, "BridgeAddress")?;
        let Some(mut raw) = self.stack.healthy_outputs().await else {
            return Ok(VerifyOutcome::deploy("chain stack missing or unhealthy"));
        };
        let chain_id = self.chain_id.to_string();
        if let Some(reason) = drift(&raw, &[("BridgeAddress", &bridge), ("ChainId", &chain_id)]) {
            return Ok(VerifyOutcome::deploy(reason));
        }
        let urls = raw.get("RpcUrls").map(|v| split_urls(v)).unwrap_or_default();
        if urls.is_empty() {
            return Ok(VerifyOutcome::deploy("chain stack publishes no RPC nodes"));
        }
        let probes = self.stack.ctx.probe_all(&self.probes(&urls, &bridge)).await;
        if !probes.all_healthy() {
            return Ok(VerifyOutcome::deploy(format!("chain unhealthy: {}", probes.describe())));
        }
        raw.insert("ChainId".to_string(), chain_id);
        match CONTRACT.publish(self.name(), &raw) {
            Ok(output) => Ok(VerifyOutcome::skip(
                format!("{} RPC nodes healthy and following bridge {bridge}", urls.len()),
                output,
            )),
            Err(e) => Ok(VerifyOutcome::deploy(format!("chain outputs incomplete: {e}"))),
        }
    }

    async fn deploy(&self) -> Result<(), LayerError> {
        let ctx = &self.stack.ctx;
        let derived = params([
            ("ChainId", self.chain_id.to_string()),
            ("BridgeAddress", ctx.require(&self.config.bridge_layer, "BridgeAddress")?),
            ("VpcId", ctx.require(&self.config.network_layer, "VpcId")?),
            (
                "PrivateSubnetIds",
                ctx.require(&self.config.network_layer, "PrivateSubnetIds")?,
            ),
        ]);
        self.stack.deploy(derived).await
    }

    async fn get_outputs(&self) -> Result<LayerOutput, LayerError> {
        let mut raw = self.stack.outputs().await?;
        raw.insert("ChainId".to_string(), self.chain_id.to_string());
        Ok(LayerOutput::new(self.name(), CONTRACT.project(&raw)))
    }

    async fn destroy(&self) -> Result<(), LayerError> {
        self.stack.destroy().await
    }
}
