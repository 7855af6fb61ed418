//! Cross-chain bridge: contracts deployed by a script from the protocol
//! repository, plus a relayer stack pointed at them.
//!
//! Contract addresses come from the script's deployment artifact, which only
//! exists locally. When it is gone, the previously recorded address is used,
//! but only after the relayer confirms it is still serving that address.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::Context;
use async_trait::async_trait;
use serde::Deserialize;
use strata_common::LayerOutput;

use super::{StackLayer, StackSettings, drift, join_url, params};
use crate::application::ports::{ProbeKind, ProbeTarget};
use crate::application::services::lifecycle::{Layer, LayerContext, Teardown};
use crate::domain::{ConfigError, LayerError, OutputContract, RepoRef, VerifyOutcome};

const CONTRACT: OutputContract = OutputContract {
    required: &["BridgeAddress", "RelayerEndpoint"],
    optional: &["MessengerAddress", "SignerAddress"],
};

#[derive(Debug, Deserialize)]
#[serde(default)]
struct BridgeConfig {
    #[serde(flatten)]
    stack: StackSettings,
    signer_layer: String,
    protocol_repo: Option<RepoRef>,
    /// Deployment script, relative to the protocol repository.
    script: String,
    args: Vec<String>,
    /// Directory (in the protocol repository) the script writes
    /// `<environment>.json` into.
    artifacts_dir: PathBuf,
    parent_rpc_url: Option<String>,
    /// JSON-RPC method the relayer answers with the bridge address it serves.
    identity_method: String,
    health_path: String,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            stack: StackSettings::default(),
            signer_layer: "signer".to_string(),
            protocol_repo: None,
            script: "scripts/deploy.sh".to_string(),
            args: Vec::new(),
            artifacts_dir: PathBuf::from("deployments"),
            parent_rpc_url: None,
            identity_method: "relayer_bridgeAddress".to_string(),
            health_path: "/health".to_string(),
        }
    }
}

/// What the deployment script leaves behind.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DeploymentArtifact {
    bridge_address: String,
    #[serde(default)]
    messenger_address: Option<String>,
}

impl DeploymentArtifact {
    fn parse(text: &str) -> Result<Self, LayerError> {
        let artifact: Self =
            serde_json::from_str(text).context("parsing deployment artifact")?;
        if artifact.bridge_address.trim().is_empty() {
            return Err(LayerError::Other(anyhow::anyhow!(
                "deployment artifact has an empty bridgeAddress"
            )));
        }
        Ok(artifact)
    }
}

pub struct BridgeLayer {
    stack: StackLayer,
    config: BridgeConfig,
    protocol_repo: RepoRef,
    parent_rpc_url: String,
}

impl BridgeLayer {
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidLayerConfig`] if the config block is
    /// malformed or lacks `protocol_repo` or `parent_rpc_url`.
    pub fn new(ctx: LayerContext) -> Result<Self, ConfigError> {
        let config: BridgeConfig = ctx.config()?;
        let missing = |key: &str| ConfigError::InvalidLayerConfig {
            layer: ctx.name().to_string(),
            message: format!("`{key}` is required"),
        };
        let protocol_repo = config
            .protocol_repo
            .clone()
            .ok_or_else(|| missing("protocol_repo"))?;
        let parent_rpc_url = config
            .parent_rpc_url
            .clone()
            .ok_or_else(|| missing("parent_rpc_url"))?;
        Ok(Self {
            stack: StackLayer::new(ctx, config.stack.clone()),
            config,
            protocol_repo,
            parent_rpc_url,
        })
    }

    fn artifact_path(&self, repo: &Path) -> PathBuf {
        repo.join(&self.config.artifacts_dir)
            .join(format!("{}.json", self.stack.ctx.settings.environment))
    }

    async fn read_artifact(&self, repo: &Path) -> Result<DeploymentArtifact, LayerError> {
        let path = self.artifact_path(repo);
        let text = tokio::fs::read_to_string(&path)
            .await
            .with_context(|| format!("reading {}", path.display()))?;
        DeploymentArtifact::parse(&text)
    }

    /// The local artifact if present, else the address recorded last run.
    /// Only inspects an existing checkout; never fetches.
    async fn candidate(&self) -> Option<DeploymentArtifact> {
        match self.stack.ctx.checkout(&self.protocol_repo).await {
            Some(repo) => match self.read_artifact(&repo).await {
                Ok(artifact) => return Some(artifact),
                Err(e) => tracing::debug!(layer = self.name(), error = %e, "no local artifact"),
            },
            None => tracing::debug!(layer = self.name(), "protocol repo not checked out"),
        }
        let previous = self.stack.ctx.previous()?;
        Some(DeploymentArtifact {
            bridge_address: previous.get("BridgeAddress")?.to_string(),
            messenger_address: previous.get("MessengerAddress").map(str::to_string),
        })
    }

    /// Raw output map from the artifact, relayer stack and signer echo.
    fn assemble(
        &self,
        artifact: Option<&DeploymentArtifact>,
        relayer: &BTreeMap<String, String>,
    ) -> BTreeMap<String, String> {
        let mut raw = BTreeMap::new();
        if let Some(a) = artifact {
            raw.insert("BridgeAddress".to_string(), a.bridge_address.clone());
            if let Some(m) = &a.messenger_address {
                raw.insert("MessengerAddress".to_string(), m.clone());
            }
        }
        if let Some(endpoint) = relayer.get("RelayerEndpoint") {
            raw.insert("RelayerEndpoint".to_string(), endpoint.clone());
        }
        if let Ok(address) = self.stack.ctx.require(&self.config.signer_layer, "SignerAddress") {
            raw.insert("SignerAddress".to_string(), address);
        }
        raw
    }
}

#[async_trait]
impl Layer for BridgeLayer {
    fn name(&self) -> &str {
        self.stack.name()
    }

    fn contract(&self) -> OutputContract {
        CONTRACT
    }

    async fn verify(&self) -> Result<VerifyOutcome, LayerError> {
        let signer_endpoint = self
            .stack
            .ctx
            .require(&self.config.signer_layer, "SignerEndpoint")?;
        let Some(relayer) = self.stack.healthy_outputs().await else {
            return Ok(VerifyOutcome::deploy("relayer stack missing or unhealthy"));
        };
        let Some(artifact) = self.candidate().await else {
            return Ok(VerifyOutcome::deploy("no known bridge deployment"));
        };
        if let Some(reason) = drift(
            &relayer,
            &[
                ("BridgeAddress", &artifact.bridge_address),
                ("SignerEndpoint", &signer_endpoint),
            ],
        ) {
            return Ok(VerifyOutcome::deploy(reason));
        }
        let Some(endpoint) = relayer.get("RelayerEndpoint") else {
            return Ok(VerifyOutcome::deploy("relayer stack publishes no endpoint"));
        };
        let probe = ProbeTarget {
            url: join_url(endpoint, &self.config.health_path),
            kind: ProbeKind::Composite {
                rpc_url: endpoint.clone(),
                method: self.config.identity_method.clone(),
                expected: artifact.bridge_address.clone(),
            },
        };
        let probes = self.stack.ctx.probe_all(&[probe]).await;
        if !probes.all_healthy() {
            return Ok(VerifyOutcome::deploy(format!(
                "relayer does not confirm bridge {}: {}",
                artifact.bridge_address,
                probes.describe()
            )));
        }
        match CONTRACT.publish(self.name(), &self.assemble(Some(&artifact), &relayer)) {
            Ok(output) => Ok(VerifyOutcome::skip(
                format!("bridge {} live behind relayer", artifact.bridge_address),
                output,
            )),
            Err(e) => Ok(VerifyOutcome::deploy(format!("bridge outputs incomplete: {e}"))),
        }
    }

    async fn deploy(&self) -> Result<(), LayerError> {
        let ctx = &self.stack.ctx;
        let signer_endpoint = ctx.require(&self.config.signer_layer, "SignerEndpoint")?;
        let signer_address = ctx.require(&self.config.signer_layer, "SignerAddress")?;
        let repo = ctx.materialize(&self.protocol_repo).await?;
        let scratch = ctx.scratch()?;
        let artifact_path = self.artifact_path(&repo);

        let env: BTreeMap<String, String> = [
            ("STRATA_ENVIRONMENT", ctx.settings.environment.clone()),
            ("PARENT_RPC_URL", self.parent_rpc_url.clone()),
            ("SIGNER_ENDPOINT", signer_endpoint.clone()),
            ("SIGNER_ADDRESS", signer_address),
            ("STRATA_SCRATCH_DIR", scratch.path().display().to_string()),
            ("DEPLOYMENT_ARTIFACT", artifact_path.display().to_string()),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v))
        .collect();
        ctx.run_script(&repo, &self.config.script, &self.config.args, &env)
            .await?;

        let artifact = self.read_artifact(&repo).await?;
        tracing::info!(layer = self.name(), bridge = %artifact.bridge_address, "bridge contracts deployed");
        self.stack
            .deploy(params([
                ("BridgeAddress", artifact.bridge_address),
                ("SignerEndpoint", signer_endpoint),
            ]))
            .await
    }

    async fn get_outputs(&self) -> Result<LayerOutput, LayerError> {
        let relayer = self.stack.outputs().await?;
        let artifact = match self.stack.ctx.materialize(&self.protocol_repo).await {
            Ok(repo) => self.read_artifact(&repo).await.ok(),
            Err(_) => None,
        };
        let raw = self.assemble(artifact.as_ref(), &relayer);
        Ok(LayerOutput::new(self.name(), CONTRACT.project(&raw)))
    }

    async fn destroy(&self) -> Result<(), LayerError> {
        let mut teardown = Teardown::new(self.name());
        teardown.record("delete relayer stack", self.stack.destroy().await);
        let removal = async {
            let repo = self.stack.ctx.materialize(&self.protocol_repo).await?;
            let path = self.artifact_path(&repo);
            match tokio::fs::remove_file(&path).await {
                Ok(()) => Ok(()),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
                Err(e) => Err(LayerError::Other(
                    anyhow::Error::new(e).context(format!("removing {}", path.display())),
                )),
            }
        };
        teardown.record("remove deployment artifact", removal.await);
        teardown.finish()
    }
}
