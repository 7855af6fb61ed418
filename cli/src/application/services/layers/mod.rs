//! Layer variants and the registry that builds them from config.
//!
//! Every variant is a named stack plus variant-specific steps, so the shared
//! stack plumbing lives in [`StackLayer`].

mod bridge;
mod chain;
mod network;
mod services;
mod signer;

use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::Deserialize;

pub use bridge::BridgeLayer;
pub use chain::ChainLayer;
pub use network::NetworkLayer;
pub use services::ServicesLayer;
pub use signer::SignerLayer;

use crate::application::ports::StackDeployRequest;
use crate::application::services::lifecycle::{Layer, LayerContext};
use crate::domain::{ConfigError, LayerError, RepoRef};

/// Kinds the registry knows how to build.
pub const KINDS: &[&str] = &["network", "services", "signer", "bridge", "chain"];

/// Build the layer for `ctx.spec`, choosing the variant by kind (defaulting
/// to the layer name).
///
/// # Errors
///
/// Returns [`ConfigError::UnknownKind`] for an unregistered kind and
/// [`ConfigError::InvalidLayerConfig`] if the config block does not parse.
pub fn build_layer(ctx: LayerContext) -> Result<Box<dyn Layer>, ConfigError> {
    let kind = ctx.spec.kind().to_string();
    let layer: Box<dyn Layer> = match kind.as_str() {
        "network" => Box::new(NetworkLayer::new(ctx)?),
        "services" => Box::new(ServicesLayer::new(ctx)?),
        "signer" => Box::new(SignerLayer::new(ctx)?),
        "bridge" => Box::new(BridgeLayer::new(ctx)?),
        "chain" => Box::new(ChainLayer::new(ctx)?),
        _ => {
            return Err(ConfigError::UnknownKind {
                layer: ctx.spec.name.clone(),
                kind,
                valid: KINDS.join(", "),
            });
        }
    };
    Ok(layer)
}

/// Config keys shared by every stack-backed variant.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct StackSettings {
    /// Template path inside the repository. Defaults to `<kind>/template.yaml`.
    pub template: Option<PathBuf>,
    /// Overrides the `<environment>-<layer>` stack name.
    pub stack_name: Option<String>,
    /// Extra stack parameters, merged under dependency-derived ones.
    pub parameters: BTreeMap<String, String>,
    /// Overrides `settings.infra_repo` for this layer's template.
    pub repo: Option<RepoRef>,
}

/// A layer's named stack and how to deploy it.
#[derive(Clone)]
pub(crate) struct StackLayer {
    pub(crate) ctx: LayerContext,
    settings: StackSettings,
}

impl StackLayer {
    pub(crate) fn new(ctx: LayerContext, settings: StackSettings) -> Self {
        Self { ctx, settings }
    }

    pub(crate) fn name(&self) -> &str {
        self.ctx.name()
    }

    pub(crate) fn stack_name(&self) -> String {
        self.settings
            .stack_name
            .clone()
            .unwrap_or_else(|| self.ctx.settings.stack_name(self.ctx.name()))
    }

    fn template(&self) -> PathBuf {
        self.settings
            .template
            .clone()
            .unwrap_or_else(|| PathBuf::from(self.ctx.spec.kind()).join("template.yaml"))
    }

    fn repo(&self) -> Result<RepoRef, LayerError> {
        match &self.settings.repo {
            Some(repo) => Ok(repo.clone()),
            None => self.ctx.infra_repo(),
        }
    }

    /// Materialize the template repository and deploy the stack with
    /// `derived` parameters layered over the configured ones.
    pub(crate) async fn deploy(&self, derived: BTreeMap<String, String>) -> Result<(), LayerError> {
        let repo = self.repo()?;
        let working_dir = self.ctx.materialize(&repo).await?;
        let mut parameters = self.settings.parameters.clone();
        parameters.extend(derived);
        let request = StackDeployRequest {
            stack_name: self.stack_name(),
            template: self.template(),
            parameters,
            working_dir,
            timeout: self.ctx.settings.timing.command_timeout(),
        };
        self.ctx.deploy_stack(&request).await
    }

    /// Raw outputs of a healthy stack, or `None` when it cannot be reused.
    pub(crate) async fn healthy_outputs(&self) -> Option<BTreeMap<String, String>> {
        self.ctx.healthy_stack(&self.stack_name()).await
    }

    /// Raw outputs with bounded retry.
    pub(crate) async fn outputs(&self) -> Result<BTreeMap<String, String>, LayerError> {
        self.ctx.stack_outputs(&self.stack_name()).await
    }

    pub(crate) async fn destroy(&self) -> Result<(), LayerError> {
        self.ctx.destroy_stack(&self.stack_name()).await
    }
}

/// First `(key, expected)` pair whose stack echo differs, as a verify reason.
///
/// Stacks echo the dependency values they were built against; a mismatch
/// means the dependency changed since and the stack must be redeployed.
pub(crate) fn drift(raw: &BTreeMap<String, String>, expected: &[(&str, &str)]) -> Option<String> {
    expected.iter().find_map(|(key, want)| match raw.get(*key) {
        Some(have) if have == want => None,
        Some(have) => Some(format!("{key} is {have}, dependency now publishes {want}")),
        None => Some(format!("stack does not record {key}")),
    })
}

/// Append `path` to `base` with exactly one slash between them.
pub(crate) fn join_url(base: &str, path: &str) -> String {
    if path.is_empty() {
        return base.to_string();
    }
    format!(
        "{}/{}",
        base.trim_end_matches('/'),
        path.trim_start_matches('/')
    )
}

/// Parameter map from literal pairs.
pub(crate) fn params<const N: usize>(pairs: [(&str, String); N]) -> BTreeMap<String, String> {
    pairs.into_iter().map(|(k, v)| (k.to_string(), v)).collect()
}
