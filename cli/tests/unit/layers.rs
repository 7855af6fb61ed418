//! Layer variants driven through the registry against in-memory ports.

#![allow(clippy::expect_used)]

use std::sync::Arc;

use strata_cli::application::ports::ProbeKind;
use strata_cli::application::services::layers::build_layer;
use strata_cli::application::services::{Layer, LayerContext, OutputsView};
use strata_cli::domain::{ConfigError, LayerError, RemoteCommandStatus, StackStatus, VerifyOutcome};
use strata_common::{LayerConfig, LayerOutput, LayerSpec};
use tempfile::TempDir;

use crate::mocks::{FakeRemote, Fakes, described, map, outcome, settings};

const SIGNER_ADDRESS: &str = "0x8ba1f109551bd432803012645ac136ddd64dba72";

struct Harness {
    dir: TempDir,
    fakes: Fakes,
    view: OutputsView,
}

impl Harness {
    fn new() -> Self {
        let dir = tempfile::tempdir().expect("tempdir");
        let fakes = Fakes::new(dir.path());
        Self {
            dir,
            fakes,
            view: OutputsView::new(),
        }
    }

    fn with(mut self, edit: impl FnOnce(Fakes) -> Fakes) -> Self {
        self.fakes = edit(self.fakes);
        self
    }

    fn context(&self, spec: LayerSpec, previous: Option<LayerOutput>) -> LayerContext {
        let settings = settings(self.dir.path());
        let toolkit = self.fakes.toolkit(&settings.timing);
        LayerContext::new(Arc::new(settings), spec, toolkit, self.view.clone(), previous)
    }

    fn layer(&self, spec: LayerSpec) -> Box<dyn Layer> {
        build_layer(self.context(spec, None)).expect("buildable")
    }

    fn publish(&self, layer: &str, pairs: &[(&str, &str)]) {
        self.view.publish(LayerOutput::new(layer, map(pairs)));
    }

    fn publish_network(&self) {
        self.publish("network", &[("VpcId", "vpc-1"), ("PrivateSubnetIds", "subnet-a,subnet-b")]);
    }
}

fn config(json: serde_json::Value) -> LayerConfig {
    match json {
        serde_json::Value::Object(map) => map,
        _ => LayerConfig::new(),
    }
}

// ── Registry ──────────────────────────────────────────────────────────────────

#[test]
fn unknown_kind_is_rejected_with_valid_kinds() {
    let h = Harness::new();
    let result = build_layer(h.context(LayerSpec::new("database"), None));
    match result {
        Err(ConfigError::UnknownKind { kind, valid, .. }) => {
            assert_eq!(kind, "database");
            assert!(valid.contains("network"));
        }
        Err(other) => panic!("unexpected error: {other}"),
        Ok(_) => panic!("unknown kind must not build"),
    }
}

#[test]
fn kind_can_differ_from_layer_name() {
    let h = Harness::new();
    let layer = h.layer(LayerSpec::new("edge-network").with_kind("network"));
    assert_eq!(layer.name(), "edge-network");
}

#[test]
fn malformed_config_block_is_a_config_error() {
    let h = Harness::new();
    let spec = LayerSpec::new("signer").with_config(config(serde_json::json!({ "bootstrap": [] })));
    assert!(matches!(
        build_layer(h.context(spec, None)),
        Err(ConfigError::InvalidLayerConfig { .. })
    ));

    let spec = LayerSpec::new("bridge");
    assert!(matches!(
        build_layer(h.context(spec, None)),
        Err(ConfigError::InvalidLayerConfig { ref message, .. }) if message.contains("protocol_repo")
    ));
}

// ── Network ───────────────────────────────────────────────────────────────────

#[tokio::test(start_paused = true)]
async fn missing_network_stack_is_deployed_from_the_infra_repo() {
    let h = Harness::new();
    h.fakes.stacks.script(
        "devnet-network",
        vec![
            Ok(described(StackStatus::NotFound, &[])),
            Ok(described(
                StackStatus::CreateComplete,
                &[("VpcId", "vpc-1"), ("PrivateSubnetIds", "a,b"), ("Internal", "x")],
            )),
        ],
    );
    let layer = h.layer(LayerSpec::new("network"));

    assert!(!layer.verify().await.expect("verify").is_skip());
    layer.deploy().await.expect("deploy");
    let output = layer.get_outputs().await.expect("outputs");

    let deploys = h.fakes.stacks.deployed();
    assert_eq!(deploys.len(), 1);
    assert_eq!(deploys[0].stack_name, "devnet-network");
    assert_eq!(deploys[0].template, std::path::Path::new("network/template.yaml"));
    assert_eq!(deploys[0].working_dir, h.dir.path());
    assert_eq!(output.get("VpcId"), Some("vpc-1"));
    assert!(output.get("Internal").is_none());
}

#[tokio::test]
async fn healthy_network_stack_is_skipped() {
    let h = Harness::new();
    h.fakes.stacks.script(
        "devnet-network",
        vec![Ok(described(
            StackStatus::UpdateComplete,
            &[("VpcId", "vpc-1"), ("PrivateSubnetIds", "a,b")],
        ))],
    );
    let layer = h.layer(LayerSpec::new("network"));

    match layer.verify().await.expect("verify") {
        VerifyOutcome::Skip { output, .. } => assert_eq!(output.get("PrivateSubnetIds"), Some("a,b")),
        VerifyOutcome::Deploy { reason } => panic!("expected skip, got deploy: {reason}"),
    }
    assert!(h.fakes.stacks.deployed().is_empty());
}

#[tokio::test]
async fn rolled_back_network_stack_is_redeployed() {
    let h = Harness::new();
    h.fakes.stacks.script(
        "devnet-network",
        vec![Ok(described(
            StackStatus::RolledBack("UPDATE_ROLLBACK_COMPLETE".to_string()),
            &[("VpcId", "vpc-1"), ("PrivateSubnetIds", "a,b")],
        ))],
    );
    let layer = h.layer(LayerSpec::new("network"));
    assert!(!layer.verify().await.expect("verify").is_skip());
}

// ── Stack plumbing failure modes ──────────────────────────────────────────────

#[tokio::test]
async fn rejected_submission_fails_the_deploy() {
    let h = Harness::new();
    h.fakes.stacks.answer_deploys_with(outcome(false));
    let layer = h.layer(LayerSpec::new("network"));

    let err = layer.deploy().await.expect_err("rejected");
    assert!(!err.is_timeout());
    assert!(err.to_string().contains("command failed"), "{err}");
}

#[tokio::test]
async fn stack_settling_in_rollback_fails_the_deploy() {
    let h = Harness::new();
    h.fakes.stacks.script(
        "devnet-network",
        vec![Ok(described(
            StackStatus::RolledBack("ROLLBACK_COMPLETE".to_string()),
            &[],
        ))],
    );
    let layer = h.layer(LayerSpec::new("network"));

    let err = layer.deploy().await.expect_err("rolled back");
    assert!(matches!(err, LayerError::RemoteOperationFailed { .. }));
    assert!(err.to_string().contains("ROLLBACK_COMPLETE"), "{err}");
}

#[tokio::test(start_paused = true)]
async fn stack_that_never_settles_times_out() {
    let h = Harness::new();
    h.fakes.stacks.script(
        "devnet-network",
        vec![Ok(described(
            StackStatus::InProgress("CREATE_IN_PROGRESS".to_string()),
            &[],
        ))],
    );
    let layer = h.layer(LayerSpec::new("network"));

    let err = layer.deploy().await.expect_err("never settles");
    assert!(err.is_timeout(), "{err}");
}

#[tokio::test]
async fn killed_submission_is_a_timeout() {
    let h = Harness::new();
    let mut killed = outcome(false);
    killed.timed_out = true;
    h.fakes.stacks.answer_deploys_with(killed);
    let layer = h.layer(LayerSpec::new("network"));

    assert!(layer.deploy().await.expect_err("killed").is_timeout());
}

#[tokio::test]
async fn destroying_an_absent_stack_succeeds_without_a_delete() {
    let h = Harness::new();
    let layer = h.layer(LayerSpec::new("network"));

    layer.destroy().await.expect("already gone");
    assert!(h.fakes.stacks.deleted().is_empty());
}

#[tokio::test(start_paused = true)]
async fn destroy_deletes_and_waits_for_absence() {
    let h = Harness::new();
    h.fakes.stacks.script(
        "devnet-network",
        vec![
            Ok(described(StackStatus::CreateComplete, &[])),
            Ok(described(StackStatus::InProgress("DELETE_IN_PROGRESS".to_string()), &[])),
            Ok(described(StackStatus::NotFound, &[])),
        ],
    );
    let layer = h.layer(LayerSpec::new("network"));

    layer.destroy().await.expect("destroyed");
    assert_eq!(h.fakes.stacks.deleted(), ["devnet-network"]);
}

// ── Services ──────────────────────────────────────────────────────────────────

#[tokio::test]
async fn services_verify_requires_network_outputs() {
    let h = Harness::new();
    let layer = h.layer(LayerSpec::new("services").depends_on(["network"]));

    let err = layer.verify().await.expect_err("network not captured");
    assert!(matches!(
        err,
        LayerError::MissingDependencyOutput { ref dependency, .. } if dependency == "network"
    ));
}

#[tokio::test]
async fn services_redeploy_when_network_changed() {
    let h = Harness::new();
    h.publish("network", &[("VpcId", "vpc-2"), ("PrivateSubnetIds", "a")]);
    h.fakes.stacks.script(
        "devnet-services",
        vec![Ok(described(
            StackStatus::CreateComplete,
            &[("VpcId", "vpc-1"), ("ServiceEndpoint", "http://svc"), ("ClusterName", "c")],
        ))],
    );
    let layer = h.layer(LayerSpec::new("services").depends_on(["network"]));

    let outcome = layer.verify().await.expect("verify");
    assert!(!outcome.is_skip());
    assert!(outcome.reason().contains("vpc-2"), "{}", outcome.reason());
}

#[tokio::test]
async fn unreachable_services_are_redeployed() {
    let h = Harness::new().with(|f| f.with_health(false));
    h.publish_network();
    h.fakes.stacks.script(
        "devnet-services",
        vec![Ok(described(
            StackStatus::CreateComplete,
            &[("VpcId", "vpc-1"), ("ServiceEndpoint", "http://svc/"), ("ClusterName", "c")],
        ))],
    );
    let layer = h.layer(LayerSpec::new("services").depends_on(["network"]));

    let outcome = layer.verify().await.expect("verify");
    assert!(!outcome.is_skip());
    let probed = h.fakes.health.targets();
    assert_eq!(probed.len(), 1);
    assert_eq!(probed[0].url, "http://svc/health");
}

#[tokio::test]
async fn services_deploy_passes_network_identifiers() {
    let h = Harness::new();
    h.publish_network();
    h.fakes.stacks.script(
        "devnet-services",
        vec![Ok(described(StackStatus::CreateComplete, &[]))],
    );
    let spec = LayerSpec::new("services")
        .depends_on(["network"])
        .with_config(config(serde_json::json!({ "parameters": { "DesiredCount": "2" } })));
    let layer = h.layer(spec);

    layer.deploy().await.expect("deploy");

    let params = &h.fakes.stacks.deployed()[0].parameters;
    assert_eq!(params.get("VpcId").map(String::as_str), Some("vpc-1"));
    assert_eq!(
        params.get("PrivateSubnetIds").map(String::as_str),
        Some("subnet-a,subnet-b")
    );
    assert_eq!(params.get("DesiredCount").map(String::as_str), Some("2"));
}

// ── Signer ────────────────────────────────────────────────────────────────────

fn signer_remote(status: RemoteCommandStatus, stderr: &str) -> FakeRemote {
    FakeRemote::new(
        vec![Ok(status)],
        &format!("signer address: {SIGNER_ADDRESS}\n"),
        stderr,
    )
}

fn signer_stack() -> Vec<Result<strata_cli::application::ports::StackDescription, String>> {
    vec![Ok(described(
        StackStatus::CreateComplete,
        &[
            ("VpcId", "vpc-1"),
            ("InstanceId", "i-0abc"),
            ("SignerEndpoint", "http://signer:8545"),
        ],
    ))]
}

#[tokio::test(start_paused = true)]
async fn signer_deploy_bootstraps_the_instance() {
    let h = Harness::new().with(|f| f.with_remote(signer_remote(RemoteCommandStatus::Success, "")));
    h.publish_network();
    h.fakes.stacks.script("devnet-signer", signer_stack());
    let layer = h.layer(LayerSpec::new("signer").depends_on(["network"]));

    layer.deploy().await.expect("deploy");
    let output = layer.get_outputs().await.expect("outputs");

    let scripts = h.fakes.remote.scripts();
    assert_eq!(scripts[0].instance_id, "i-0abc");
    assert_eq!(scripts[0].commands, ["sudo /opt/signer/bootstrap.sh"]);
    assert_eq!(output.get("SignerAddress"), Some(SIGNER_ADDRESS));
    assert_eq!(output.get("InstanceId"), Some("i-0abc"));
}

#[tokio::test(start_paused = true)]
async fn failed_bootstrap_fails_the_deploy_with_remote_stderr() {
    let h = Harness::new()
        .with(|f| f.with_remote(signer_remote(RemoteCommandStatus::Failed, "key store locked")));
    h.publish_network();
    h.fakes.stacks.script("devnet-signer", signer_stack());
    let layer = h.layer(LayerSpec::new("signer").depends_on(["network"]));

    let err = layer.deploy().await.expect_err("bootstrap fails");
    assert!(err.to_string().contains("key store locked"), "{err}");
}

#[tokio::test(start_paused = true)]
async fn healthy_signer_is_skipped_with_its_address() {
    let h = Harness::new().with(|f| f.with_remote(signer_remote(RemoteCommandStatus::Success, "")));
    h.publish_network();
    h.fakes.stacks.script("devnet-signer", signer_stack());
    let layer = h.layer(LayerSpec::new("signer").depends_on(["network"]));

    let outcome = layer.verify().await.expect("verify");
    match outcome {
        VerifyOutcome::Skip { output, .. } => {
            assert_eq!(output.get("SignerAddress"), Some(SIGNER_ADDRESS));
        }
        VerifyOutcome::Deploy { reason } => panic!("expected skip, got deploy: {reason}"),
    }
    assert!(h.fakes.stacks.deployed().is_empty());
}

#[tokio::test(start_paused = true)]
async fn signer_destroy_deletes_the_stack_even_when_teardown_fails() {
    let h = Harness::new()
        .with(|f| f.with_remote(signer_remote(RemoteCommandStatus::Failed, "keys busy")));
    h.fakes.stacks.script(
        "devnet-signer",
        vec![
            Ok(described(StackStatus::CreateComplete, &[("InstanceId", "i-0abc")])),
            Ok(described(StackStatus::CreateComplete, &[("InstanceId", "i-0abc")])),
            Ok(described(StackStatus::NotFound, &[])),
        ],
    );
    let layer = h.layer(LayerSpec::new("signer"));

    let err = layer.destroy().await.expect_err("partial");
    assert!(matches!(err, LayerError::PartialDestroyFailure { .. }));
    assert!(err.to_string().contains("keys busy"), "{err}");
    assert_eq!(h.fakes.stacks.deleted(), ["devnet-signer"]);
}

// ── Bridge ────────────────────────────────────────────────────────────────────

fn bridge_spec() -> LayerSpec {
    LayerSpec::new("bridge")
        .depends_on(["signer"])
        .with_config(config(serde_json::json!({
            "protocol_repo": { "url": "https://example.com/org/protocol.git" },
            "parent_rpc_url": "https://parent.example.com",
        })))
}

fn publish_signer(h: &Harness) {
    h.publish(
        "signer",
        &[
            ("SignerEndpoint", "http://signer:8545"),
            ("SignerAddress", SIGNER_ADDRESS),
            ("InstanceId", "i-0abc"),
        ],
    );
}

fn write_artifact(h: &Harness, bridge: &str) {
    let dir = h.dir.path().join("deployments");
    std::fs::create_dir_all(&dir).expect("mkdir");
    std::fs::write(
        dir.join("devnet.json"),
        format!(r#"{{"bridgeAddress":"{bridge}","messengerAddress":"0xmessenger"}}"#),
    )
    .expect("write artifact");
}

#[tokio::test]
async fn bridge_deploy_runs_the_script_then_the_relayer_stack() {
    let h = Harness::new();
    publish_signer(&h);
    write_artifact(&h, "0xbridge");
    h.fakes.stacks.script(
        "devnet-bridge",
        vec![Ok(described(
            StackStatus::CreateComplete,
            &[("RelayerEndpoint", "http://relayer:8080")],
        ))],
    );
    let layer = h.layer(bridge_spec());

    layer.deploy().await.expect("deploy");
    let output = layer.get_outputs().await.expect("outputs");

    let specs = h.fakes.runner.specs.lock().expect("lock").clone();
    assert_eq!(specs.len(), 1);
    assert_eq!(specs[0].program, "bash");
    assert_eq!(specs[0].args, ["scripts/deploy.sh"]);
    assert_eq!(specs[0].working_dir.as_deref(), Some(h.dir.path()));
    assert_eq!(
        specs[0].env.get("SIGNER_ADDRESS").map(String::as_str),
        Some(SIGNER_ADDRESS)
    );
    assert_eq!(
        specs[0].env.get("PARENT_RPC_URL").map(String::as_str),
        Some("https://parent.example.com")
    );

    let params = &h.fakes.stacks.deployed()[0].parameters;
    assert_eq!(params.get("BridgeAddress").map(String::as_str), Some("0xbridge"));
    assert_eq!(output.get("BridgeAddress"), Some("0xbridge"));
    assert_eq!(output.get("MessengerAddress"), Some("0xmessenger"));
    assert_eq!(output.get("RelayerEndpoint"), Some("http://relayer:8080"));
    assert_eq!(output.get("SignerAddress"), Some(SIGNER_ADDRESS));

    // Scratch space is cleaned up once the deploy returns.
    let scratch = h.dir.path().join("scratch");
    let leftovers = std::fs::read_dir(&scratch).map(Iterator::count).unwrap_or(0);
    assert_eq!(leftovers, 0);
}

#[tokio::test]
async fn bridge_verify_falls_back_to_the_recorded_address() {
    let h = Harness::new();
    publish_signer(&h);
    h.fakes.stacks.script(
        "devnet-bridge",
        vec![Ok(described(
            StackStatus::CreateComplete,
            &[
                ("RelayerEndpoint", "http://relayer:8080"),
                ("BridgeAddress", "0xbridge"),
                ("SignerEndpoint", "http://signer:8545"),
            ],
        ))],
    );
    let previous = LayerOutput::new(
        "bridge",
        map(&[("BridgeAddress", "0xbridge"), ("RelayerEndpoint", "http://relayer:8080")]),
    );
    let layer = build_layer(h.context(bridge_spec(), Some(previous))).expect("buildable");

    let outcome = layer.verify().await.expect("verify");
    assert!(outcome.is_skip(), "{}", outcome.reason());
    let probed = h.fakes.health.targets();
    assert!(matches!(
        &probed[0].kind,
        strata_cli::application::ports::ProbeKind::Composite { expected, .. } if expected == "0xbridge"
    ));
}

#[tokio::test]
async fn bridge_without_any_known_address_deploys() {
    let h = Harness::new();
    publish_signer(&h);
    h.fakes.stacks.script(
        "devnet-bridge",
        vec![Ok(described(
            StackStatus::CreateComplete,
            &[("RelayerEndpoint", "http://relayer:8080")],
        ))],
    );
    let layer = h.layer(bridge_spec());

    let outcome = layer.verify().await.expect("verify");
    assert!(!outcome.is_skip());
    assert!(outcome.reason().contains("no known bridge deployment"));
}

// ── Chain ─────────────────────────────────────────────────────────────────────

fn chain_spec() -> LayerSpec {
    LayerSpec::new("chain").with_config(config(serde_json::json!({ "chain_id": 42 })))
}

fn chain_stack(chain_id: &str) -> strata_cli::application::ports::StackDescription {
    described(
        StackStatus::CreateComplete,
        &[
            ("RpcUrls", "http://node-a:8545, http://node-b:8545"),
            ("ChainId", chain_id),
            ("BridgeAddress", "0xbridge"),
            ("ExplorerUrl", "http://explorer"),
        ],
    )
}

#[test]
fn chain_requires_a_chain_id() {
    let h = Harness::new();
    assert!(matches!(
        build_layer(h.context(LayerSpec::new("chain"), None)),
        Err(ConfigError::InvalidLayerConfig { ref message, .. }) if message.contains("chain_id")
    ));
}

#[tokio::test]
async fn chain_probes_every_node_and_the_bridge_identity() {
    let h = Harness::new();
    h.publish("bridge", &[("BridgeAddress", "0xbridge")]);
    h.fakes.stacks.script("devnet-chain", vec![Ok(chain_stack("42"))]);
    let layer = h.layer(chain_spec());

    let outcome = layer.verify().await.expect("verify");

    assert!(outcome.is_skip(), "{}", outcome.reason());
    let probed = h.fakes.health.targets();
    assert_eq!(probed.len(), 3);
    let rpc_urls: Vec<&str> = probed
        .iter()
        .filter(|t| matches!(&t.kind, ProbeKind::Rpc { expected, .. } if expected == "42"))
        .map(|t| t.url.as_str())
        .collect();
    assert_eq!(rpc_urls, ["http://node-a:8545", "http://node-b:8545"]);
    assert!(probed.iter().any(|t| matches!(
        &t.kind,
        ProbeKind::Composite { rpc_url, expected, .. }
            if rpc_url == "http://node-a:8545" && expected == "0xbridge"
    )));
}

#[tokio::test]
async fn chain_with_an_unhealthy_node_is_redeployed() {
    let h = Harness::new().with(|f| f.with_health(false));
    h.publish("bridge", &[("BridgeAddress", "0xbridge")]);
    h.fakes.stacks.script("devnet-chain", vec![Ok(chain_stack("42"))]);
    let layer = h.layer(chain_spec());

    let outcome = layer.verify().await.expect("verify");

    assert!(!outcome.is_skip());
    assert!(outcome.reason().contains("chain unhealthy"), "{}", outcome.reason());
}

#[tokio::test]
async fn chain_built_for_another_chain_id_is_redeployed_without_probing() {
    let h = Harness::new();
    h.publish("bridge", &[("BridgeAddress", "0xbridge")]);
    h.fakes.stacks.script("devnet-chain", vec![Ok(chain_stack("7"))]);
    let layer = h.layer(chain_spec());

    let outcome = layer.verify().await.expect("verify");

    assert!(!outcome.is_skip());
    assert!(outcome.reason().contains("ChainId is 7"), "{}", outcome.reason());
    assert!(h.fakes.health.targets().is_empty());
}

#[tokio::test(start_paused = true)]
async fn chain_deploy_passes_bridge_and_network_outputs() {
    let h = Harness::new();
    h.publish_network();
    h.publish("bridge", &[("BridgeAddress", "0xbridge")]);
    h.fakes.stacks.script("devnet-chain", vec![Ok(chain_stack("42"))]);
    let layer = h.layer(chain_spec());

    layer.deploy().await.expect("deploy");
    let output = layer.get_outputs().await.expect("outputs");

    let params = &h.fakes.stacks.deployed()[0].parameters;
    assert_eq!(params.get("ChainId").map(String::as_str), Some("42"));
    assert_eq!(params.get("BridgeAddress").map(String::as_str), Some("0xbridge"));
    assert_eq!(params.get("VpcId").map(String::as_str), Some("vpc-1"));
    assert_eq!(output.get("ChainId"), Some("42"));
    assert_eq!(output.get("ExplorerUrl"), Some("http://explorer"));
    assert!(output.get("BridgeAddress").is_none());
}

#[tokio::test]
async fn bridge_verify_reads_the_local_artifact_without_fetching() {
    let h = Harness::new();
    publish_signer(&h);
    write_artifact(&h, "0xbridge");
    h.fakes.stacks.script(
        "devnet-bridge",
        vec![Ok(described(
            StackStatus::CreateComplete,
            &[
                ("RelayerEndpoint", "http://relayer:8080"),
                ("BridgeAddress", "0xbridge"),
                ("SignerEndpoint", "http://signer:8545"),
            ],
        ))],
    );
    let layer = h.layer(bridge_spec());

    let outcome = layer.verify().await.expect("verify");

    assert!(outcome.is_skip(), "{}", outcome.reason());
    assert_eq!(h.fakes.repos.ensure_calls(), 0);
}

#[tokio::test]
async fn bridge_verify_without_a_checkout_uses_the_recorded_address() {
    let h = Harness::new().with(Fakes::without_checkouts);
    publish_signer(&h);
    write_artifact(&h, "0xstale");
    h.fakes.stacks.script(
        "devnet-bridge",
        vec![Ok(described(
            StackStatus::CreateComplete,
            &[
                ("RelayerEndpoint", "http://relayer:8080"),
                ("BridgeAddress", "0xbridge"),
                ("SignerEndpoint", "http://signer:8545"),
            ],
        ))],
    );
    let previous = LayerOutput::new(
        "bridge",
        map(&[("BridgeAddress", "0xbridge"), ("RelayerEndpoint", "http://relayer:8080")]),
    );
    let layer = build_layer(h.context(bridge_spec(), Some(previous))).expect("buildable");

    let outcome = layer.verify().await.expect("verify");

    assert!(outcome.is_skip(), "{}", outcome.reason());
    assert_eq!(h.fakes.repos.ensure_calls(), 0);
}
