//! Infrastructure implementation of the `HealthProbe` port over HTTP.
//!
//! Every probe is a single attempt bounded by a hard deadline. Connection
//! errors, bad statuses, and timeouts all come back as unhealthy outcomes.

use std::time::Duration;

use async_trait::async_trait;
use serde_json::{Value, json};
use tokio::time::Instant;

use crate::application::ports::{HealthOutcome, HealthProbe, ProbeKind, ProbeTarget};

/// Production `HealthProbe` backed by `reqwest`.
#[derive(Debug, Clone, Default)]
pub struct HttpHealthChecker {
    client: reqwest::Client,
}

impl HttpHealthChecker {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    async fn reachable(&self, url: &str, deadline: Duration) -> Result<(), String> {
        let response = self
            .client
            .get(url)
            .timeout(deadline)
            .send()
            .await
            .map_err(|e| describe(&e))?;
        let status = response.status();
        if status.is_success() {
            Ok(())
        } else {
            Err(format!("HTTP {status}"))
        }
    }

    async fn rpc(
        &self,
        url: &str,
        method: &str,
        expected: &str,
        deadline: Duration,
    ) -> Result<(), String> {
        let body = json!({ "jsonrpc": "2.0", "id": 1, "method": method, "params": [] });
        let response = self
            .client
            .post(url)
            .timeout(deadline)
            .json(&body)
            .send()
            .await
            .map_err(|e| describe(&e))?;
        let status = response.status();
        if !status.is_success() {
            return Err(format!("HTTP {status} from {method}"));
        }
        let reply: Value = response
            .json()
            .await
            .map_err(|e| format!("{method} returned invalid JSON: {e}"))?;
        if let Some(error) = reply.get("error") {
            return Err(format!("{method} error: {error}"));
        }
        let actual = match reply.get("result") {
            Some(Value::String(s)) => s.clone(),
            Some(Value::Null) | None => return Err(format!("{method} returned no result")),
            Some(other) => other.to_string(),
        };
        if identities_match(&actual, expected) {
            Ok(())
        } else {
            Err(format!("{method} returned {actual}, expected {expected}"))
        }
    }

    async fn check(&self, target: &ProbeTarget, deadline: Duration) -> Result<(), String> {
        match &target.kind {
            ProbeKind::Reachability => self.reachable(&target.url, deadline).await,
            ProbeKind::Rpc { method, expected } => {
                self.rpc(&target.url, method, expected, deadline).await
            }
            ProbeKind::Composite {
                rpc_url,
                method,
                expected,
            } => {
                let (reach, identity) = tokio::join!(
                    self.reachable(&target.url, deadline),
                    self.rpc(rpc_url, method, expected, deadline),
                );
                reach.and(identity)
            }
        }
    }
}

#[async_trait]
impl HealthProbe for HttpHealthChecker {
    async fn probe(&self, target: &ProbeTarget, deadline: Duration) -> HealthOutcome {
        let started = Instant::now();
        let outcome = match tokio::time::timeout(deadline, self.check(target, deadline)).await {
            Ok(Ok(())) => HealthOutcome::healthy(started.elapsed()),
            Ok(Err(e)) => HealthOutcome::unhealthy(e),
            Err(_) => HealthOutcome::unhealthy(format!(
                "no answer within {}ms",
                deadline.as_millis()
            )),
        };
        tracing::debug!(url = %target.url, healthy = outcome.healthy, error = ?outcome.error, "probe finished");
        outcome
    }
}

fn describe(e: &reqwest::Error) -> String {
    if e.is_timeout() {
        "timed out".to_string()
    } else if e.is_connect() {
        format!("connection failed: {e}")
    } else {
        e.to_string()
    }
}

/// Compare a reported identity with the expected one.
///
/// Integers compare numerically whether written in hex (`0x2a`) or decimal
/// (`42`); everything else compares case-insensitively, which covers
/// checksummed and lowercase addresses.
#[must_use]
pub fn identities_match(actual: &str, expected: &str) -> bool {
    let (actual, expected) = (actual.trim().trim_matches('"'), expected.trim());
    if let (Some(a), Some(b)) = (parse_int(actual), parse_int(expected)) {
        return a == b;
    }
    actual.eq_ignore_ascii_case(expected)
}

fn parse_int(s: &str) -> Option<u128> {
    match s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        // Address-length hex is an identity, not a number.
        Some(hex) if hex.len() <= 32 => u128::from_str_radix(hex, 16).ok(),
        Some(_) => None,
        None => s.parse().ok(),
    }
}
