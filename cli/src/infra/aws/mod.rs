//! Remote provider adapters backed by the `aws` CLI.
//!
//! Every call goes through the [`CommandRunner`] port, so adapters are tested
//! against a mocked runner and never need credentials.

mod cloudformation;
mod ssm;

use std::sync::Arc;
use std::time::Duration;

pub use cloudformation::AwsCloudFormation;
pub use ssm::AwsSsm;

use crate::application::ports::{CommandRunner, CommandSpec};
use crate::domain::RunSettings;

/// Timeout for read-only API calls.
pub const API_CALL_TIMEOUT: Duration = Duration::from_secs(60);

/// Credential profile and region appended to every invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AwsScope {
    pub profile: String,
    pub region: String,
}

impl AwsScope {
    #[must_use]
    pub fn from_settings(settings: &RunSettings) -> Self {
        Self {
            profile: settings.profile.clone(),
            region: settings.region.clone(),
        }
    }

    /// `aws <service> <operation> <args…> --profile … --region … --output json`.
    fn command<I, S>(&self, service: &str, operation: &str, args: I) -> CommandSpec
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let args: Vec<String> = [service.to_string(), operation.to_string()]
            .into_iter()
            .chain(args.into_iter().map(Into::into))
            .chain([
                "--profile".to_string(),
                self.profile.clone(),
                "--region".to_string(),
                self.region.clone(),
                "--output".to_string(),
                "json".to_string(),
            ])
            .collect();
        CommandSpec::new("aws", args).timeout(API_CALL_TIMEOUT)
    }
}

/// Shared handle used by both adapters.
struct AwsCli<R: CommandRunner + ?Sized> {
    runner: Arc<R>,
    scope: AwsScope,
}
