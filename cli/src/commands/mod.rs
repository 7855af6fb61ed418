//! Command implementations

pub mod deploy;
pub mod destroy;
pub mod outputs;
pub mod plan;
pub mod status;
pub mod version;

use std::process::ExitCode;

/// Exit code for a command that ran to completion.
fn exit_code(success: bool) -> ExitCode {
    if success {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}
