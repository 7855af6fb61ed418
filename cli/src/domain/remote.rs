//! Observed states of asynchronous remote operations.
//!
//! Parsing from provider strings lives here so it can be tested without I/O.

use std::fmt;

/// Status of a remote stack.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StackStatus {
    CreateComplete,
    UpdateComplete,
    /// The stack does not exist (never created, or fully deleted).
    NotFound,
    /// Any `*_IN_PROGRESS` state.
    InProgress(String),
    /// A rollback finished; the last change did not apply.
    RolledBack(String),
    /// Any `*_FAILED` state.
    Failed(String),
}

impl StackStatus {
    /// Parse a provider status string such as `CREATE_COMPLETE`.
    #[must_use]
    pub fn parse(raw: &str) -> Self {
        match raw {
            "CREATE_COMPLETE" | "IMPORT_COMPLETE" => Self::CreateComplete,
            "UPDATE_COMPLETE" => Self::UpdateComplete,
            "DELETE_COMPLETE" => Self::NotFound,
            s if s.ends_with("_IN_PROGRESS") => Self::InProgress(s.to_string()),
            s if s.ends_with("ROLLBACK_COMPLETE") => Self::RolledBack(s.to_string()),
            s => Self::Failed(s.to_string()),
        }
    }

    /// `true` for states that will not change without a new operation.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::InProgress(_))
    }

    /// `true` when the stack exists and its last operation applied cleanly.
    #[must_use]
    pub fn is_healthy(&self) -> bool {
        matches!(self, Self::CreateComplete | Self::UpdateComplete)
    }
}

impl fmt::Display for StackStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::CreateComplete => f.write_str("CREATE_COMPLETE"),
            Self::UpdateComplete => f.write_str("UPDATE_COMPLETE"),
            Self::NotFound => f.write_str("NOT_FOUND"),
            Self::InProgress(s) | Self::RolledBack(s) | Self::Failed(s) => f.write_str(s),
        }
    }
}

/// Result of waiting for a stack to reach a target status.
///
/// `Timeout` means the local wait ended; it never implies success.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WaitOutcome {
    Reached(StackStatus),
    /// A terminal status other than the target was observed.
    Terminal(StackStatus),
    Timeout,
}

impl WaitOutcome {
    #[must_use]
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Reached(_))
    }
}

/// Status of an asynchronously executed remote command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemoteCommandStatus {
    Pending,
    InProgress,
    Success,
    Failed,
    Cancelled,
    TimedOut,
}

impl RemoteCommandStatus {
    /// Parse a provider status string. Unrecognised values stay non-terminal
    /// so the poller keeps waiting rather than guessing an outcome.
    #[must_use]
    pub fn parse(raw: &str) -> Self {
        match raw {
            "Success" => Self::Success,
            "Failed" | "Undeliverable" | "Terminated" => Self::Failed,
            "Cancelled" => Self::Cancelled,
            "TimedOut" | "DeliveryTimedOut" | "ExecutionTimedOut" => Self::TimedOut,
            "InProgress" | "Delayed" | "Cancelling" => Self::InProgress,
            _ => Self::Pending,
        }
    }

    #[must_use]
    pub fn is_terminal(self) -> bool {
        !matches!(self, Self::Pending | Self::InProgress)
    }
}

/// Final classification of a submitted remote command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollOutcome {
    Success { stdout: String, polls: u32 },
    Failed { reason: String, polls: u32 },
    Cancelled { reason: String, polls: u32 },
    /// Remote side reported a timeout, or the local attempt ceiling was hit.
    TimedOut { reason: String, polls: u32 },
}

impl PollOutcome {
    #[must_use]
    pub fn polls(&self) -> u32 {
        match self {
            Self::Success { polls, .. }
            | Self::Failed { polls, .. }
            | Self::Cancelled { polls, .. }
            | Self::TimedOut { polls, .. } => *polls,
        }
    }

    #[must_use]
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }
}
