//! Infrastructure implementation of the `CommandRunner` port.
//!
//! `TokioCommandRunner` is the production implementation that uses tokio
//! for async process execution with guaranteed timeout and kill on all platforms.

use std::process::Stdio;

use anyhow::{Context, Result};
use async_trait::async_trait;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::time::Instant;

use crate::application::ports::{CommandOutcome, CommandRunner, CommandSpec};

/// Production `CommandRunner`.
///
/// Dropping a `tokio::time::timeout` future does not reliably kill the
/// child on every platform, so the deadline is raced with `tokio::select!`
/// and the child is killed explicitly when it fires.
#[derive(Debug, Default, Clone, Copy)]
pub struct TokioCommandRunner;

impl TokioCommandRunner {
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

/// Drain a child pipe line by line, optionally echoing to the log.
async fn collect<R: AsyncRead + Unpin>(
    pipe: Option<R>,
    program: &str,
    stream: &'static str,
    echo: bool,
) -> String {
    let Some(pipe) = pipe else {
        return String::new();
    };
    let mut lines = BufReader::new(pipe).lines();
    let mut buf = String::new();
    while let Ok(Some(line)) = lines.next_line().await {
        if echo {
            tracing::info!(target: "strata::command", program, stream, "{line}");
        }
        buf.push_str(&line);
        buf.push('\n');
    }
    buf
}

#[async_trait]
impl CommandRunner for TokioCommandRunner {
    async fn run(&self, spec: &CommandSpec) -> Result<CommandOutcome> {
        let program = spec.program.as_str();
        let mut command = tokio::process::Command::new(program);
        command
            .args(&spec.args)
            .envs(&spec.env)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        if let Some(dir) = &spec.working_dir {
            command.current_dir(dir);
        }
        tracing::debug!(command = %spec.display(), dir = ?spec.working_dir, "spawning");

        let started = Instant::now();
        let mut child = command
            .spawn()
            .with_context(|| format!("failed to spawn {program}"))?;
        let stdout_handle = child.stdout.take();
        let stderr_handle = child.stderr.take();
        let echo = spec.stream_output;

        tokio::select! {
            result = async {
                let (status, stdout, stderr) = tokio::join!(
                    child.wait(),
                    collect(stdout_handle, program, "stdout", echo),
                    collect(stderr_handle, program, "stderr", echo),
                );
                let status = status.with_context(|| format!("waiting for {program}"))?;
                Ok(CommandOutcome {
                    success: status.success(),
                    stdout,
                    stderr,
                    exit_code: status.code(),
                    duration: started.elapsed(),
                    timed_out: false,
                })
            } => result,
            () = tokio::time::sleep(spec.timeout) => {
                if let Err(e) = child.kill().await {
                    tracing::warn!(command = %spec.display(), error = %e, "failed to kill timed-out command");
                }
                tracing::warn!(command = %spec.display(), timeout_secs = spec.timeout.as_secs(), "command killed at deadline");
                Ok(CommandOutcome {
                    success: false,
                    stdout: String::new(),
                    stderr: format!("{program} timed out after {}s", spec.timeout.as_secs()),
                    exit_code: None,
                    duration: started.elapsed(),
                    timed_out: true,
                })
            }
        }
    }
}
