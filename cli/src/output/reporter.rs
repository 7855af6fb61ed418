//! `TerminalReporter`: presentation-layer implementation of `ProgressReporter`.
//!
//! Wraps `&OutputContext` and implements the `application::ports::ProgressReporter`
//! trait so application services can emit progress events without depending on
//! any presentation type directly.

use std::sync::{Mutex, PoisonError};

use indicatif::ProgressBar;
use owo_colors::OwoColorize as _;

use crate::application::ports::ProgressReporter;
use crate::output::{OutputContext, progress};

/// Terminal progress reporter that wraps an `OutputContext`.
///
/// - `step()` starts a spinner on a TTY, or prints `"  → {message}"`
/// - `success()` settles the spinner with `✓`
/// - `warn()` settles the spinner with `!`
///
/// Everything is suppressed when `ctx.quiet`.
pub struct TerminalReporter<'a> {
    ctx: &'a OutputContext,
    animate: bool,
    current: Mutex<Option<ProgressBar>>,
}

impl<'a> TerminalReporter<'a> {
    /// Create a reporter. `animate` enables spinners when stdout is a TTY.
    #[must_use]
    pub fn new(ctx: &'a OutputContext, animate: bool) -> Self {
        Self {
            ctx,
            animate: animate && ctx.show_progress(),
            current: Mutex::new(None),
        }
    }

    fn take(&self) -> Option<ProgressBar> {
        self.current
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
    }

    fn settle(&self, symbol: String, message: &str) {
        match self.take() {
            Some(pb) => progress::finish_with(&pb, symbol, message),
            None => println!("  {symbol} {message}"),
        }
    }
}

impl ProgressReporter for TerminalReporter<'_> {
    fn step(&self, message: &str) {
        if self.ctx.quiet {
            return;
        }
        if let Some(previous) = self.take() {
            previous.finish_and_clear();
        }
        if self.animate {
            *self.current.lock().unwrap_or_else(PoisonError::into_inner) =
                Some(progress::spinner(message));
        } else {
            println!("  {} {message}", "→".style(self.ctx.styles.info));
        }
    }

    fn success(&self, message: &str) {
        if !self.ctx.quiet {
            self.settle("✓".style(self.ctx.styles.success).to_string(), message);
        }
    }

    fn warn(&self, message: &str) {
        if !self.ctx.quiet {
            self.settle("!".style(self.ctx.styles.warning).to_string(), message);
        }
    }
}

impl Drop for TerminalReporter<'_> {
    fn drop(&mut self) {
        if let Some(pb) = self.take() {
            pb.finish_and_clear();
        }
    }
}
