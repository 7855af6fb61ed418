//! Output styles using owo-colors stylesheet pattern

use owo_colors::Style;

use crate::domain::LayerStatus;

/// Centralized stylesheet for CLI output colors.
#[derive(Default, Clone)]
pub struct Styles {
    /// Success messages (green)
    pub success: Style,
    /// Warning messages (yellow)
    pub warning: Style,
    /// Error messages (red)
    pub error: Style,
    /// Info messages (blue)
    pub info: Style,
    /// Dimmed/secondary text
    pub dim: Style,
    /// Bold text
    pub bold: Style,
    /// Headers/section titles
    pub header: Style,
}

impl Styles {
    /// Apply colors to the stylesheet.
    pub fn colorize(&mut self) {
        self.success = Style::new().green();
        self.warning = Style::new().yellow();
        self.error = Style::new().red();
        self.info = Style::new().blue();
        self.dim = Style::new().dimmed();
        self.bold = Style::new().bold();
        self.header = Style::new().bold().cyan();
    }

    /// Style for a layer's final status in summaries.
    #[must_use]
    pub fn status(&self, status: LayerStatus) -> Style {
        match status {
            LayerStatus::OutputsCaptured => self.success,
            LayerStatus::Failed | LayerStatus::TimedOut | LayerStatus::DependencyFailed => {
                self.error
            }
            LayerStatus::SkippedDisabled | LayerStatus::Pending => self.dim,
            _ => self.warning,
        }
    }
}
