//! Progress spinner for long-running commands.
//!
//! The spinner draws to stderr so that stdout carries only the command output.

use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use std::time::Duration;

const SPINNER_TEMPLATE: &str = "[{elapsed_precise}] {spinner:.green} {msg}";
const SPINNER_CHARS: &str = "⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏ ";

/// Create a spinner for indeterminate operations
///
/// # Example
/// ```
/// use sleuth::cli::output::progress::create_spinner;
///
/// let spinner = create_spinner();
/// spinner.set_message("Planning...");
/// spinner.finish_and_clear();
/// ```
pub fn create_spinner() -> ProgressBar {
    let spinner = ProgressBar::with_draw_target(None, ProgressDrawTarget::stderr());
    spinner.set_style(
        ProgressStyle::default_spinner()
            .template(SPINNER_TEMPLATE)
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_chars(SPINNER_CHARS),
    );
    spinner.enable_steady_tick(Duration::from_millis(80));
    spinner
}

/// Extension trait for ProgressBar to add common utility methods
pub trait ProgressBarExt {
    /// Finish with a success message (green checkmark)
    fn finish_success(&self, message: impl Into<String>);

    /// Finish with an error message (red X)
    fn finish_error(&self, message: impl Into<String>);

    /// Print a line above the spinner
    fn note(&self, symbol: &str, message: impl Into<String>);
}

impl ProgressBarExt for ProgressBar {
    fn finish_success(&self, message: impl Into<String>) {
        self.finish_with_message(format!("✓ {}", message.into()));
    }

    fn finish_error(&self, message: impl Into<String>) {
        self.finish_with_message(format!("✗ {}", message.into()));
    }

    fn note(&self, symbol: &str, message: impl Into<String>) {
        self.println(format!("  {symbol} {}", message.into()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_spinner_finish() {
        let spinner = create_spinner();
        spinner.set_message("working");
        spinner.finish_success("done");
        assert!(spinner.is_finished());
        assert_eq!(spinner.message(), "✓ done");
    }
}
