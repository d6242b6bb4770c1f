//! Console styling helpers

use indicatif::ProgressStyle;
use owo_colors::{OwoColorize, Stream, Style};
use std::fmt::Display;

/// Check mark used in success lines
pub const CHECK: &str = "✓";

/// Semantic styles for console output
///
/// Colors are dropped automatically when stdout is not a terminal.
pub trait Stylize: Display {
    /// Bold text for headings and names
    fn emphasis(&self) -> String {
        self.styled(Style::new().bold())
    }

    /// Highlighted values (branches, iids, tags)
    fn accent(&self) -> String {
        self.styled(Style::new().cyan())
    }

    /// Secondary information
    fn muted(&self) -> String {
        self.styled(Style::new().dimmed())
    }

    /// Completed actions
    fn success(&self) -> String {
        self.styled(Style::new().green())
    }

    /// Failures and warnings
    fn warn(&self) -> String {
        self.styled(Style::new().yellow())
    }

    #[doc(hidden)]
    fn styled(&self, style: Style) -> String {
        let text = self.to_string();
        format!(
            "{}",
            text.if_supports_color(Stream::Stdout, |t| t.style(style))
        )
    }
}

impl<T: Display + ?Sized> Stylize for T {}

/// Green check mark
pub fn check() -> String {
    CHECK.success()
}

/// Muted arrow for "from → to" lines
pub fn arrow() -> String {
    "→".muted()
}

/// Spinner style used while waiting on the host
pub fn spinner_style() -> ProgressStyle {
    ProgressStyle::with_template("{spinner:.cyan} {msg}")
        .unwrap_or_else(|_| ProgressStyle::default_spinner())
        .tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏ ")
}
