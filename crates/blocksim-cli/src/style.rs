//! Semantic colors for terminal output.

use std::sync::atomic::{AtomicBool, Ordering};

use owo_colors::{OwoColorize, Style};

static NO_COLOR: AtomicBool = AtomicBool::new(false);

/// Disables colored output for the rest of the process.
pub fn set_no_color(value: bool) {
    NO_COLOR.store(value, Ordering::SeqCst);
}

fn no_color() -> bool {
    NO_COLOR.load(Ordering::SeqCst)
}

/// Applies a semantic style to anything displayable.
pub trait SemanticStyle {
    /// Green bold.
    fn success(&self) -> String;
    /// Red bold.
    fn error(&self) -> String;
    /// Yellow.
    fn warning(&self) -> String;
    /// Dimmed.
    fn muted(&self) -> String;
    /// Blue.
    fn code(&self) -> String;
}

fn styled<T: std::fmt::Display + ?Sized>(value: &T, style: Style) -> String {
    if no_color() {
        value.to_string()
    } else {
        value.style(style).to_string()
    }
}

impl<T: std::fmt::Display + ?Sized> SemanticStyle for T {
    fn success(&self) -> String {
        styled(self, Style::new().green().bold())
    }

    fn error(&self) -> String {
        styled(self, Style::new().red().bold())
    }

    fn warning(&self) -> String {
        styled(self, Style::new().yellow())
    }

    fn muted(&self) -> String {
        styled(self, Style::new().dimmed())
    }

    fn code(&self) -> String {
        styled(self, Style::new().blue())
    }
}
