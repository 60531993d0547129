//! Semantic color palette for terminal output.

use owo_colors::{OwoColorize, Style};

fn error_style() -> Style {
    Style::new().red().bold()
}

fn warning_style() -> Style {
    Style::new().yellow()
}

fn muted_style() -> Style {
    Style::new().dimmed()
}

fn header_style() -> Style {
    Style::new().bold()
}

/// Trait extension to apply semantic styles.
pub trait SemanticStyle: Sized {
    /// Apply error styling (red bold).
    fn error(&self) -> String;
    /// Apply warning styling (yellow).
    fn warning(&self) -> String;
    /// Apply muted styling (dimmed).
    fn muted(&self) -> String;
    /// Apply header styling (bold).
    fn header(&self) -> String;
}

impl<T: std::fmt::Display> SemanticStyle for T {
    fn error(&self) -> String {
        styled(self, error_style())
    }

    fn warning(&self) -> String {
        styled(self, warning_style())
    }

    fn muted(&self) -> String {
        styled(self, muted_style())
    }

    fn header(&self) -> String {
        styled(self, header_style())
    }
}

fn styled(value: &impl std::fmt::Display, style: Style) -> String {
    if super::no_color() {
        value.to_string()
    } else {
        value.style(style).to_string()
    }
}
