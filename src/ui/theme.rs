//! Semantic color helpers built on owo-colors.
//!
//! Every helper returns plain text when colors are disabled.

use owo_colors::{OwoColorize, Style as Paint};
use std::fmt::Display;

use crate::output;

fn paint<T: Display>(text: T, style: Paint) -> String {
    if output::is_no_color() {
        text.to_string()
    } else {
        text.style(style).to_string()
    }
}

/// Styles for different semantic elements.
pub struct Style;

impl Style {
    /// Section headers ("Configured providers", model card titles).
    pub fn header<T: Display>(text: T) -> String {
        paint(text, Paint::new().bold())
    }

    pub fn label<T: Display>(text: T) -> String {
        paint(text, Paint::new().dimmed())
    }

    /// Provider and model names.
    pub fn value<T: Display>(text: T) -> String {
        paint(text, Paint::new().cyan())
    }

    /// Endpoints, descriptions and other supplementary details.
    pub fn secondary<T: Display>(text: T) -> String {
        paint(text, Paint::new().dimmed())
    }

    pub fn success<T: Display>(text: T) -> String {
        paint(text, Paint::new().green())
    }

    pub fn error<T: Display>(text: T) -> String {
        paint(text, Paint::new().red().bold())
    }

    pub fn warning<T: Display>(text: T) -> String {
        paint(text, Paint::new().yellow())
    }

    /// Language codes.
    pub fn code<T: Display>(text: T) -> String {
        paint(text, Paint::new().yellow())
    }

    pub fn hint<T: Display>(text: T) -> String {
        paint(text, Paint::new().dimmed().italic())
    }

    pub fn default_marker() -> String {
        paint("(default)", Paint::new().dimmed())
    }
}
