//! Terminal color support detection.
//!
//! Respects `NO_COLOR` and only colors output when both streams are
//! terminals.

use std::env;
use std::io::{self, IsTerminal};

pub struct ColorSupport {
    enabled: bool,
}

impl ColorSupport {
    pub fn detect() -> Self {
        let enabled = env::var("NO_COLOR").is_err() && io::stderr().is_terminal() && io::stdout().is_terminal();
        Self { enabled }
    }

    #[cfg(test)]
    pub fn disabled() -> Self {
        Self { enabled: false }
    }

    fn paint(&self, code: &str, text: &str) -> String {
        if self.enabled {
            format!("\x1b[{}m{}\x1b[0m", code, text)
        } else {
            text.to_string()
        }
    }

    pub fn green(&self, text: &str) -> String {
        self.paint("32", text)
    }

    pub fn yellow(&self, text: &str) -> String {
        self.paint("33", text)
    }

    pub fn red(&self, text: &str) -> String {
        self.paint("31", text)
    }

    /// Dim/gray
    pub fn dim(&self, text: &str) -> String {
        self.paint("2", text)
    }
}
