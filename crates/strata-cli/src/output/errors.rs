//! Error message formatting with actionable suggestions

use std::error::Error;

use strata_core::StrataError;

use super::colors::ColorSupport;

pub struct ErrorFormatter {
    colors: ColorSupport,
}

impl ErrorFormatter {
    pub fn new() -> Self {
        Self {
            colors: ColorSupport::detect(),
        }
    }

    /// Message, error code, suggestion and source chain
    pub fn format_error(&self, error: &StrataError) -> String {
        let mut output = String::new();

        output.push_str(&self.colors.red("error"));
        output.push_str(&format!("[{}]: ", error.code()));
        output.push_str(&error.to_string());
        output.push('\n');

        if let Some(suggestion) = error.suggestion() {
            output.push_str(&self.colors.dim("help"));
            output.push_str(": ");
            output.push_str(suggestion);
            output.push('\n');
        }

        let mut source = error.source();
        while let Some(err) = source {
            output.push_str(&self.colors.dim("caused by"));
            output.push_str(": ");
            output.push_str(&err.to_string());
            output.push('\n');
            source = err.source();
        }

        output
    }
}

impl Default for ErrorFormatter {
    fn default() -> Self {
        Self::new()
    }
}
