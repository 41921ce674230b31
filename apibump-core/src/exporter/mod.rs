//! Report exporters.
//!
//! JSON is the machine contract: a [`Decision`](crate::decision::Decision)
//! serialises to `{level, confidence, reasons, impacts}`. Markdown is meant
//! for pull request comments.

pub mod json;
pub mod markdown;

/// Shared exporter options.
#[derive(Clone, Debug)]
pub struct ExportConfig {
    pub pretty_print: bool,
    /// Append extraction diagnostics to Markdown output.
    pub include_diagnostics: bool,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            pretty_print: true,
            include_diagnostics: false,
        }
    }
}
