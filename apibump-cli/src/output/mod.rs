//! Output formatting for the apibump CLI.
//!
//! Results render as coloured text with tables (default), Markdown for pull
//! request comments, or JSON for machines. Colours are disabled when stdout
//! is not a terminal unless the configuration forces them.

use std::io::IsTerminal;
use std::str::FromStr;

use clap::ValueEnum;
use serde::Serialize;

mod json;
mod table;

pub use self::json::JsonOutput;
pub use self::table::TableOutput;

/// Output format for CLI results
#[derive(Debug, Clone, Copy, Default, ValueEnum, PartialEq, Eq)]
pub enum OutputFormat {
    /// Human-readable text with tables (default)
    #[default]
    Text,
    /// Markdown, for pull request comments
    Md,
    /// JSON format for machine consumption
    Json,
}

impl FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "text" | "table" => Ok(OutputFormat::Text),
            "md" | "markdown" => Ok(OutputFormat::Md),
            "json" => Ok(OutputFormat::Json),
            _ => Err(format!("Unknown output format: '{}'", s)),
        }
    }
}

/// Configuration for output rendering
#[derive(Debug, Clone)]
pub struct OutputConfig {
    pub format: OutputFormat,
    /// Disable colored output
    pub no_color: bool,
    /// Wrap tables to this width
    pub width: Option<usize>,
}

impl OutputConfig {
    pub fn new(format: OutputFormat) -> Self {
        Self {
            format,
            no_color: false,
            width: None,
        }
    }

    /// Detect colour support from stdout, with an optional override.
    pub fn auto_detect(format: OutputFormat, color_override: Option<bool>) -> Self {
        let is_tty = std::io::stdout().is_terminal();
        let config = Self::new(format);
        if color_override.unwrap_or(is_tty) {
            config
        } else {
            config.without_colors()
        }
    }

    pub fn use_colors(&self) -> bool {
        !self.no_color
    }

    pub fn without_colors(mut self) -> Self {
        self.no_color = true;
        self
    }

    pub fn with_width(mut self, width: usize) -> Self {
        self.width = Some(width);
        self
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self::auto_detect(OutputFormat::Text, None)
    }
}

/// Types that can be rendered in every output format.
pub trait Outputter: Serialize {
    fn to_text(&self, config: &OutputConfig) -> String;

    fn to_markdown(&self, config: &OutputConfig) -> String {
        self.to_text(config)
    }

    fn to_json(&self, _config: &OutputConfig) -> String {
        JsonOutput::format(self)
    }

    /// Render using the format specified in config
    fn render(&self, config: &OutputConfig) -> String {
        match config.format {
            OutputFormat::Text => self.to_text(config),
            OutputFormat::Md => self.to_markdown(config),
            OutputFormat::Json => self.to_json(config),
        }
    }
}

/// A result paired with how to render it.
pub struct Output<T> {
    data: T,
    config: OutputConfig,
}

impl<T: Outputter> Output<T> {
    pub fn new(data: T, config: OutputConfig) -> Self {
        Self { data, config }
    }

    /// Print to stdout
    pub fn render(&self) -> anyhow::Result<()> {
        println!("{}", self.render_to_string().trim_end());
        Ok(())
    }

    pub fn render_to_string(&self) -> String {
        self.data.render(&self.config)
    }
}
