//! Decide command - recommend a version bump between two references
//!
//! Reads both references through git (or two directories with
//! `--source dir`), runs every enabled analyser and prints the decision.
//! Extraction diagnostics go to stderr and never change the decision.

use std::path::PathBuf;
use std::time::Instant;

use anyhow::Context;
use apibump_core::exporter::{json, markdown, ExportConfig};
use apibump_core::{
    analyse, AnalyserRegistry, BumpLevel, DirectorySnapshotProvider, Report, Severity,
    SnapshotProvider,
};
use clap::ValueEnum;
use colored::{ColoredString, Colorize};
use serde::Serialize;

use crate::config::ApibumpConfig;
use crate::git::GitSnapshotProvider;
use crate::output::{JsonOutput, Output, OutputConfig, Outputter, TableOutput};

/// Where references are read from.
#[derive(Debug, Clone, Copy, Default, ValueEnum, PartialEq, Eq)]
pub enum Source {
    /// References are git revisions of the current repository
    #[default]
    Git,
    /// References are directories
    Dir,
}

/// Options of `apibump decide`.
#[derive(Debug, Clone)]
pub struct DecideOptions {
    pub base: String,
    pub head: String,
    pub source: Source,
    pub enable: Vec<String>,
    pub disable: Vec<String>,
    pub quiet: bool,
}

/// Decision plus context for rendering.
#[derive(Debug, Serialize)]
pub struct DecideResult {
    pub base: String,
    pub head: String,
    pub report: Report,
    pub duration_ms: u64,
}

fn level_label(level: BumpLevel) -> ColoredString {
    let label = level.as_str().to_uppercase();
    match level {
        BumpLevel::Major => label.red().bold(),
        BumpLevel::Minor => label.yellow().bold(),
        BumpLevel::Patch => label.green().bold(),
        BumpLevel::None => label.dimmed(),
    }
}

fn severity_label(severity: Severity) -> ColoredString {
    match severity {
        Severity::Major => severity.as_str().red(),
        Severity::Minor => severity.as_str().yellow(),
        Severity::Patch => severity.as_str().green(),
    }
}

impl Outputter for DecideResult {
    fn to_text(&self, config: &OutputConfig) -> String {
        let decision = &self.report.decision;
        let mut output = String::new();

        output.push_str(&format!(
            "{} {} -> {}\n",
            "COMPARE:".cyan().bold(),
            self.base.yellow(),
            self.head.green()
        ));
        output.push_str(&format!(
            "Suggested bump: {} (confidence {:.2}, {}ms)\n",
            level_label(decision.level),
            decision.confidence,
            self.duration_ms
        ));

        if decision.impacts.is_empty() {
            output.push_str(&format!(
                "\n{}\n",
                "(no API-impacting changes detected)".dimmed()
            ));
            return output;
        }

        let rows: Vec<Vec<String>> = decision
            .impacts
            .iter()
            .map(|impact| {
                vec![
                    severity_label(impact.severity).to_string(),
                    impact.domain.clone(),
                    impact.symbol.clone(),
                    impact.description.clone(),
                ]
            })
            .collect();
        output.push('\n');
        output.push_str(&TableOutput::from_rows(
            &["Severity", "Domain", "Symbol", "Reason"],
            &rows,
            &[],
            config,
        ));
        output.push('\n');

        let summary: Vec<String> = self
            .report
            .domains
            .iter()
            .filter(|d| d.impacts.total() > 0)
            .map(|d| format!("{}: {}", d.name, d.impacts.text()))
            .collect();
        if !summary.is_empty() {
            output.push_str(&format!("\n{}\n", summary.join("; ").dimmed()));
        }
        output
    }

    fn to_markdown(&self, _config: &OutputConfig) -> String {
        markdown::export(&self.report, &ExportConfig::default())
    }

    /// Only the decision: its shape is the machine contract.
    fn to_json(&self, _config: &OutputConfig) -> String {
        json::export(&self.report.decision, &ExportConfig::default())
            .unwrap_or_else(|e| JsonOutput::format(&serde_json::json!({ "error": e.to_string() })))
    }
}

fn snapshot_provider(
    source: Source,
    config: &ApibumpConfig,
) -> anyhow::Result<Box<dyn SnapshotProvider>> {
    let filter = config.path_filter()?;
    Ok(match source {
        Source::Git => {
            let cwd = std::env::current_dir().context("Failed to read working directory")?;
            Box::new(GitSnapshotProvider::new(cwd, filter))
        }
        Source::Dir => Box::new(DirectorySnapshotProvider::new(filter)),
    })
}

fn print_diagnostics(report: &Report) {
    for entry in &report.diagnostics {
        eprintln!(
            "{} [{}/{}] {}",
            "WARNING:".yellow().bold(),
            entry.domain,
            entry.side.as_str(),
            entry.diagnostic
        );
    }
}

pub async fn run(
    options: DecideOptions,
    config: ApibumpConfig,
    output: OutputConfig,
) -> anyhow::Result<()> {
    let start = Instant::now();

    let registry = AnalyserRegistry::builtin();
    let settings = config.analysis_settings(&registry, &options.enable, &options.disable)?;
    let provider = snapshot_provider(options.source, &config)?;

    let (base, head) = match options.source {
        Source::Git => (options.base.clone(), options.head.clone()),
        Source::Dir => (absolute(&options.base)?, absolute(&options.head)?),
    };
    tracing::debug!("Comparing {} -> {} ({:?})", base, head, settings.enabled);

    let report = tokio::task::spawn_blocking(move || {
        analyse(&registry, provider.as_ref(), &settings, &base, &head)
    })
    .await
    .context("Analysis task failed")??;

    if !options.quiet {
        print_diagnostics(&report);
    }

    let result = DecideResult {
        base: options.base,
        head: options.head,
        report,
        duration_ms: start.elapsed().as_millis() as u64,
    };
    Output::new(result, output).render()
}

fn absolute(dir: &str) -> anyhow::Result<String> {
    let path = PathBuf::from(dir);
    let path = path
        .canonicalize()
        .with_context(|| format!("Directory does not exist: {}", dir))?;
    Ok(path.to_string_lossy().into_owned())
}
