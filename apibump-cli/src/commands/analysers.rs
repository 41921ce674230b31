//! Analysers command - list registered domains and whether they run

use apibump_core::AnalyserRegistry;
use colored::Colorize;
use serde::Serialize;

use crate::config::ApibumpConfig;
use crate::output::{Output, OutputConfig, Outputter, TableOutput};

#[derive(Debug, Serialize)]
pub struct AnalyserInfo {
    pub name: String,
    pub description: String,
    pub enabled: bool,
}

#[derive(Debug, Serialize)]
pub struct AnalyserList {
    pub analysers: Vec<AnalyserInfo>,
}

impl Outputter for AnalyserList {
    fn to_text(&self, config: &OutputConfig) -> String {
        let rows: Vec<Vec<String>> = self
            .analysers
            .iter()
            .map(|a| {
                let state = if a.enabled {
                    "enabled".green().to_string()
                } else {
                    "disabled".dimmed().to_string()
                };
                vec![a.name.clone(), state, a.description.clone()]
            })
            .collect();
        TableOutput::from_rows(&["Analyser", "State", "Description"], &rows, &[], config)
    }

    fn to_markdown(&self, _config: &OutputConfig) -> String {
        let mut lines = vec![
            "| Analyser | Enabled | Description |".to_string(),
            "|---|---|---|".to_string(),
        ];
        for a in &self.analysers {
            lines.push(format!(
                "| `{}` | {} | {} |",
                a.name,
                if a.enabled { "yes" } else { "no" },
                a.description
            ));
        }
        lines.join("\n")
    }
}

/// Build the listing for the registry and the effective enabled set.
pub fn list(
    registry: &AnalyserRegistry,
    config: &ApibumpConfig,
    enable: &[String],
    disable: &[String],
) -> AnalyserList {
    let enabled = config.enabled_analysers(enable, disable);
    AnalyserList {
        analysers: registry
            .iter()
            .map(|a| AnalyserInfo {
                name: a.name.clone(),
                description: a.description.clone(),
                enabled: enabled.contains(&a.name),
            })
            .collect(),
    }
}

pub fn run(
    config: &ApibumpConfig,
    enable: &[String],
    disable: &[String],
    output: OutputConfig,
) -> anyhow::Result<()> {
    let registry = AnalyserRegistry::builtin();
    for name in config.enabled_analysers(enable, disable) {
        if !registry.contains(&name) {
            tracing::warn!("Analyser '{}' is not registered", name);
        }
    }
    Output::new(list(&registry, config, enable, disable), output).render()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::output::OutputFormat;

    #[test]
    fn test_list_marks_enabled() {
        let registry = AnalyserRegistry::builtin();
        let config = ApibumpConfig::default();

        let listing = list(&registry, &config, &["cli".to_string()], &[]);
        let enabled: Vec<(&str, bool)> = listing
            .analysers
            .iter()
            .map(|a| (a.name.as_str(), a.enabled))
            .collect();
        assert_eq!(
            enabled,
            vec![
                ("cli", true),
                ("migrations", false),
                ("openapi", false),
                ("signatures", true),
                ("web_routes", false),
            ]
        );

        let md = listing.render(&OutputConfig::new(OutputFormat::Md));
        assert!(md.contains("| `cli` | yes |"));
    }
}
