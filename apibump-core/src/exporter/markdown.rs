//! Markdown format exporter.

use super::ExportConfig;
use crate::engine::Report;

/// Export a report as a Markdown summary.
pub fn export(report: &Report, config: &ExportConfig) -> String {
    let decision = &report.decision;
    let mut lines = vec![format!("**apibump** suggests: `{}`", decision.level)];
    lines.push(String::new());

    if decision.impacts.is_empty() {
        lines.push("_No interface changes detected._".to_string());
    } else {
        for impact in &decision.impacts {
            lines.push(format!(
                "- **{}** `{}`: {}",
                impact.severity, impact.symbol, impact.description
            ));
        }
    }

    if config.include_diagnostics && !report.diagnostics.is_empty() {
        lines.push(String::new());
        lines.push("<details><summary>Diagnostics</summary>".to_string());
        lines.push(String::new());
        for entry in &report.diagnostics {
            lines.push(format!("- `{}` {}", entry.domain, entry.diagnostic));
        }
        lines.push(String::new());
        lines.push("</details>".to_string());
    }

    lines.push(String::new());
    lines.join("\n")
}
