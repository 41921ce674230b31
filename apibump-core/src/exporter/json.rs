//! JSON format exporter.

use super::ExportConfig;
use crate::decision::Decision;
use crate::error::CoreResult;

/// Export a decision in its external JSON shape.
pub fn export(decision: &Decision, config: &ExportConfig) -> CoreResult<String> {
    let output = if config.pretty_print {
        serde_json::to_string_pretty(decision)?
    } else {
        serde_json::to_string(decision)?
    };
    Ok(output)
}
