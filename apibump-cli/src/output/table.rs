//! Table output formatting using the `tabled` crate

use tabled::builder::Builder;
use tabled::settings::{object::Columns, style::Style, Alignment, Modify, Width};

use super::OutputConfig;

/// Table output formatter
pub struct TableOutput;

impl TableOutput {
    /// Build a rounded table from rows of strings. Columns listed in
    /// `right_aligned` are right aligned.
    pub fn from_rows(
        headers: &[&str],
        rows: &[Vec<String>],
        right_aligned: &[usize],
        config: &OutputConfig,
    ) -> String {
        if rows.is_empty() {
            return "(no results)".to_string();
        }

        let mut builder = Builder::default();
        builder.push_record(headers.iter().copied());
        for row in rows {
            builder.push_record(row.iter().map(|s| s.as_str()));
        }

        let mut table = builder.build();
        table.with(Style::rounded());
        for column in right_aligned {
            table.with(Modify::new(Columns::single(*column)).with(Alignment::right()));
        }
        if let Some(width) = config.width {
            table.with(Width::wrap(width));
        }

        table.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::output::OutputFormat;

    #[test]
    fn test_from_rows() {
        let config = OutputConfig::new(OutputFormat::Text);
        let rows = vec![
            vec!["major".to_string(), "pkg:f".to_string()],
            vec!["minor".to_string(), "pkg:g".to_string()],
        ];

        let output = TableOutput::from_rows(&["Severity", "Symbol"], &rows, &[], &config);
        assert!(output.contains("Severity"));
        assert!(output.contains("pkg:g"));
        assert!(output.contains('╭'));
    }

    #[test]
    fn test_empty_rows() {
        let config = OutputConfig::new(OutputFormat::Text);
        assert_eq!(TableOutput::from_rows(&["A"], &[], &[], &config), "(no results)");
    }
}
