//! Table output formatting using the `tabled` crate

use super::OutputConfig;
use tabled::{
    builder::Builder,
    settings::{object::Columns, style::Style, Alignment, Modify},
    Table,
};

/// Table output formatter
pub struct TableOutput;

impl TableOutput {
    /// Format a simple key-value table
    pub fn format_key_value(pairs: &[(&str, String)], config: &OutputConfig) -> String {
        let mut builder = Builder::default();
        for (key, value) in pairs {
            builder.push_record([*key, value.as_str()]);
        }

        let mut table = builder.build();
        Self::apply_style(&mut table, config);
        table.with(Modify::new(Columns::first()).with(Alignment::right()));
        table.to_string()
    }

    /// Create a simple table from rows of strings
    pub fn from_rows(headers: &[&str], rows: &[Vec<String>], config: &OutputConfig) -> String {
        if rows.is_empty() {
            return "(no results)".to_string();
        }

        let mut builder = Builder::default();
        builder.push_record(headers.iter().copied());
        for row in rows {
            builder.push_record(row.iter().map(|s| s.as_str()));
        }

        let mut table = builder.build();
        Self::apply_style(&mut table, config);
        table.to_string()
    }

    fn apply_style(table: &mut Table, config: &OutputConfig) {
        if config.compact {
            table.with(Style::blank());
        } else {
            table.with(Style::rounded());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::output::OutputFormat;

    #[test]
    fn test_key_value_table() {
        let pairs = vec![("Owners", "2".to_string()), ("Max degree", "1".to_string())];
        let config = OutputConfig::new(OutputFormat::Table);
        let output = TableOutput::format_key_value(&pairs, &config);

        assert!(output.contains("Owners"));
        assert!(output.contains("Max degree"));
    }

    #[test]
    fn test_from_rows() {
        let headers = vec!["Partner", "Importance"];
        let rows = vec![
            vec!["2".to_string(), "0.5000".to_string()],
            vec!["3".to_string(), "0.0000".to_string()],
        ];
        let config = OutputConfig::new(OutputFormat::Table);
        let output = TableOutput::from_rows(&headers, &rows, &config);

        assert!(output.contains("Partner"));
        assert!(output.contains("0.5000"));
    }

    #[test]
    fn test_empty_rows() {
        let config = OutputConfig::new(OutputFormat::Table);
        assert_eq!(TableOutput::from_rows(&["a"], &[], &config), "(no results)");
    }
}
