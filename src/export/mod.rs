//! Rendering flattened rows into output formats.

use crate::expand::ExpansionStats;
use crate::flatten::{headers, ExportRow};
use serde::Serialize;

/// Output format for flattened exports
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum OutputFormat {
    /// ASCII table format (default)
    #[default]
    Table,
    /// CSV format
    Csv,
    /// Tab-separated values
    Tsv,
    /// JSON document with rows and expansion stats
    Json,
    /// JSON lines format (one row object per line)
    JsonLines,
}

impl OutputFormat {
    /// Detect a format from an output file extension
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_lowercase().as_str() {
            "csv" => Some(OutputFormat::Csv),
            "tsv" => Some(OutputFormat::Tsv),
            "json" => Some(OutputFormat::Json),
            "jsonl" | "ndjson" => Some(OutputFormat::JsonLines),
            "txt" => Some(OutputFormat::Table),
            _ => None,
        }
    }
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "table" => Ok(OutputFormat::Table),
            "csv" => Ok(OutputFormat::Csv),
            "tsv" => Ok(OutputFormat::Tsv),
            "json" => Ok(OutputFormat::Json),
            "jsonl" | "jsonlines" | "ndjson" => Ok(OutputFormat::JsonLines),
            _ => Err(format!(
                "Unknown format: {}. Valid: table, csv, tsv, json, jsonl",
                s
            )),
        }
    }
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OutputFormat::Table => write!(f, "table"),
            OutputFormat::Csv => write!(f, "csv"),
            OutputFormat::Tsv => write!(f, "tsv"),
            OutputFormat::Json => write!(f, "json"),
            OutputFormat::JsonLines => write!(f, "jsonl"),
        }
    }
}

/// JSON document for the flattened export
#[derive(Debug, Serialize)]
struct ExportJson<'a> {
    rows: &'a [ExportRow],
    stats: &'a ExpansionStats,
}

/// Formatter for flattened export rows
pub struct RowFormatter;

impl RowFormatter {
    /// Format rows and expansion stats to a string
    pub fn format(
        rows: &[ExportRow],
        stats: &ExpansionStats,
        format: OutputFormat,
        include_hidden: bool,
    ) -> String {
        match format {
            OutputFormat::Table => Self::format_table(rows, stats, include_hidden),
            OutputFormat::Csv => Self::format_csv(rows, include_hidden),
            OutputFormat::Tsv => Self::format_tsv(rows, include_hidden),
            OutputFormat::Json => Self::format_json(rows, stats),
            OutputFormat::JsonLines => Self::format_jsonl(rows),
        }
    }

    /// Format as ASCII table with the stats footer
    fn format_table(rows: &[ExportRow], stats: &ExpansionStats, include_hidden: bool) -> String {
        let columns = headers(include_hidden);
        let cells: Vec<Vec<String>> = rows.iter().map(|r| r.cells(include_hidden)).collect();

        // Calculate column widths
        let mut widths: Vec<usize> = columns.iter().map(|c| c.len()).collect();
        for row in &cells {
            for (i, val) in row.iter().enumerate() {
                if i < widths.len() {
                    widths[i] = widths[i].max(val.len());
                }
            }
        }

        // Cap widths at 50 chars for readability
        let max_width = 50;
        widths.iter_mut().for_each(|w| *w = (*w).min(max_width));

        let mut output = String::new();

        // Top border
        output.push('┌');
        for (i, width) in widths.iter().enumerate() {
            output.push_str(&"─".repeat(*width + 2));
            if i < widths.len() - 1 {
                output.push('┬');
            }
        }
        output.push_str("┐\n");

        // Header row
        output.push('│');
        for (i, col) in columns.iter().enumerate() {
            let truncated = Self::truncate(col, widths[i]);
            output.push_str(&format!(" {:width$} │", truncated, width = widths[i]));
        }
        output.push('\n');

        // Header separator
        output.push('├');
        for (i, width) in widths.iter().enumerate() {
            output.push_str(&"─".repeat(*width + 2));
            if i < widths.len() - 1 {
                output.push('┼');
            }
        }
        output.push_str("┤\n");

        // Data rows
        for row in &cells {
            output.push('│');
            for (i, val) in row.iter().enumerate() {
                if i < widths.len() {
                    let flat = val.replace('\n', " ");
                    let truncated = Self::truncate(&flat, widths[i]);
                    output.push_str(&format!(" {:width$} │", truncated, width = widths[i]));
                }
            }
            output.push('\n');
        }

        // Bottom border
        output.push('└');
        for (i, width) in widths.iter().enumerate() {
            output.push_str(&"─".repeat(*width + 2));
            if i < widths.len() - 1 {
                output.push('┴');
            }
        }
        output.push_str("┘\n");

        output.push_str(&format!(
            "{} row{}, {}\n",
            rows.len(),
            if rows.len() == 1 { "" } else { "s" },
            stats
        ));

        output
    }

    /// Truncate a string to a maximum length
    fn truncate(s: &str, max_len: usize) -> String {
        if s.chars().count() <= max_len {
            s.to_string()
        } else {
            let cut: String = s.chars().take(max_len.saturating_sub(1)).collect();
            format!("{}…", cut)
        }
    }

    /// Format as a JSON document with rows and stats
    fn format_json(rows: &[ExportRow], stats: &ExpansionStats) -> String {
        let doc = ExportJson { rows, stats };
        serde_json::to_string_pretty(&doc).unwrap_or_else(|_| "{}".to_string())
    }

    /// Format as JSON lines (NDJSON), one row object per line
    fn format_jsonl(rows: &[ExportRow]) -> String {
        rows.iter()
            .map(|row| serde_json::to_string(row).unwrap_or_else(|_| "{}".to_string()))
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Format as CSV
    fn format_csv(rows: &[ExportRow], include_hidden: bool) -> String {
        let mut output = String::new();

        let header: Vec<String> = headers(include_hidden)
            .iter()
            .map(|h| h.to_string())
            .collect();
        output.push_str(&Self::csv_row(&header));
        output.push('\n');

        for row in rows {
            output.push_str(&Self::csv_row(&row.cells(include_hidden)));
            output.push('\n');
        }

        output
    }

    /// Format a single CSV row
    fn csv_row(values: &[String]) -> String {
        values
            .iter()
            .map(|v| Self::csv_escape(v))
            .collect::<Vec<_>>()
            .join(",")
    }

    /// Escape a value for CSV
    fn csv_escape(val: &str) -> String {
        if val.contains(',') || val.contains('"') || val.contains('\n') || val.contains('\r') {
            format!("\"{}\"", val.replace('"', "\"\""))
        } else {
            val.to_string()
        }
    }

    /// Format as TSV
    fn format_tsv(rows: &[ExportRow], include_hidden: bool) -> String {
        let mut output = String::new();

        output.push_str(&headers(include_hidden).join("\t"));
        output.push('\n');

        for row in rows {
            let escaped: Vec<String> = row
                .cells(include_hidden)
                .iter()
                .map(|v| v.replace('\t', "\\t").replace('\n', "\\n"))
                .collect();
            output.push_str(&escaped.join("\t"));
            output.push('\n');
        }

        output
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::TableId;

    fn sample_rows() -> Vec<ExportRow> {
        vec![
            ExportRow {
                id: "1".to_string(),
                table_id: TableId(1),
                table_name: "Order".to_string(),
                field_name: "Line".to_string(),
                description: "Line number".to_string(),
                data_type: "String".to_string(),
                is_key: true,
                is_calculated: false,
                referenced_table: None,
                referenced_table_id: None,
                display_on_export: true,
                is_extended: false,
                created_at: String::new(),
            },
            ExportRow {
                id: "2.000001".to_string(),
                table_id: TableId(1),
                table_name: "Order".to_string(),
                field_name: "    Part.Name".to_string(),
                description: "[From Part] Part name, with commas".to_string(),
                data_type: "String".to_string(),
                is_key: false,
                is_calculated: false,
                referenced_table: None,
                referenced_table_id: None,
                display_on_export: true,
                is_extended: true,
                created_at: String::new(),
            },
        ]
    }

    #[test]
    fn test_format_parsing() {
        assert_eq!("csv".parse::<OutputFormat>().unwrap(), OutputFormat::Csv);
        assert_eq!(
            "JSONL".parse::<OutputFormat>().unwrap(),
            OutputFormat::JsonLines
        );
        assert!("bogus".parse::<OutputFormat>().is_err());
        assert_eq!(OutputFormat::from_extension("csv"), Some(OutputFormat::Csv));
        assert_eq!(
            OutputFormat::from_extension("ndjson"),
            Some(OutputFormat::JsonLines)
        );
        assert_eq!(OutputFormat::from_extension("xlsx"), None);
        assert_eq!(OutputFormat::Table.to_string(), "table");
    }

    #[test]
    fn test_format_table() {
        let stats = ExpansionStats {
            leaves: 1,
            ..Default::default()
        };
        let output = RowFormatter::format(&sample_rows(), &stats, OutputFormat::Table, false);
        assert!(output.contains("table_name"));
        assert!(output.contains("Part.Name"));
        assert!(output.contains("2 rows, 1 leaves"));
        // Hidden identity columns stay out of the table
        assert!(!output.contains("referenced_table_id"));
    }

    #[test]
    fn test_format_csv_escapes_commas() {
        let output = RowFormatter::format(
            &sample_rows(),
            &ExpansionStats::default(),
            OutputFormat::Csv,
            false,
        );
        assert!(output.starts_with("table_name,is_key,field_name,is_calculated,"));
        assert!(output.contains("\"[From Part] Part name, with commas\""));
    }

    #[test]
    fn test_format_csv_include_hidden() {
        let output = RowFormatter::format(
            &sample_rows(),
            &ExpansionStats::default(),
            OutputFormat::Csv,
            true,
        );
        assert!(output.contains("referenced_table_id"));
        assert!(output.contains("2.000001"));
    }

    #[test]
    fn test_format_json_document() {
        let stats = ExpansionStats {
            leaves: 1,
            ..Default::default()
        };
        let output = RowFormatter::format(&sample_rows(), &stats, OutputFormat::Json, false);
        let parsed: serde_json::Value = serde_json::from_str(&output).unwrap();
        assert_eq!(parsed["rows"].as_array().unwrap().len(), 2);
        assert_eq!(parsed["rows"][1]["is_extended"], true);
        assert_eq!(parsed["stats"]["leaves"], 1);
    }

    #[test]
    fn test_format_jsonl() {
        let output = RowFormatter::format(
            &sample_rows(),
            &ExpansionStats::default(),
            OutputFormat::JsonLines,
            false,
        );
        let lines: Vec<&str> = output.lines().collect();
        assert_eq!(lines.len(), 2);
        let first: serde_json::Value = serde_json::from_str(lines[0]).unwrap();
        assert_eq!(first["field_name"], "Line");
    }

    #[test]
    fn test_csv_escape() {
        assert_eq!(RowFormatter::csv_escape("hello"), "hello");
        assert_eq!(RowFormatter::csv_escape("hello,world"), "\"hello,world\"");
        assert_eq!(RowFormatter::csv_escape("say \"hi\""), "\"say \"\"hi\"\"\"");
    }
}
