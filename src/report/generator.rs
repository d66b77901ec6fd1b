//! Result table rendering.
//!
//! This module turns a result table into text for the terminal:
//! an aligned plain-text table, a Markdown table or JSON.

use crate::models::{ResultTable, RunSummary};
use anyhow::Result;

/// Render an aligned plain-text table with a leading row index.
pub fn generate_text_table(table: &ResultTable, columns: &[&str; 4]) -> String {
    let body: Vec<[String; 5]> = table
        .iter()
        .enumerate()
        .map(|(i, row)| {
            [
                i.to_string(),
                row.date.format("%Y-%m-%d").to_string(),
                row.location.clone(),
                format!("{:.6}", row.ndvi),
                format!("{:.6}", row.ndwi),
            ]
        })
        .collect();

    let head = ["", columns[0], columns[1], columns[2], columns[3]];
    let mut widths: Vec<usize> = head.iter().map(|h| h.chars().count()).collect();
    for cells in &body {
        for (w, cell) in widths.iter_mut().zip(cells.iter()) {
            *w = (*w).max(cell.chars().count());
        }
    }

    let mut output = String::new();

    let header_line: Vec<String> = head
        .iter()
        .zip(&widths)
        .map(|(h, w)| format!("{:>w$}", h, w = *w))
        .collect();
    output.push_str(header_line.join("  ").trim_end());
    output.push('\n');

    for cells in &body {
        let line: Vec<String> = cells
            .iter()
            .zip(&widths)
            .enumerate()
            .map(|(col, (cell, w))| {
                // Location is text; everything else right-aligned
                if col == 2 {
                    format!("{:<w$}", cell, w = *w)
                } else {
                    format!("{:>w$}", cell, w = *w)
                }
            })
            .collect();
        output.push_str(line.join("  ").trim_end());
        output.push('\n');
    }

    output
}

/// Render a Markdown table.
pub fn generate_markdown_table(table: &ResultTable, columns: &[&str; 4]) -> String {
    let mut output = String::new();

    output.push_str(&format!(
        "| {} | {} | {} | {} |\n",
        columns[0], columns[1], columns[2], columns[3]
    ));
    output.push_str("|:---|:---|---:|---:|\n");

    for row in table.iter() {
        output.push_str(&format!(
            "| {} | {} | {:.6} | {:.6} |\n",
            row.date.format("%Y-%m-%d"),
            row.location.replace('|', "\\|"),
            row.ndvi,
            row.ndwi
        ));
    }

    output
}

/// Render the table as pretty-printed JSON.
pub fn generate_json_table(table: &ResultTable) -> Result<String> {
    serde_json::to_string_pretty(&table.rows).map_err(Into::into)
}

/// Short run statistics for the terminal.
pub fn generate_summary(summary: &RunSummary) -> String {
    let mut lines = Vec::new();

    lines.push(format!("   Buckets: {}", summary.buckets));
    lines.push(format!(
        "   - Without qualifying imagery: {}",
        summary.empty_buckets
    ));
    if summary.omitted_pairs > 0 {
        lines.push(format!(
            "   - Point/bucket pairs without valid samples: {}",
            summary.omitted_pairs
        ));
    }
    lines.push(format!("   Rows: {}", summary.rows));
    lines.push(format!("   Duration: {:.1}s", summary.duration_seconds));

    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ResultRow;
    use crate::report::export::header;
    use chrono::NaiveDate;

    fn create_test_table() -> ResultTable {
        ResultTable::from(vec![
            ResultRow {
                date: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
                location: "Origin".to_string(),
                ndvi: 0.5,
                ndwi: -0.25,
            },
            ResultRow {
                date: NaiveDate::from_ymd_opt(2024, 1, 16).unwrap(),
                location: "Lake | shore".to_string(),
                ndvi: 0.125,
                ndwi: 0.0,
            },
        ])
    }

    #[test]
    fn test_generate_text_table() {
        let text = generate_text_table(&create_test_table(), &header(true));
        let lines: Vec<&str> = text.lines().collect();

        assert_eq!(lines.len(), 3);
        assert!(lines[0].contains("Custom_ND VI"));
        assert!(lines[1].starts_with("0  2024-01-01  Origin"));
        assert!(lines[1].ends_with("0.500000     -0.250000"));
        assert!(lines[2].contains("Lake | shore"));
    }

    #[test]
    fn test_generate_text_table_empty() {
        let text = generate_text_table(&ResultTable::new(), &header(false));
        assert_eq!(text.lines().count(), 1);
        assert!(text.contains("Custom_NDWI"));
    }

    #[test]
    fn test_generate_markdown_table() {
        let md = generate_markdown_table(&create_test_table(), &header(false));

        assert!(md.starts_with("| Date | Location | Custom_NDVI | Custom_NDWI |"));
        assert!(md.contains("| 2024-01-01 | Origin | 0.500000 | -0.250000 |"));
        assert!(md.contains("Lake \\| shore"));
    }

    #[test]
    fn test_generate_json_table() {
        let json = generate_json_table(&create_test_table()).unwrap();

        assert!(json.contains("\"location\": \"Origin\""));
        assert!(json.contains("\"date\": \"2024-01-16\""));
    }

    #[test]
    fn test_generate_summary() {
        let summary = RunSummary {
            buckets: 3,
            empty_buckets: 1,
            omitted_pairs: 0,
            rows: 2,
            duration_seconds: 4.2,
        };
        let text = generate_summary(&summary);

        assert!(text.contains("Buckets: 3"));
        assert!(text.contains("Rows: 2"));
        assert!(!text.contains("without valid samples"));
    }
}
