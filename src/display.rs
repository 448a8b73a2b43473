//! Output Formatting and Display Management
//!
//! This module renders report pages for the terminal and for programmatic
//! consumption.
//!
//! ## Output Formats
//!
//! - **Table**: colored, aligned columns with numbers right-aligned and a page footer
//! - **JSON**: an array of row objects restricted to the requested columns
//! - **CSV**: header row followed by one record per row
//!
//! Every renderer returns a `String`; printing is left to the caller so the
//! renderers stay testable.
//!
//! ## Usage Example
//!
//! ```rust
//! use ga4_report::display::{DisplayManager, OutputFormat};
//! use ga4_report::view::ViewState;
//!
//! let display_manager = DisplayManager::new(true);
//! let page = ViewState::new(25).apply(Vec::new());
//! let columns = vec!["date".to_string(), "sessions".to_string()];
//!
//! let output = display_manager.render(&page, &columns, OutputFormat::Json).unwrap();
//! assert_eq!(output.trim(), "[]");
//! ```

use crate::dimensions::DERIVED_DIMENSIONS;
use crate::flow::FlowReport;
use crate::models::{CellValue, PropertySummary, Row};
use crate::presets::Preset;
use crate::view::Page;
use anyhow::{bail, Context, Result};
use colored::Colorize;
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Table,
    Json,
    Csv,
}

impl FromStr for OutputFormat {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "table" => Ok(OutputFormat::Table),
            "json" => Ok(OutputFormat::Json),
            "csv" => Ok(OutputFormat::Csv),
            other => bail!("Unknown output format '{}'. Use table, json or csv", other),
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            OutputFormat::Table => "table",
            OutputFormat::Json => "json",
            OutputFormat::Csv => "csv",
        };
        f.write_str(name)
    }
}

pub struct DisplayManager {
    json_pretty: bool,
}

impl Default for DisplayManager {
    fn default() -> Self {
        Self::new(true)
    }
}

impl DisplayManager {
    pub fn new(json_pretty: bool) -> Self {
        Self { json_pretty }
    }

    pub fn render(&self, page: &Page, columns: &[String], format: OutputFormat) -> Result<String> {
        match format {
            OutputFormat::Table => Ok(self.render_table(page, columns)),
            OutputFormat::Json => self.render_json(page, columns),
            OutputFormat::Csv => self.render_csv(page, columns),
        }
    }

    pub fn render_table(&self, page: &Page, columns: &[String]) -> String {
        if page.rows.is_empty() {
            return format!("{}\n", "No rows matched this report.".yellow());
        }

        let cells: Vec<Vec<(String, bool)>> = page
            .rows
            .iter()
            .map(|row| columns.iter().map(|c| cell_text(row, c)).collect())
            .collect();

        let widths: Vec<usize> = columns
            .iter()
            .enumerate()
            .map(|(idx, column)| {
                cells
                    .iter()
                    .map(|row| row[idx].0.chars().count())
                    .chain(std::iter::once(column.chars().count()))
                    .max()
                    .unwrap_or(0)
            })
            .collect();

        let mut out = String::new();
        let header: Vec<String> = columns
            .iter()
            .zip(&widths)
            .map(|(column, width)| format!("{:<width$}", column, width = width))
            .collect();
        out.push_str(&format!("{}\n", header.join("  ").bright_cyan().bold()));

        let rule_len = widths.iter().sum::<usize>() + 2 * widths.len().saturating_sub(1);
        out.push_str(&format!("{}\n", "─".repeat(rule_len).bright_black()));

        for row in &cells {
            let line: Vec<String> = row
                .iter()
                .zip(&widths)
                .map(|((text, numeric), width)| {
                    if *numeric {
                        format!("{:>width$}", text, width = width)
                            .bright_green()
                            .to_string()
                    } else {
                        format!("{:<width$}", text, width = width)
                    }
                })
                .collect();
            out.push_str(line.join("  ").trim_end());
            out.push('\n');
        }

        out.push_str(&format!(
            "\n{} Page {}/{} • {} rows\n",
            "📊".bright_yellow(),
            page.page.to_string().bright_white().bold(),
            page.total_pages,
            page.total_rows.to_string().bright_white().bold()
        ));
        out
    }

    pub fn render_json(&self, page: &Page, columns: &[String]) -> Result<String> {
        let rows: Vec<serde_json::Map<String, serde_json::Value>> = page
            .rows
            .iter()
            .map(|row| {
                columns
                    .iter()
                    .map(|column| {
                        let value = match row.get(column) {
                            Some(cell) => serde_json::to_value(cell).unwrap_or(serde_json::Value::Null),
                            None => serde_json::Value::Null,
                        };
                        (column.clone(), value)
                    })
                    .collect()
            })
            .collect();

        self.to_json(&rows)
    }

    pub fn render_csv(&self, page: &Page, columns: &[String]) -> Result<String> {
        let records = page
            .rows
            .iter()
            .map(|row| columns.iter().map(|c| cell_text(row, c).0).collect::<Vec<String>>());
        csv_output(columns, records)
    }

    pub fn render_flow(&self, report: &FlowReport, format: OutputFormat) -> Result<String> {
        match format {
            OutputFormat::Json => self.to_json(report),
            OutputFormat::Csv => {
                let header = [
                    "page",
                    "entries",
                    "views",
                    "sessions",
                    "keyEvents",
                    "exitRatio",
                    "conversionRatio",
                ];
                let records = report.steps.iter().map(|step| {
                    vec![
                        step.page.clone(),
                        step.entries.to_string(),
                        step.views.to_string(),
                        step.sessions.to_string(),
                        step.key_events.to_string(),
                        format!("{:.4}", step.exit_ratio),
                        format!("{:.4}", step.conversion_ratio),
                    ]
                });
                csv_output(&header, records)
            }
            OutputFormat::Table => {
                let mut out = String::new();
                out.push_str(&format!("\n{}\n", "=".repeat(80).bright_cyan()));
                out.push_str(&format!("{}\n", "Session Flow - Entry Pages".bright_white().bold()));
                out.push_str(&format!("{}\n\n", "=".repeat(80).bright_cyan()));
                out.push_str(&format!(
                    "{} {} entries • {} page views\n\n",
                    "📊".bright_yellow(),
                    format!("{:.0}", report.total_entries).bright_white().bold(),
                    format!("{:.0}", report.total_views).bright_white().bold()
                ));

                for (idx, step) in report.steps.iter().enumerate() {
                    let share = if report.total_entries > 0.0 {
                        step.entries / report.total_entries * 100.0
                    } else {
                        0.0
                    };
                    out.push_str(&format!(
                        "{:>3}. {}  {} entries ({}%)\n",
                        idx + 1,
                        step.page.bright_white().bold(),
                        format!("{:.0}", step.entries).bright_green(),
                        format!("{:.0}", share).bright_yellow()
                    ));
                    out.push_str(&format!(
                        "     views {} • sessions {} • exit ratio {} • conversion {}\n",
                        format!("{:.0}", step.views).bright_white(),
                        format!("{:.0}", step.sessions).bright_white(),
                        format!("{:.1}%", step.exit_ratio * 100.0).bright_yellow(),
                        format!("{:.1}%", step.conversion_ratio * 100.0).bright_yellow()
                    ));
                }
                Ok(out)
            }
        }
    }

    pub fn render_properties(&self, properties: &[PropertySummary], format: OutputFormat) -> Result<String> {
        match format {
            OutputFormat::Json => self.to_json(properties),
            OutputFormat::Csv => {
                let records = properties.iter().map(|property| {
                    vec![
                        property.property_id().to_string(),
                        property.display_name.clone(),
                        property.parent.clone().unwrap_or_default(),
                    ]
                });
                csv_output(&["propertyId", "displayName", "account"], records)
            }
            OutputFormat::Table => {
                if properties.is_empty() {
                    return Ok(format!("{}\n", "No properties are visible to this account.".yellow()));
                }
                let mut out = String::new();
                for property in properties {
                    out.push_str(&format!(
                        "{} {}  {}\n",
                        "•".bright_blue(),
                        property.property_id().bright_white().bold(),
                        property.display_name.bright_cyan()
                    ));
                }
                Ok(out)
            }
        }
    }

    pub fn render_presets(&self, presets: &[Preset]) -> String {
        let width = presets.iter().map(|p| p.name.len()).max().unwrap_or(0);
        let mut out = String::new();
        for preset in presets {
            out.push_str(&format!(
                "{}  {}\n{}  {} × {}\n",
                format!("{:<width$}", preset.name, width = width).bright_white().bold(),
                preset.description,
                " ".repeat(width),
                preset.dimensions.join(", ").bright_cyan(),
                preset.metrics.join(", ").bright_green()
            ));
        }
        out
    }

    pub fn render_dimensions(&self) -> String {
        let mut out = String::new();
        for derived in DERIVED_DIMENSIONS {
            out.push_str(&format!(
                "{} ← {}  {}\n",
                derived.name.bright_white().bold(),
                derived.source.bright_cyan(),
                derived.description
            ));
        }
        out
    }

    fn to_json<T: serde::Serialize + ?Sized>(&self, value: &T) -> Result<String> {
        let json = if self.json_pretty {
            serde_json::to_string_pretty(value)
        } else {
            serde_json::to_string(value)
        }
        .context("Failed to serialize output as JSON")?;
        Ok(json + "\n")
    }
}

fn csv_output<H, I>(header: &[H], records: I) -> Result<String>
where
    H: AsRef<str>,
    I: IntoIterator<Item = Vec<String>>,
{
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer
        .write_record(header.iter().map(|h| h.as_ref()))
        .context("Failed to write CSV header")?;
    for record in records {
        writer
            .write_record(&record)
            .context("Failed to write CSV record")?;
    }
    let bytes = writer.into_inner().context("Failed to flush CSV output")?;
    String::from_utf8(bytes).context("CSV output is not valid UTF-8")
}

/// Display text for a cell and whether it is numeric
fn cell_text(row: &Row, column: &str) -> (String, bool) {
    match row.get(column) {
        Some(cell) => (cell.to_string(), matches!(cell, CellValue::Number(_))),
        None => (String::new(), false),
    }
}
