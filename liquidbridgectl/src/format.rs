//! Output formatting utilities for the CLI
//!
//! Provides table and JSON formatting with colors.

use anyhow::Result;
use colored::*;
use liquidbridge_core::StatusRecord;
use tabled::{settings::Style, Table, Tabled};

/// Output format options
#[derive(Debug, Clone)]
pub enum OutputFormat {
    Table,
    Json,
}

#[derive(Tabled)]
struct ReadingRow {
    #[tabled(rename = "Device")]
    device: String,
    #[tabled(rename = "Reading")]
    key: String,
    #[tabled(rename = "Value")]
    value: String,
    #[tabled(rename = "Unit")]
    unit: String,
}

fn reading_rows(records: &[StatusRecord]) -> Vec<ReadingRow> {
    let mut rows = Vec::new();
    for record in records {
        for reading in &record.readings {
            rows.push(ReadingRow {
                device: record.description.clone(),
                key: reading.key.clone(),
                value: reading
                    .value
                    .map(|v| v.to_string())
                    .unwrap_or_else(|| "-".to_string()),
                unit: reading.unit.clone().unwrap_or_default(),
            });
        }
    }
    rows
}

/// Format a set of status records as a device list with their readings
pub fn format_records(records: &[StatusRecord], format: &OutputFormat) -> Result<String> {
    match format {
        OutputFormat::Json => Ok(serde_json::to_string_pretty(records)?),
        OutputFormat::Table => {
            let mut output = String::new();

            for record in records {
                output.push_str(&format!(
                    "{} @ {}\n",
                    record.description.bold(),
                    record.address.cyan()
                ));
            }

            if records.is_empty() {
                output.push_str("No devices reported");
                return Ok(output);
            }

            let mut table = Table::new(reading_rows(records));
            table.with(Style::rounded());
            output.push('\n');
            output.push_str(&table.to_string());
            Ok(output)
        }
    }
}

/// Format a single device's readings
pub fn format_record(record: &StatusRecord, format: &OutputFormat) -> Result<String> {
    format_records(std::slice::from_ref(record), format)
}
