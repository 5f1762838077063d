mod cli;
mod json;

pub use cli::{print_cli_table, render_cli_table};
pub use json::print_json;

use crate::model::RunSummary;
use anyhow::Result;

/// Output format for the end-of-run summary
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// Human-readable table format
    Table,
    /// JSON format for programmatic use
    Json,
    /// No summary
    None,
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "table" => Ok(OutputFormat::Table),
            "json" => Ok(OutputFormat::Json),
            "none" => Ok(OutputFormat::None),
            _ => Err(format!(
                "Unknown format: {}. Use 'table', 'json', or 'none'",
                s
            )),
        }
    }
}

pub fn print_summary(summary: &RunSummary, format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Table => print_cli_table(summary),
        OutputFormat::Json => print_json(summary),
        OutputFormat::None => Ok(()),
    }
}
