use crate::model::{InvocationRecord, RunSummary};
use anyhow::Result;
use tabled::{settings::Style, Table, Tabled};

#[derive(Tabled)]
struct InvocationRow {
    #[tabled(rename = "Variant")]
    variant: String,
    #[tabled(rename = "Manifest")]
    manifest: String,
    #[tabled(rename = "Exit")]
    exit: String,
    #[tabled(rename = "Outcome")]
    outcome: String,
    #[tabled(rename = "Results")]
    contribution: String,
}

impl From<&InvocationRecord> for InvocationRow {
    fn from(record: &InvocationRecord) -> Self {
        Self {
            variant: record.runtime_variant.clone(),
            manifest: record
                .manifest
                .as_ref()
                .map(|p| truncate(&p.display().to_string(), 60))
                .unwrap_or_else(|| "(all projects)".to_string()),
            exit: record
                .outcome
                .exit_code()
                .map(|c| c.to_string())
                .unwrap_or_else(|| "-".to_string()),
            outcome: record.outcome.to_string(),
            contribution: record
                .contribution
                .as_ref()
                .map(|c| c.to_string())
                .unwrap_or_else(|| "-".to_string()),
        }
    }
}

pub fn render_cli_table(summary: &RunSummary) -> String {
    let mut out = String::new();

    if summary.invocations.is_empty() {
        out.push_str("No scans were run.\n");
    } else {
        let rows: Vec<InvocationRow> = summary.invocations.iter().map(Into::into).collect();
        out.push_str(&Table::new(rows).with(Style::rounded()).to_string());
        out.push('\n');
    }

    out.push('\n');
    out.push_str(&format!("Mode: {}\n", summary.mode));
    out.push_str(&format!("Scans: {}", summary.invocations.len()));
    let errors = summary.error_count();
    if errors > 0 {
        out.push_str(&format!(" ({} failed)", errors));
    }
    out.push('\n');
    if let Some(total) = summary.total_vulnerabilities {
        out.push_str(&format!(
            "Vulnerabilities: {} (from {} of {} scans)\n",
            total,
            summary.contributing_scans(),
            summary.invocations.len()
        ));
    }
    if summary.published.is_empty() {
        out.push_str("Published: nothing\n");
    } else {
        out.push_str(&format!("Published: {}\n", summary.published.join(", ")));
    }

    out
}

pub fn print_cli_table(summary: &RunSummary) -> Result<()> {
    println!();
    print!("{}", render_cli_table(summary));
    Ok(())
}

fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}
