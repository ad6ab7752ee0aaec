use std::fs;
use std::io::{self, Write};
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::metrics::{self, CategoryMetrics, Metrics};
use crate::models::CleanIssue;

#[derive(Serialize, Deserialize)]
pub struct ExportData {
    pub version: u32,
    pub exported_at: String,
    pub metrics: Metrics,
    pub categories: Vec<CategoryMetrics>,
}

pub fn build_export(cleaned: &[CleanIssue]) -> ExportData {
    ExportData {
        version: 1,
        exported_at: chrono::Utc::now().to_rfc3339(),
        metrics: metrics::calculate_metrics(cleaned),
        categories: metrics::metrics_by_category(cleaned),
    }
}

/// Writes the computed metrics as pretty JSON, to `output_path` or stdout.
pub fn run(
    issues_path: &Path,
    resolutions_path: &Path,
    delimiter: u8,
    output_path: Option<&str>,
) -> Result<()> {
    let cleaned = super::load_or_explain(issues_path, resolutions_path, delimiter)?;
    let data = build_export(&cleaned);
    let json = serde_json::to_string_pretty(&data)?;

    match output_path {
        Some(path) => {
            fs::write(path, json).context("Failed to write export file")?;
            eprintln!(
                "Exported metrics for {} issues to {}",
                data.metrics.total, path
            );
        }
        None => {
            let mut stdout = io::stdout().lock();
            writeln!(stdout, "{}", json)?;
        }
    }
    Ok(())
}
