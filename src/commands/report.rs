use std::path::Path;

use anyhow::Result;
use tracing::error;

use crate::charts::{self, ChartFormat};
use crate::metrics;
use crate::report;

/// Full report flow: load, print the metrics and category reports, render
/// all charts in PNG and SVG.
pub fn run(
    issues_path: &Path,
    resolutions_path: &Path,
    delimiter: u8,
    out_dir: &Path,
    no_charts: bool,
) -> Result<()> {
    let cleaned = super::load_or_explain(issues_path, resolutions_path, delimiter)?;

    let metrics = metrics::calculate_metrics(&cleaned);
    print!("{}", report::metrics_report(&metrics, "KEY RESOLUTION METRICS"));
    println!();

    let categories = metrics::metrics_by_category(&cleaned);
    print!("{}", report::category_report(&categories));

    if no_charts {
        return Ok(());
    }

    match charts::render_all(&cleaned, out_dir, &[ChartFormat::Png, ChartFormat::Svg]) {
        Ok(written) => {
            println!();
            println!("Charts written to {}/", out_dir.display());
            for path in &written {
                if let Some(name) = path.file_name() {
                    println!("  {}", name.to_string_lossy());
                }
            }
            Ok(())
        }
        Err(err) => {
            error!("chart rendering failed: {err:#}");
            Err(err)
        }
    }
}
