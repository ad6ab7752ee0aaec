use std::fs;
use std::path::Path;

use anyhow::{bail, Result};
use tracing::error;

use crate::charts::{self, ChartFormat};
use crate::metrics;
use crate::report;

/// Metrics report restricted to one category, with its own SLA chart.
pub fn run(
    name: &str,
    issues_path: &Path,
    resolutions_path: &Path,
    delimiter: u8,
    out_dir: &Path,
    no_charts: bool,
) -> Result<()> {
    let cleaned = super::load_or_explain(issues_path, resolutions_path, delimiter)?;

    let subset: Vec<_> = cleaned
        .into_iter()
        .filter(|i| i.category == name)
        .collect();
    if subset.is_empty() {
        bail!("Category '{}' not found", name);
    }

    let metrics = metrics::calculate_metrics(&subset);
    let title = format!("METRICS: {name}");
    print!("{}", report::metrics_report(&metrics, &title));

    if no_charts {
        return Ok(());
    }

    if let Some(times) = &metrics.times {
        fs::create_dir_all(out_dir)?;
        let stem = format!("sla_chart_{}", slug(name));
        for format in [ChartFormat::Png, ChartFormat::Svg] {
            if let Err(err) = charts::render_sla_chart(times, out_dir, format, &stem) {
                error!("chart rendering failed: {err:#}");
                return Err(err);
            }
        }
        println!();
        println!("Charts written to {}/", out_dir.display());
    }

    Ok(())
}

fn slug(name: &str) -> String {
    name.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() {
                c.to_ascii_lowercase()
            } else {
                '_'
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    const ISSUES: &str = "created;resolved;category;resolution\n\
                          1600000000000;1600086400000;Bug;1\n\
                          1600000000000;1600172800000;Bug;1\n\
                          1600000000000;;Feature;\n";
    const RESOLUTIONS: &str = "id;key\n1;Fixed\n";

    fn write_inputs(dir: &Path) -> (std::path::PathBuf, std::path::PathBuf) {
        let issues = dir.join("issues.csv");
        let resolutions = dir.join("resolutions.csv");
        fs::write(&issues, ISSUES).unwrap();
        fs::write(&resolutions, RESOLUTIONS).unwrap();
        (issues, resolutions)
    }

    #[test]
    fn test_category_report_runs() {
        let dir = tempdir().unwrap();
        let (issues, resolutions) = write_inputs(dir.path());
        let result = run(
            "Bug",
            &issues,
            &resolutions,
            b';',
            &dir.path().join("out"),
            true,
        );
        assert!(result.is_ok());
    }

    #[test]
    fn test_category_chart_uses_slug() {
        let dir = tempdir().unwrap();
        let (issues, resolutions) = write_inputs(dir.path());
        let out_dir = dir.path().join("out");
        run("Bug", &issues, &resolutions, b';', &out_dir, false).unwrap();
        assert!(out_dir.join("sla_chart_bug.png").exists());
        assert!(out_dir.join("sla_chart_bug.svg").exists());
    }

    #[test]
    fn test_unknown_category_fails() {
        let dir = tempdir().unwrap();
        let (issues, resolutions) = write_inputs(dir.path());
        let err = run(
            "Nope",
            &issues,
            &resolutions,
            b';',
            &dir.path().join("out"),
            true,
        )
        .unwrap_err();
        assert!(err.to_string().contains("not found"));
    }

    #[test]
    fn test_slug_replaces_non_alphanumerics() {
        assert_eq!(slug("Won't Fix"), "won_t_fix");
        assert_eq!(slug("Bug"), "bug");
    }
}
