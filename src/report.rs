use std::fmt::Write;

use crate::metrics::{CategoryMetrics, Metrics};

const RULE: &str =
    "================================================================================";
const THIN_RULE: &str =
    "--------------------------------------------------------------------------------";

/// Renders the scalar metrics block with a fixed layout. The output is meant
/// for humans, not for parsing.
pub fn metrics_report(metrics: &Metrics, title: &str) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{RULE}");
    let _ = writeln!(out, "{title}");
    let _ = writeln!(out, "{RULE}");
    let _ = writeln!(out);

    let _ = writeln!(out, "TOTALS:");
    let _ = writeln!(out, "  Total issues:           {:>12}", metrics.total);
    let _ = writeln!(
        out,
        "  Resolved:               {:>12} ({:>6.2}%)",
        metrics.resolved, metrics.resolution_rate
    );
    let _ = writeln!(out, "  Open:                   {:>12}", metrics.open);
    let _ = writeln!(out);

    match &metrics.times {
        Some(times) => {
            let _ = writeln!(out, "RESOLUTION TIME (days):");
            let _ = writeln!(out, "  Min:                    {:>12.4}", times.min_days);
            let _ = writeln!(out, "  Mean:                   {:>12.2}", times.mean_days);
            let _ = writeln!(out, "  Median (P50):           {:>12.4}", times.median_days);
            let _ = writeln!(out, "  P25:                    {:>12.2}", times.p25_days);
            let _ = writeln!(out, "  P75:                    {:>12.2}", times.p75_days);
            let _ = writeln!(out, "  P90:                    {:>12.2}", times.p90_days);
            let _ = writeln!(out, "  P95:                    {:>12.2}", times.p95_days);
            let _ = writeln!(out, "  Max:                    {:>12.2}", times.max_days);
            let _ = writeln!(out, "  Std dev:                {:>12.2}", times.std_days);
            let _ = writeln!(out);

            let _ = writeln!(out, "SLA COMPLIANCE (% resolved within threshold):");
            for bucket in &times.sla {
                let _ = writeln!(
                    out,
                    "  Within {:>2} day(s):       {:>11.2}%",
                    bucket.threshold_days, bucket.met_pct
                );
            }
            let _ = writeln!(out);

            let _ = writeln!(out, "OVERRUNS:");
            let _ = writeln!(out, "  Over 30 days:          {:>11.2}%", times.over_30_pct);
            let _ = writeln!(out, "  Over 90 days:          {:>11.2}%", times.over_90_pct);
        }
        None => {
            let _ = writeln!(
                out,
                "  No resolved issues; time and SLA figures are unavailable."
            );
        }
    }

    let _ = writeln!(out, "{RULE}");
    out
}

/// Renders the per-category table.
pub fn category_report(categories: &[CategoryMetrics]) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{RULE}");
    let _ = writeln!(out, "CATEGORY BREAKDOWN");
    let _ = writeln!(out, "{RULE}");

    if categories.is_empty() {
        let _ = writeln!(out, "  No issues loaded.");
        let _ = writeln!(out, "{RULE}");
        return out;
    }

    let _ = writeln!(
        out,
        "{:<20} | {:>8} | {:>8} | {:>10} | {:>8} | {:>8}",
        "Category", "Total", "% of all", "Resolved %", "Avg days", "P95 days"
    );
    let _ = writeln!(out, "{THIN_RULE}");

    let overall: usize = categories.iter().map(|c| c.total).sum();
    for cat in categories {
        let share = if overall == 0 {
            0.0
        } else {
            cat.total as f64 / overall as f64 * 100.0
        };
        let _ = writeln!(
            out,
            "{:<20} | {:>8} | {:>7.1}% | {:>9.1}% | {:>8.2} | {:>8.2}",
            truncate(&cat.category, 20),
            cat.total,
            share,
            cat.resolution_rate,
            cat.mean_days,
            cat.p95_days
        );
    }

    let _ = writeln!(out, "{RULE}");
    out
}

fn truncate(s: &str, max_chars: usize) -> String {
    let char_count = s.chars().count();
    if char_count <= max_chars {
        s.to_string()
    } else {
        let truncated: String = s.chars().take(max_chars - 3).collect();
        format!("{}...", truncated)
    }
}
