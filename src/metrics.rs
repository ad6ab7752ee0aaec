use std::cmp::Ordering;
use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::models::CleanIssue;

/// The five deadlines (in days) resolution speed is measured against.
pub const SLA_THRESHOLDS_DAYS: [u32; 5] = [1, 3, 7, 14, 30];

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SlaBucket {
    pub threshold_days: u32,
    pub met_count: usize,
    pub met_pct: f64,
}

/// Time-based figures over the resolved subset. Only exists when that subset
/// is non-empty, so none of these can be NaN.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResolutionTimes {
    pub mean_days: f64,
    pub median_days: f64,
    pub min_days: f64,
    pub max_days: f64,
    pub std_days: f64,
    pub p25_days: f64,
    pub p75_days: f64,
    pub p90_days: f64,
    pub p95_days: f64,
    pub sla: Vec<SlaBucket>,
    pub over_30_pct: f64,
    pub over_90_pct: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Metrics {
    pub total: usize,
    pub resolved: usize,
    pub open: usize,
    pub resolution_rate: f64,
    pub times: Option<ResolutionTimes>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryMetrics {
    pub category: String,
    pub total: usize,
    pub resolved: usize,
    pub resolution_rate: f64,
    pub mean_days: f64,
    pub median_days: f64,
    pub p95_days: f64,
}

/// Elapsed days of every record in the resolved subset.
pub fn resolved_days(issues: &[CleanIssue]) -> Vec<f64> {
    issues
        .iter()
        .filter(|i| i.is_resolved())
        .filter_map(|i| i.days_to_resolve)
        .collect()
}

/// Computes the full scalar metric set. Counts cover the whole table;
/// time-based figures cover the resolved subset and are `None` when it is
/// empty.
pub fn calculate_metrics(issues: &[CleanIssue]) -> Metrics {
    let days = resolved_days(issues);
    let total = issues.len();
    let resolved = days.len();
    let resolution_rate = if total == 0 {
        0.0
    } else {
        resolved as f64 / total as f64 * 100.0
    };

    Metrics {
        total,
        resolved,
        open: total - resolved,
        resolution_rate,
        times: resolution_times(&days),
    }
}

fn resolution_times(days: &[f64]) -> Option<ResolutionTimes> {
    if days.is_empty() {
        return None;
    }

    let mut sorted = days.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(Ordering::Equal));
    let n = sorted.len() as f64;

    let mean = sorted.iter().sum::<f64>() / n;
    let sla = SLA_THRESHOLDS_DAYS
        .iter()
        .map(|&threshold| {
            let met = sorted.iter().filter(|&&d| d <= f64::from(threshold)).count();
            SlaBucket {
                threshold_days: threshold,
                met_count: met,
                met_pct: met as f64 / n * 100.0,
            }
        })
        .collect();

    let over = |limit: f64| sorted.iter().filter(|&&d| d > limit).count() as f64 / n * 100.0;

    Some(ResolutionTimes {
        mean_days: mean,
        median_days: percentile(&sorted, 50.0),
        min_days: sorted[0],
        max_days: sorted[sorted.len() - 1],
        std_days: sample_std(&sorted, mean),
        p25_days: percentile(&sorted, 25.0),
        p75_days: percentile(&sorted, 75.0),
        p90_days: percentile(&sorted, 90.0),
        p95_days: percentile(&sorted, 95.0),
        sla,
        over_30_pct: over(30.0),
        over_90_pct: over(90.0),
    })
}

/// Per-category breakdown, sorted by category name. The resolved count per
/// category follows the report convention of counting any record with a
/// resolution instant; time figures still use the non-negative subset and
/// default to 0 when it is empty.
pub fn metrics_by_category(issues: &[CleanIssue]) -> Vec<CategoryMetrics> {
    let mut groups: BTreeMap<&str, Vec<&CleanIssue>> = BTreeMap::new();
    for issue in issues {
        groups.entry(issue.category.as_str()).or_default().push(issue);
    }

    groups
        .into_iter()
        .map(|(category, group)| {
            let total = group.len();
            let resolved = group.iter().filter(|i| i.resolved_at.is_some()).count();
            let mut days: Vec<f64> = group
                .iter()
                .filter(|i| i.is_resolved())
                .filter_map(|i| i.days_to_resolve)
                .collect();
            days.sort_by(|a, b| a.partial_cmp(b).unwrap_or(Ordering::Equal));

            let (mean_days, median_days, p95_days) = if days.is_empty() {
                (0.0, 0.0, 0.0)
            } else {
                (
                    days.iter().sum::<f64>() / days.len() as f64,
                    percentile(&days, 50.0),
                    percentile(&days, 95.0),
                )
            };

            CategoryMetrics {
                category: category.to_string(),
                total,
                resolved,
                resolution_rate: if total == 0 {
                    0.0
                } else {
                    resolved as f64 / total as f64 * 100.0
                },
                mean_days,
                median_days,
                p95_days,
            }
        })
        .collect()
}

/// Standard percentile with linear interpolation over sorted data.
pub fn percentile(sorted: &[f64], pct: f64) -> f64 {
    if sorted.is_empty() {
        return 0.0;
    }
    if sorted.len() == 1 {
        return sorted[0];
    }

    let index = (pct / 100.0) * (sorted.len() - 1) as f64;
    let lower = index.floor() as usize;
    let upper = index.ceil() as usize;

    if lower == upper {
        sorted[lower]
    } else {
        let weight = index - lower as f64;
        sorted[lower] * (1.0 - weight) + sorted[upper] * weight
    }
}

/// Sample standard deviation (n - 1); 0 when there are fewer than two values.
fn sample_std(values: &[f64], mean: f64) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    let sum_sq: f64 = values.iter().map(|v| (v - mean) * (v - mean)).sum();
    (sum_sq / (values.len() - 1) as f64).sqrt()
}
