use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

/// Raw row from the issues table. Timestamps are epoch milliseconds as the
/// tracker exports them; `resolved` and `resolution` are empty for open
/// issues and may contain garbage for very old records.
#[derive(Debug, Clone, Deserialize)]
pub struct IssueRow {
    pub created: i64,
    #[serde(deserialize_with = "lenient_epoch_ms")]
    pub resolved: Option<i64>,
    pub category: String,
    #[serde(deserialize_with = "lenient_epoch_ms")]
    pub resolution: Option<i64>,
}

/// Raw row from the resolution lookup table: code to human-readable name.
#[derive(Debug, Clone, Deserialize)]
pub struct ResolutionRow {
    pub id: i64,
    pub key: String,
}

/// An issue after cleaning: epoch fields converted to instants, elapsed time
/// derived, resolution name joined from the lookup table.
#[derive(Debug, Clone, Serialize)]
pub struct CleanIssue {
    pub created_ms: i64,
    pub resolved_ms: Option<i64>,
    pub category: String,
    pub resolution_code: Option<i64>,
    pub created_at: DateTime<Utc>,
    pub resolved_at: Option<DateTime<Utc>>,
    /// Elapsed days between creation and resolution. Present whenever the raw
    /// `resolved` field parsed; may be negative for malformed records.
    pub days_to_resolve: Option<f64>,
    pub resolution_name: Option<String>,
}

impl CleanIssue {
    /// A record counts as resolved when it has a resolution instant and a
    /// non-negative elapsed time. Time-based metrics only look at these.
    pub fn is_resolved(&self) -> bool {
        self.resolved_at.is_some() && matches!(self.days_to_resolve, Some(d) if d >= 0.0)
    }
}

/// Parses an epoch-milliseconds field, mapping empty or malformed values to
/// `None` instead of failing the row.
fn lenient_epoch_ms<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<String> = Option::deserialize(deserializer)?;
    Ok(raw
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .and_then(|s| {
            // Some exports render the column as floats ("1.6e12", "123.0").
            s.parse::<i64>()
                .ok()
                .or_else(|| s.parse::<f64>().ok().filter(|f| f.is_finite()).map(|f| f as i64))
        }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::DateTime;

    fn clean(created_ms: i64, resolved_ms: Option<i64>) -> CleanIssue {
        CleanIssue {
            created_ms,
            resolved_ms,
            category: "Bug".to_string(),
            resolution_code: None,
            created_at: DateTime::from_timestamp_millis(created_ms).unwrap(),
            resolved_at: resolved_ms.and_then(DateTime::from_timestamp_millis),
            days_to_resolve: resolved_ms.map(|r| (r - created_ms) as f64 / 86_400_000.0),
            resolution_name: None,
        }
    }

    #[test]
    fn test_is_resolved_requires_instant() {
        let issue = clean(1_600_000_000_000, None);
        assert!(!issue.is_resolved());
    }

    #[test]
    fn test_is_resolved_rejects_negative_elapsed() {
        let issue = clean(1_600_000_000_000, Some(1_500_000_000_000));
        assert!(issue.days_to_resolve.unwrap() < 0.0);
        assert!(!issue.is_resolved());
    }

    #[test]
    fn test_is_resolved_accepts_same_instant() {
        let issue = clean(1_600_000_000_000, Some(1_600_000_000_000));
        assert!(issue.is_resolved());
    }
}
