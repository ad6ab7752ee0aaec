use std::collections::HashMap;
use std::fs::File;
use std::io;
use std::path::{Path, PathBuf};

use chrono::DateTime;
use thiserror::Error;
use tracing::{debug, info};

use crate::models::{CleanIssue, IssueRow, ResolutionRow};

/// Creation timestamps at or below this are epoch artifacts from the old
/// collector and get dropped (1e12 ms is roughly September 2001).
pub const EPOCH_FLOOR_MS: i64 = 1_000_000_000_000;

pub const MS_PER_DAY: f64 = 86_400_000.0;

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("input file not found: {0}")]
    FileNotFound(PathBuf),
    #[error("failed to read {path}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to parse {path}")]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },
}

fn open_reader(path: &Path, delimiter: u8) -> Result<csv::Reader<File>, LoadError> {
    let file = File::open(path).map_err(|e| match e.kind() {
        io::ErrorKind::NotFound => LoadError::FileNotFound(path.to_path_buf()),
        _ => LoadError::Io {
            path: path.to_path_buf(),
            source: e,
        },
    })?;
    Ok(csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .from_reader(file))
}

/// Loads both tables and produces the cleaned, joined issue list.
///
/// Rows with a creation timestamp at or below [`EPOCH_FLOOR_MS`] are dropped.
/// Missing or malformed resolution timestamps become `None` rather than
/// failing the run; any other malformed field fails with [`LoadError::Csv`].
pub fn load_data(
    issues_path: &Path,
    resolutions_path: &Path,
    delimiter: u8,
) -> Result<Vec<CleanIssue>, LoadError> {
    let resolutions = load_resolutions(resolutions_path, delimiter)?;

    let mut reader = open_reader(issues_path, delimiter)?;
    let mut seen = 0usize;
    let mut cleaned = Vec::new();

    for row in reader.deserialize::<IssueRow>() {
        let row = row.map_err(|e| LoadError::Csv {
            path: issues_path.to_path_buf(),
            source: e,
        })?;
        seen += 1;

        if row.created <= EPOCH_FLOOR_MS {
            continue;
        }
        // Out-of-range instants get the same treatment as the epoch floor.
        let Some(created_at) = DateTime::from_timestamp_millis(row.created) else {
            debug!(created = row.created, "dropping row with unrepresentable creation time");
            continue;
        };

        let resolved_at = row.resolved.and_then(DateTime::from_timestamp_millis);
        let days_to_resolve = row
            .resolved
            .map(|resolved| (resolved - row.created) as f64 / MS_PER_DAY);
        let resolution_name = row
            .resolution
            .and_then(|code| resolutions.get(&code).cloned());

        cleaned.push(CleanIssue {
            created_ms: row.created,
            resolved_ms: row.resolved,
            category: row.category,
            resolution_code: row.resolution,
            created_at,
            resolved_at,
            days_to_resolve,
            resolution_name,
        });
    }

    info!(
        seen,
        kept = cleaned.len(),
        dropped = seen - cleaned.len(),
        resolutions = resolutions.len(),
        "cleaned issues table"
    );

    Ok(cleaned)
}

fn load_resolutions(path: &Path, delimiter: u8) -> Result<HashMap<i64, String>, LoadError> {
    let mut reader = open_reader(path, delimiter)?;
    let mut lookup = HashMap::new();
    for row in reader.deserialize::<ResolutionRow>() {
        let row = row.map_err(|e| LoadError::Csv {
            path: path.to_path_buf(),
            source: e,
        })?;
        lookup.insert(row.id, row.key);
    }
    Ok(lookup)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    fn write_inputs(dir: &Path, issues: &str, resolutions: &str) -> (PathBuf, PathBuf) {
        let issues_path = dir.join("issues.csv");
        let resolutions_path = dir.join("resolutions.csv");
        fs::write(&issues_path, issues).unwrap();
        fs::write(&resolutions_path, resolutions).unwrap();
        (issues_path, resolutions_path)
    }

    const RESOLUTIONS: &str = "id;key\n1;Fixed\n2;Won't Fix\n";

    #[test]
    fn test_load_joins_resolution_names() {
        let dir = tempdir().unwrap();
        let issues = "created;resolved;category;resolution\n\
                      1600000000000;1600086400000;Bug;1\n";
        let (ip, rp) = write_inputs(dir.path(), issues, RESOLUTIONS);

        let cleaned = load_data(&ip, &rp, b';').unwrap();
        assert_eq!(cleaned.len(), 1);
        assert_eq!(cleaned[0].resolution_name.as_deref(), Some("Fixed"));
        assert!((cleaned[0].days_to_resolve.unwrap() - 1.0).abs() < 1e-9);
        assert!(cleaned[0].is_resolved());
    }

    #[test]
    fn test_epoch_floor_rows_are_dropped() {
        let dir = tempdir().unwrap();
        let issues = "created;resolved;category;resolution\n\
                      999;;Bug;\n\
                      1000000000000;;Bug;\n\
                      1000000000001;;Bug;\n";
        let (ip, rp) = write_inputs(dir.path(), issues, RESOLUTIONS);

        let cleaned = load_data(&ip, &rp, b';').unwrap();
        assert_eq!(cleaned.len(), 1);
        assert_eq!(cleaned[0].created_ms, 1_000_000_000_001);
    }

    #[test]
    fn test_missing_resolved_yields_none() {
        let dir = tempdir().unwrap();
        let issues = "created;resolved;category;resolution\n\
                      1600000000000;;Task;\n";
        let (ip, rp) = write_inputs(dir.path(), issues, RESOLUTIONS);

        let cleaned = load_data(&ip, &rp, b';').unwrap();
        assert!(cleaned[0].resolved_at.is_none());
        assert!(cleaned[0].days_to_resolve.is_none());
        assert!(!cleaned[0].is_resolved());
    }

    #[test]
    fn test_malformed_resolved_is_tolerated() {
        let dir = tempdir().unwrap();
        let issues = "created;resolved;category;resolution\n\
                      1600000000000;n/a;Task;1\n";
        let (ip, rp) = write_inputs(dir.path(), issues, RESOLUTIONS);

        let cleaned = load_data(&ip, &rp, b';').unwrap();
        assert!(cleaned[0].resolved_at.is_none());
        assert!(cleaned[0].days_to_resolve.is_none());
        // The resolution code still joins.
        assert_eq!(cleaned[0].resolution_name.as_deref(), Some("Fixed"));
    }

    #[test]
    fn test_negative_elapsed_days_are_kept_in_table() {
        let dir = tempdir().unwrap();
        let issues = "created;resolved;category;resolution\n\
                      1600000000000;1599913600000;Bug;1\n";
        let (ip, rp) = write_inputs(dir.path(), issues, RESOLUTIONS);

        let cleaned = load_data(&ip, &rp, b';').unwrap();
        assert_eq!(cleaned.len(), 1);
        assert!((cleaned[0].days_to_resolve.unwrap() + 1.0).abs() < 1e-9);
        assert!(!cleaned[0].is_resolved());
    }

    #[test]
    fn test_unknown_resolution_code_yields_no_name() {
        let dir = tempdir().unwrap();
        let issues = "created;resolved;category;resolution\n\
                      1600000000000;1600086400000;Bug;42\n";
        let (ip, rp) = write_inputs(dir.path(), issues, RESOLUTIONS);

        let cleaned = load_data(&ip, &rp, b';').unwrap();
        assert_eq!(cleaned[0].resolution_code, Some(42));
        assert!(cleaned[0].resolution_name.is_none());
    }

    #[test]
    fn test_missing_issues_file_is_a_distinct_error() {
        let dir = tempdir().unwrap();
        let (_, rp) = write_inputs(dir.path(), "", RESOLUTIONS);

        let err = load_data(&dir.path().join("nope.csv"), &rp, b';').unwrap_err();
        assert!(matches!(err, LoadError::FileNotFound(_)));
    }

    #[test]
    fn test_missing_resolutions_file_is_a_distinct_error() {
        let dir = tempdir().unwrap();
        let issues_path = dir.path().join("issues.csv");
        fs::write(&issues_path, "created;resolved;category;resolution\n").unwrap();

        let err = load_data(&issues_path, &dir.path().join("nope.csv"), b';').unwrap_err();
        assert!(matches!(err, LoadError::FileNotFound(_)));
    }

    #[test]
    fn test_alternate_delimiter() {
        let dir = tempdir().unwrap();
        let issues = "created,resolved,category,resolution\n\
                      1600000000000,1600086400000,Bug,1\n";
        let resolutions = "id,key\n1,Fixed\n";
        let (ip, rp) = write_inputs(dir.path(), issues, resolutions);

        let cleaned = load_data(&ip, &rp, b',').unwrap();
        assert_eq!(cleaned.len(), 1);
        assert_eq!(cleaned[0].resolution_name.as_deref(), Some("Fixed"));
    }

    #[test]
    fn test_float_rendered_resolved_column() {
        let dir = tempdir().unwrap();
        let issues = "created;resolved;category;resolution\n\
                      1600000000000;1600086400000.0;Bug;1.0\n";
        let (ip, rp) = write_inputs(dir.path(), issues, RESOLUTIONS);

        let cleaned = load_data(&ip, &rp, b';').unwrap();
        assert_eq!(cleaned[0].resolved_ms, Some(1_600_086_400_000));
        assert_eq!(cleaned[0].resolution_name.as_deref(), Some("Fixed"));
    }
}
