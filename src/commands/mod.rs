pub mod category;
pub mod export;
pub mod report;

use std::path::Path;

use anyhow::Result;

use crate::loader::{self, LoadError};
use crate::models::CleanIssue;

/// Loads the input tables, printing guidance before failing when an input
/// file is missing. Other load errors propagate as-is.
pub(crate) fn load_or_explain(
    issues: &Path,
    resolutions: &Path,
    delimiter: u8,
) -> Result<Vec<CleanIssue>> {
    match loader::load_data(issues, resolutions, delimiter) {
        Ok(cleaned) => Ok(cleaned),
        Err(err @ LoadError::FileNotFound(_)) => {
            eprintln!("{err}");
            eprintln!("Expected input files:");
            eprintln!("  {}", issues.display());
            eprintln!("  {}", resolutions.display());
            Err(err.into())
        }
        Err(err) => Err(err.into()),
    }
}
