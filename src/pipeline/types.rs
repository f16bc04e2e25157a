//! Outcome and statistics types for pipeline runs.

use std::path::PathBuf;

use serde::Serialize;

/// Result of importing one table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum ImportOutcome {
    /// Table created and populated.
    Imported { records: usize },
    /// Source DBC file absent; table skipped, run continues.
    SkippedMissingFile,
    /// Destination table already exists; import is not an overwrite
    /// operation, so the table is skipped.
    SkippedTableExists,
}

/// Result of exporting one table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum ExportOutcome {
    /// File written and fingerprint persisted.
    Exported { records: usize, path: PathBuf },
    /// Content fingerprint unchanged under versioning; no file write.
    Skipped,
    /// Table absent from the database.
    SkippedMissingTable,
}

/// Statistics for a bulk import run.
#[derive(Debug, Default, Clone, Serialize)]
pub struct ImportStats {
    pub imported: usize,
    pub skipped: usize,
    pub failed: usize,
}

impl ImportStats {
    /// Total tables considered.
    #[must_use]
    pub fn total(&self) -> usize {
        self.imported + self.skipped + self.failed
    }
}

/// Statistics for a bulk export run.
#[derive(Debug, Default, Clone, Serialize)]
pub struct ExportStats {
    pub exported: usize,
    pub skipped: usize,
    pub failed: usize,
}

impl ExportStats {
    /// Total tables considered.
    #[must_use]
    pub fn total(&self) -> usize {
        self.exported + self.skipped + self.failed
    }
}
