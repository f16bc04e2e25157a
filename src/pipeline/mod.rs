//! Import/export orchestration.
//!
//! Tables are processed strictly sequentially. A failure in one table
//! stops that table's pipeline, is logged with the table's identity,
//! and the bulk run continues with the next table.

pub mod audit;
pub mod export;
pub mod import;
pub mod types;

pub use audit::{DuplicateGroup, check_unique_keys};
pub use export::Exporter;
pub use import::{Importer, discover_meta_files};
pub use types::{ExportOutcome, ExportStats, ImportOutcome, ImportStats};
