//! SQLite table layer.
//!
//! Derives relational tables from schema metadata and moves records in
//! and out of them: DDL generation, batched upserts, ordered reads,
//! and the content-checksum primitive the export pipeline uses for
//! change detection.

pub mod schema;
pub mod sqlite;
pub mod table;

pub use sqlite::DbcStorage;
pub use table::{MAX_PARAMS_PER_STATEMENT, MAX_ROWS_PER_BATCH};
