//! DBC -> SQL import pipeline.
//!
//! Per table: resolve the meta document, decode the binary file, audit
//! declared unique keys, create the table, and upsert every record in
//! one transaction. Missing source files and already-present tables
//! are skips, not errors.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::{error, info, warn};

use crate::codec;
use crate::config::Config;
use crate::error::Result;
use crate::meta::{TableMeta, table_name_from_meta_path};
use crate::pipeline::audit;
use crate::pipeline::types::{ImportOutcome, ImportStats};
use crate::storage::DbcStorage;

/// Importer for DBC files described in the config's meta directory.
pub struct Importer<'a> {
    storage: &'a mut DbcStorage,
    config: &'a Config,
}

impl<'a> Importer<'a> {
    /// Create an importer over an open database.
    #[must_use]
    pub fn new(storage: &'a mut DbcStorage, config: &'a Config) -> Self {
        Self { storage, config }
    }

    /// Import every table with a meta document.
    ///
    /// A failing table is logged and counted; it never aborts the run.
    ///
    /// # Errors
    ///
    /// Returns an error only if the meta directory itself cannot be
    /// scanned.
    pub fn import_all(&mut self) -> Result<ImportStats> {
        let metas = discover_meta_files(&self.config.paths.meta)?;
        let mut stats = ImportStats::default();

        for path in metas {
            match self.import_table(&path) {
                Ok(ImportOutcome::Imported { .. }) => stats.imported += 1,
                Ok(_) => stats.skipped += 1,
                Err(e) => {
                    let table = table_name_from_meta_path(&path);
                    error!("import of {table} failed: {e}");
                    stats.failed += 1;
                }
            }
        }

        Ok(stats)
    }

    /// Import one table from its meta document.
    ///
    /// # Errors
    ///
    /// Returns an error if the meta document is invalid, the binary
    /// file violates its layout, or the database write fails. The
    /// write phase is one transaction; on failure the table is left
    /// untouched.
    pub fn import_table(&mut self, meta_path: &Path) -> Result<ImportOutcome> {
        let meta = TableMeta::load(meta_path)?;
        let table = meta.table_name();
        let dbc_path = self.config.dbc_path(&meta.file);

        if !dbc_path.exists() {
            warn!(
                "skipping {table}: source file {} does not exist",
                dbc_path.display()
            );
            return Ok(ImportOutcome::SkippedMissingFile);
        }

        if self.storage.table_exists(&table)? {
            info!("skipping {table}: table already exists");
            return Ok(ImportOutcome::SkippedTableExists);
        }

        info!("importing {} into table {table}", dbc_path.display());

        let bytes = fs::read(&dbc_path)?;
        let records = codec::decode(&bytes, &meta)?;

        let duplicates = audit::check_unique_keys(&records, &meta);
        audit::report(&table, &duplicates, &records, &meta);

        self.storage.create_table(&meta)?;
        let written = self.storage.insert_records(&meta, &records)?;

        info!("imported {written} rows into {table}");
        Ok(ImportOutcome::Imported { records: written })
    }
}

/// Meta documents in a directory, sorted for a deterministic run order.
///
/// # Errors
///
/// Returns an error if the directory cannot be read.
pub fn discover_meta_files(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut out = Vec::new();
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        if path
            .file_name()
            .and_then(|n| n.to_str())
            .is_some_and(|n| n.ends_with(".meta.json"))
        {
            out.push(path);
        }
    }
    out.sort();
    Ok(out)
}
