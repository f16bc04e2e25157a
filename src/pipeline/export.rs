//! SQL -> DBC export pipeline with change detection.
//!
//! Each export request walks a small state machine per table: ensure a
//! checksum entry exists, compute the table's current fingerprint, and
//! compare. Unchanged tables are skipped when versioning is enabled;
//! otherwise rows are read in declared sort order, encoded, written,
//! and only then is the new fingerprint persisted. A crash before the
//! write leaves the stored fingerprint stale but safe: the next run
//! re-exports.

use std::fs;
use std::path::Path;

use tracing::{error, info, warn};

use crate::codec;
use crate::config::Config;
use crate::error::Result;
use crate::meta::{TableMeta, table_name_from_meta_path};
use crate::pipeline::import::discover_meta_files;
use crate::pipeline::types::{ExportOutcome, ExportStats};
use crate::storage::DbcStorage;

/// Exporter for tables described in the config's meta directory.
pub struct Exporter<'a> {
    storage: &'a mut DbcStorage,
    config: &'a Config,
    use_versioning: bool,
}

impl<'a> Exporter<'a> {
    /// Create an exporter over an open database.
    ///
    /// Versioning (skip-if-unchanged) follows the config option.
    #[must_use]
    pub fn new(storage: &'a mut DbcStorage, config: &'a Config) -> Self {
        let use_versioning = config.options.use_versioning;
        Self {
            storage,
            config,
            use_versioning,
        }
    }

    /// Override the versioning option, e.g. for `--force`.
    #[must_use]
    pub fn with_versioning(mut self, on: bool) -> Self {
        self.use_versioning = on;
        self
    }

    /// Export every table with a meta document.
    ///
    /// A failing table is logged and counted; it never aborts the run.
    ///
    /// # Errors
    ///
    /// Returns an error only if the meta directory itself cannot be
    /// scanned.
    pub fn export_all(&mut self) -> Result<ExportStats> {
        let metas = discover_meta_files(&self.config.paths.meta)?;
        let mut stats = ExportStats::default();

        for path in metas {
            match self.export_table(&path) {
                Ok(ExportOutcome::Exported { .. }) => stats.exported += 1,
                Ok(_) => stats.skipped += 1,
                Err(e) => {
                    let table = table_name_from_meta_path(&path);
                    error!("export of {table} failed: {e}");
                    stats.failed += 1;
                }
            }
        }

        Ok(stats)
    }

    /// Export one table from its meta document.
    ///
    /// # Errors
    ///
    /// Returns an error if the meta document is invalid, the table
    /// read fails, encoding fails, or the file cannot be written.
    pub fn export_table(&mut self, meta_path: &Path) -> Result<ExportOutcome> {
        let meta = TableMeta::load(meta_path)?;
        let table = meta.table_name();

        if !self.storage.table_exists(&table)? {
            warn!("skipping {table}: table does not exist");
            return Ok(ExportOutcome::SkippedMissingTable);
        }

        let stored = self.storage.ensure_checksum_entry(&table)?;
        let current = self.storage.table_checksum(&meta)?;

        if self.use_versioning && current == stored {
            info!("skipping {table}: content unchanged");
            return Ok(ExportOutcome::Skipped);
        }

        let records = self.storage.read_records(&meta)?;
        let bytes = codec::encode(&records, &meta)?;

        let out_path = self.config.export_path(&meta.file);
        if let Some(parent) = out_path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&out_path, &bytes)?;

        // Only now is the fingerprint current on disk too.
        self.storage.store_checksum(&table, current)?;

        info!(
            "exported {} records from {table} to {}",
            records.len(),
            out_path.display()
        );
        Ok(ExportOutcome::Exported {
            records: records.len(),
            path: out_path,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{Config, DatabaseConfig, Options, Paths};
    use crate::model::{Record, Value};

    const ITEM_META: &str = r#"{
        "file": "Item.dbc",
        "primaryKeys": ["ID"],
        "sortOrder": [{"name": "ID", "direction": "asc"}],
        "fields": [
            {"name": "ID", "type": "uint32"},
            {"name": "Name", "type": "string"}
        ]
    }"#;

    fn test_config(root: &Path, use_versioning: bool) -> Config {
        Config {
            paths: Paths {
                base: root.join("dbc"),
                meta: root.join("meta"),
                export: root.join("export"),
            },
            database: DatabaseConfig {
                path: root.join("dbcsync.db"),
            },
            options: Options { use_versioning },
        }
    }

    fn seed(config: &Config, storage: &mut DbcStorage, ids: &[u32]) -> std::path::PathBuf {
        std::fs::create_dir_all(&config.paths.meta).unwrap();
        let meta_path = config.paths.meta.join("Item.meta.json");
        std::fs::write(&meta_path, ITEM_META).unwrap();

        let meta = TableMeta::from_json(ITEM_META, "Item").unwrap();
        storage.create_table(&meta).unwrap();
        let records: Vec<Record> = ids
            .iter()
            .map(|&id| Record::new(vec![Value::Uint32(id), Value::Text(format!("Item {id}"))]))
            .collect();
        storage.insert_records(&meta, &records).unwrap();
        meta_path
    }

    #[test]
    fn test_first_export_writes_file() {
        let dir = tempfile::tempdir().unwrap();
        let config = test_config(dir.path(), true);
        let mut storage = DbcStorage::open_memory().unwrap();
        let meta_path = seed(&config, &mut storage, &[1, 2]);

        let mut exporter = Exporter::new(&mut storage, &config);
        let outcome = exporter.export_table(&meta_path).unwrap();

        let ExportOutcome::Exported { records, path } = outcome else {
            panic!("expected export, got {outcome:?}");
        };
        assert_eq!(records, 2);
        assert!(path.exists());

        // The written file decodes back to the table's content.
        let meta = TableMeta::from_json(ITEM_META, "Item").unwrap();
        let decoded = codec::decode(&std::fs::read(&path).unwrap(), &meta).unwrap();
        assert_eq!(decoded.len(), 2);
        assert_eq!(decoded[0].values[0], Value::Uint32(1));
    }

    #[test]
    fn test_unchanged_table_skipped_under_versioning() {
        let dir = tempfile::tempdir().unwrap();
        let config = test_config(dir.path(), true);
        let mut storage = DbcStorage::open_memory().unwrap();
        let meta_path = seed(&config, &mut storage, &[1]);

        let mut exporter = Exporter::new(&mut storage, &config);
        assert!(matches!(
            exporter.export_table(&meta_path).unwrap(),
            ExportOutcome::Exported { .. }
        ));

        // Second run: no content change, no file write.
        let out_path = config.export_path("Item.dbc");
        std::fs::remove_file(&out_path).unwrap();
        let mut exporter = Exporter::new(&mut storage, &config);
        assert_eq!(exporter.export_table(&meta_path).unwrap(), ExportOutcome::Skipped);
        assert!(!out_path.exists());
    }

    #[test]
    fn test_changed_table_reexports() {
        let dir = tempfile::tempdir().unwrap();
        let config = test_config(dir.path(), true);
        let mut storage = DbcStorage::open_memory().unwrap();
        let meta_path = seed(&config, &mut storage, &[1]);

        let mut exporter = Exporter::new(&mut storage, &config);
        exporter.export_table(&meta_path).unwrap();

        // Mutate the table, then export again.
        let meta = TableMeta::from_json(ITEM_META, "Item").unwrap();
        storage
            .insert_records(
                &meta,
                &[Record::new(vec![
                    Value::Uint32(2),
                    Value::Text("Item 2".into()),
                ])],
            )
            .unwrap();

        let mut exporter = Exporter::new(&mut storage, &config);
        let outcome = exporter.export_table(&meta_path).unwrap();
        assert!(matches!(
            outcome,
            ExportOutcome::Exported { records: 2, .. }
        ));
    }

    #[test]
    fn test_versioning_disabled_always_exports() {
        let dir = tempfile::tempdir().unwrap();
        let config = test_config(dir.path(), false);
        let mut storage = DbcStorage::open_memory().unwrap();
        let meta_path = seed(&config, &mut storage, &[1]);

        for _ in 0..2 {
            let mut exporter = Exporter::new(&mut storage, &config);
            assert!(matches!(
                exporter.export_table(&meta_path).unwrap(),
                ExportOutcome::Exported { .. }
            ));
        }
    }

    #[test]
    fn test_force_overrides_versioning() {
        let dir = tempfile::tempdir().unwrap();
        let config = test_config(dir.path(), true);
        let mut storage = DbcStorage::open_memory().unwrap();
        let meta_path = seed(&config, &mut storage, &[1]);

        let mut exporter = Exporter::new(&mut storage, &config);
        exporter.export_table(&meta_path).unwrap();

        let mut exporter = Exporter::new(&mut storage, &config).with_versioning(false);
        assert!(matches!(
            exporter.export_table(&meta_path).unwrap(),
            ExportOutcome::Exported { .. }
        ));
    }

    #[test]
    fn test_missing_table_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let config = test_config(dir.path(), true);
        std::fs::create_dir_all(&config.paths.meta).unwrap();
        let meta_path = config.paths.meta.join("Item.meta.json");
        std::fs::write(&meta_path, ITEM_META).unwrap();

        let mut storage = DbcStorage::open_memory().unwrap();
        let mut exporter = Exporter::new(&mut storage, &config);
        assert_eq!(
            exporter.export_table(&meta_path).unwrap(),
            ExportOutcome::SkippedMissingTable
        );
    }

    #[test]
    fn test_export_respects_sort_order() {
        let dir = tempfile::tempdir().unwrap();
        let config = test_config(dir.path(), true);
        let mut storage = DbcStorage::open_memory().unwrap();
        // Insert out of order; sortOrder says ID ASC.
        let meta_path = seed(&config, &mut storage, &[3, 1, 2]);

        let mut exporter = Exporter::new(&mut storage, &config);
        let ExportOutcome::Exported { path, .. } = exporter.export_table(&meta_path).unwrap()
        else {
            panic!("expected export");
        };

        let meta = TableMeta::from_json(ITEM_META, "Item").unwrap();
        let decoded = codec::decode(&std::fs::read(path).unwrap(), &meta).unwrap();
        let ids: Vec<_> = decoded.iter().map(|r| r.values[0].clone()).collect();
        assert_eq!(
            ids,
            vec![Value::Uint32(1), Value::Uint32(2), Value::Uint32(3)]
        );
    }
}
