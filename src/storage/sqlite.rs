//! SQLite storage implementation.
//!
//! One [`DbcStorage`] wraps one connection. Table writes run inside a
//! single transaction per table: either every batch lands or none do,
//! so an aborted import never leaves a table partially populated.

use std::path::Path;
use std::time::Duration;

use rusqlite::types::Value as SqlValue;
use rusqlite::{Connection, OptionalExtension};
use sha2::{Digest, Sha256};

use crate::error::{Error, Result};
use crate::meta::TableMeta;
use crate::model::Record;
use crate::storage::schema::apply_schema;
use crate::storage::table::{
    batch_rows, bind_record, checksum_select_sql, create_table_sql, insert_sql, row_to_record,
    select_sql,
};

/// SQLite-backed storage for DBC tables and export bookkeeping.
#[derive(Debug)]
pub struct DbcStorage {
    conn: Connection,
}

impl DbcStorage {
    /// Open a database at the given path.
    ///
    /// Creates the database and applies the bookkeeping schema if it
    /// doesn't exist.
    ///
    /// # Errors
    ///
    /// Returns an error if the connection cannot be established or the
    /// schema fails.
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)?;
        conn.busy_timeout(Duration::from_secs(5))?;
        apply_schema(&conn)?;
        Ok(Self { conn })
    }

    /// Open an in-memory database (for testing).
    ///
    /// # Errors
    ///
    /// Returns an error if the connection cannot be established.
    pub fn open_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        apply_schema(&conn)?;
        Ok(Self { conn })
    }

    /// Get a reference to the underlying connection (for read operations).
    #[must_use]
    pub fn conn(&self) -> &Connection {
        &self.conn
    }

    /// Check if a table already exists.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub fn table_exists(&self, table: &str) -> Result<bool> {
        let exists = self
            .conn
            .prepare("SELECT 1 FROM sqlite_master WHERE type = 'table' AND name = ?1")?
            .exists([table])?;
        Ok(exists)
    }

    /// Create the table described by a meta document.
    ///
    /// # Errors
    ///
    /// Returns an error if the DDL fails.
    pub fn create_table(&self, meta: &TableMeta) -> Result<()> {
        self.conn.execute(&create_table_sql(meta), [])?;
        Ok(())
    }

    /// Upsert records in batches inside one transaction.
    ///
    /// Batch size keeps `columns x rows` under the engine's parameter
    /// ceiling. Returns the number of rows written. On any batch
    /// failure the transaction rolls back and the table is untouched.
    ///
    /// # Errors
    ///
    /// Returns an error if a statement fails or a record does not line
    /// up with the schema.
    pub fn insert_records(&mut self, meta: &TableMeta, records: &[Record]) -> Result<usize> {
        let logical = meta.logical_fields();
        let columns = meta.column_names();
        let table = meta.table_name();
        let batch = batch_rows(columns.len());

        let tx = self.conn.transaction()?;
        let mut written = 0;
        for chunk in records.chunks(batch) {
            let sql = insert_sql(&table, &columns, chunk.len());
            let mut params: Vec<SqlValue> = Vec::with_capacity(chunk.len() * columns.len());
            for rec in chunk {
                params.extend(bind_record(rec, &logical)?);
            }
            written += tx.execute(&sql, rusqlite::params_from_iter(params))?;
        }
        tx.commit()?;
        Ok(written)
    }

    /// Read every row of a table in the schema's declared export order.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub fn read_records(&self, meta: &TableMeta) -> Result<Vec<Record>> {
        let logical = meta.logical_fields();
        let mut stmt = self.conn.prepare(&select_sql(meta))?;
        let rows = stmt.query_map([], |row| row_to_record(row, &logical))?;
        rows.collect::<rusqlite::Result<Vec<_>>>()
            .map_err(Error::from)
    }

    /// Compute the table's current content fingerprint.
    ///
    /// Scans every cell in primary-key order, feeding a type-tagged
    /// canonical form into SHA-256, and truncates the digest to 64
    /// bits. Deterministic for identical content regardless of
    /// insertion order.
    ///
    /// # Errors
    ///
    /// Returns an error if the scan fails.
    pub fn table_checksum(&self, meta: &TableMeta) -> Result<u64> {
        let ncols = meta.column_names().len();
        let mut stmt = self.conn.prepare(&checksum_select_sql(meta))?;
        let mut rows = stmt.query([])?;

        let mut hasher = Sha256::new();
        while let Some(row) = rows.next()? {
            for i in 0..ncols {
                let cell: SqlValue = row.get(i)?;
                hash_cell(&mut hasher, &cell);
            }
            hasher.update([0xff]);
        }

        let digest = hasher.finalize();
        Ok(u64::from_le_bytes(digest[0..8].try_into().unwrap()))
    }

    /// Fetch the stored fingerprint for a table, creating a zero entry
    /// if none exists yet.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub fn ensure_checksum_entry(&self, table: &str) -> Result<u64> {
        let now = chrono::Utc::now().timestamp_millis();
        self.conn.execute(
            "INSERT OR IGNORE INTO export_checksums (table_name, checksum, updated_at)
             VALUES (?1, 0, ?2)",
            rusqlite::params![table, now],
        )?;
        let stored: i64 = self.conn.query_row(
            "SELECT checksum FROM export_checksums WHERE table_name = ?1",
            [table],
            |row| row.get(0),
        )?;
        Ok(u64::from_le_bytes(stored.to_le_bytes()))
    }

    /// Fetch the stored fingerprint without creating an entry.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub fn stored_checksum(&self, table: &str) -> Result<Option<u64>> {
        let stored: Option<i64> = self
            .conn
            .query_row(
                "SELECT checksum FROM export_checksums WHERE table_name = ?1",
                [table],
                |row| row.get(0),
            )
            .optional()?;
        Ok(stored.map(|v| u64::from_le_bytes(v.to_le_bytes())))
    }

    /// Persist a new fingerprint for a table.
    ///
    /// Call only after the exported file has been written.
    ///
    /// # Errors
    ///
    /// Returns an error if the write fails.
    pub fn store_checksum(&self, table: &str, checksum: u64) -> Result<()> {
        let now = chrono::Utc::now().timestamp_millis();
        self.conn.execute(
            "INSERT INTO export_checksums (table_name, checksum, updated_at)
             VALUES (?1, ?2, ?3)
             ON CONFLICT(table_name) DO UPDATE SET
               checksum = excluded.checksum,
               updated_at = excluded.updated_at",
            rusqlite::params![table, i64::from_le_bytes(checksum.to_le_bytes()), now],
        )?;
        Ok(())
    }
}

/// Feed one cell into the hasher in a type-tagged canonical form, so
/// `1`, `1.0`, and `"1"` fingerprint differently.
fn hash_cell(hasher: &mut Sha256, cell: &SqlValue) {
    match cell {
        SqlValue::Null => hasher.update(b"n"),
        SqlValue::Integer(v) => {
            hasher.update(b"i");
            hasher.update(v.to_le_bytes());
        }
        SqlValue::Real(v) => {
            hasher.update(b"r");
            hasher.update(v.to_bits().to_le_bytes());
        }
        SqlValue::Text(s) => {
            hasher.update(b"t");
            hasher.update((s.len() as u64).to_le_bytes());
            hasher.update(s.as_bytes());
        }
        SqlValue::Blob(b) => {
            hasher.update(b"b");
            hasher.update((b.len() as u64).to_le_bytes());
            hasher.update(b);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{LocValue, Value};

    fn item_meta() -> TableMeta {
        TableMeta::from_json(
            r#"{
                "file": "Item.dbc",
                "primaryKeys": ["ID"],
                "uniqueKeys": [["Icon"]],
                "sortOrder": [{"name": "ID", "direction": "asc"}],
                "fields": [
                    {"name": "ID", "type": "uint32"},
                    {"name": "Level", "type": "int32"},
                    {"name": "Weight", "type": "float"},
                    {"name": "Icon", "type": "string"},
                    {"name": "Name", "type": "Loc"}
                ]
            }"#,
            "Item",
        )
        .unwrap()
    }

    fn item(id: u32, level: i32, icon: &str, name: &str) -> Record {
        Record::new(vec![
            Value::Uint32(id),
            Value::Int32(level),
            Value::Float(1.5),
            Value::Text(icon.into()),
            Value::Loc(LocValue::from_strings([name], 0)),
        ])
    }

    #[test]
    fn test_create_insert_read_round_trip() {
        let mut storage = DbcStorage::open_memory().unwrap();
        let meta = item_meta();
        storage.create_table(&meta).unwrap();

        let records = vec![
            item(2, 10, "sword.blp", "Sword"),
            item(1, 5, "axe.blp", "Axe"),
        ];
        assert_eq!(storage.insert_records(&meta, &records).unwrap(), 2);

        // Read comes back in declared sort order (ID ASC).
        let read = storage.read_records(&meta).unwrap();
        assert_eq!(read.len(), 2);
        assert_eq!(read[0].values[0], Value::Uint32(1));
        assert_eq!(read[1].values[0], Value::Uint32(2));
        assert_eq!(read[1], records[0]);
    }

    #[test]
    fn test_table_exists() {
        let storage = DbcStorage::open_memory().unwrap();
        let meta = item_meta();
        assert!(!storage.table_exists("Item").unwrap());
        storage.create_table(&meta).unwrap();
        assert!(storage.table_exists("Item").unwrap());
    }

    #[test]
    fn test_uint32_full_range_survives() {
        let mut storage = DbcStorage::open_memory().unwrap();
        let meta = item_meta();
        storage.create_table(&meta).unwrap();

        let records = vec![item(u32::MAX, 0, "x.blp", "Max")];
        storage.insert_records(&meta, &records).unwrap();

        let read = storage.read_records(&meta).unwrap();
        assert_eq!(read[0].values[0], Value::Uint32(u32::MAX));
    }

    #[test]
    fn test_null_cells_become_zero_values() {
        let mut storage = DbcStorage::open_memory().unwrap();
        let meta = item_meta();
        storage.create_table(&meta).unwrap();

        // Insert a bare row via SQL, leaving most columns NULL.
        storage
            .conn()
            .execute("INSERT INTO \"Item\" (\"ID\") VALUES (3)", [])
            .unwrap();

        let read = storage.read_records(&meta).unwrap();
        assert_eq!(read[0].values[0], Value::Uint32(3));
        assert_eq!(read[0].values[1], Value::Int32(0));
        assert_eq!(read[0].values[2], Value::Float(0.0));
        assert_eq!(read[0].values[3], Value::Text(String::new()));
        assert_eq!(read[0].values[4], Value::Loc(LocValue::default()));
    }

    #[test]
    fn test_upsert_last_write_wins() {
        let mut storage = DbcStorage::open_memory().unwrap();
        let meta = item_meta();
        storage.create_table(&meta).unwrap();

        // Same primary key twice in one call; the later row survives.
        let records = vec![item(1, 5, "old.blp", "Old"), item(1, 9, "new.blp", "New")];
        storage.insert_records(&meta, &records).unwrap();

        let read = storage.read_records(&meta).unwrap();
        assert_eq!(read.len(), 1);
        assert_eq!(read[0].values[1], Value::Int32(9));
        assert_eq!(read[0].values[3], Value::Text("new.blp".into()));
    }

    #[test]
    fn test_upsert_on_unique_key_collision() {
        let mut storage = DbcStorage::open_memory().unwrap();
        let meta = item_meta();
        storage.create_table(&meta).unwrap();

        // Different primary keys but the same unique Icon; no constraint
        // failure, last write wins.
        let records = vec![item(1, 5, "same.blp", "A"), item(2, 6, "same.blp", "B")];
        storage.insert_records(&meta, &records).unwrap();

        let read = storage.read_records(&meta).unwrap();
        assert_eq!(read.len(), 1);
        assert_eq!(read[0].values[0], Value::Uint32(2));
    }

    #[test]
    fn test_checksum_stable_and_content_sensitive() {
        let mut storage = DbcStorage::open_memory().unwrap();
        let meta = item_meta();
        storage.create_table(&meta).unwrap();
        storage
            .insert_records(&meta, &[item(1, 5, "a.blp", "A")])
            .unwrap();

        let first = storage.table_checksum(&meta).unwrap();
        let second = storage.table_checksum(&meta).unwrap();
        assert_eq!(first, second);

        storage
            .insert_records(&meta, &[item(2, 6, "b.blp", "B")])
            .unwrap();
        let third = storage.table_checksum(&meta).unwrap();
        assert_ne!(first, third);
    }

    #[test]
    fn test_checksum_entry_lifecycle() {
        let storage = DbcStorage::open_memory().unwrap();

        assert_eq!(storage.stored_checksum("Item").unwrap(), None);
        assert_eq!(storage.ensure_checksum_entry("Item").unwrap(), 0);

        storage.store_checksum("Item", 0xdead_beef_cafe_f00d).unwrap();
        assert_eq!(
            storage.stored_checksum("Item").unwrap(),
            Some(0xdead_beef_cafe_f00d)
        );
        // ensure() must not reset an existing entry.
        assert_eq!(
            storage.ensure_checksum_entry("Item").unwrap(),
            0xdead_beef_cafe_f00d
        );
    }

    #[test]
    fn test_batched_insert_many_rows() {
        let mut storage = DbcStorage::open_memory().unwrap();
        let meta = item_meta();
        storage.create_table(&meta).unwrap();

        // More rows than one batch of this width holds.
        let records: Vec<Record> = (0..5_000)
            .map(|i| item(i, 1, &format!("icon{i}.blp"), &format!("Item {i}")))
            .collect();
        assert_eq!(storage.insert_records(&meta, &records).unwrap(), 5_000);

        let read = storage.read_records(&meta).unwrap();
        assert_eq!(read.len(), 5_000);
    }
}
