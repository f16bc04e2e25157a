//! Table shape derivation and row mapping.
//!
//! Everything here is a pure function of the schema: column lists, DDL
//! text, upsert statements, batch sizing, and the record <-> row value
//! conversions. The actual execution lives in
//! [`crate::storage::sqlite`].
//!
//! Column type mapping: `int32` -> INTEGER, `uint32` -> BIGINT (declared
//! wide so bit-pattern values never overflow into the sign), `float` ->
//! REAL, `string` -> TEXT, `Loc` -> one TEXT per locale plus an INTEGER
//! flags column.

use rusqlite::Row;
use rusqlite::types::Value as SqlValue;

use crate::error::{Error, Result};
use crate::meta::{FieldKind, LOCALES, LogicalField, TableMeta};
use crate::model::{LocValue, Record, Value};

/// Conservative per-statement parameter ceiling.
pub const MAX_PARAMS_PER_STATEMENT: usize = 60_000;

/// Independent cap on rows per upsert batch.
pub const MAX_ROWS_PER_BATCH: usize = 2_000;

/// Rows per batch so that `columns * rows` stays under the parameter
/// ceiling.
#[must_use]
pub fn batch_rows(columns_per_row: usize) -> usize {
    MAX_ROWS_PER_BATCH
        .min(MAX_PARAMS_PER_STATEMENT / columns_per_row.max(1))
        .max(1)
}

/// Quote an identifier for SQL.
#[must_use]
pub fn quote(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

/// Column definitions (`"name" TYPE`) in schema order.
#[must_use]
pub fn column_defs(meta: &TableMeta) -> Vec<String> {
    let mut out = Vec::new();
    for lf in meta.logical_fields() {
        match lf.kind {
            FieldKind::Int32 => out.push(format!("{} INTEGER", quote(&lf.name))),
            FieldKind::Uint32 => out.push(format!("{} BIGINT", quote(&lf.name))),
            FieldKind::Float => out.push(format!("{} REAL", quote(&lf.name))),
            FieldKind::Text => out.push(format!("{} TEXT", quote(&lf.name))),
            FieldKind::Loc => {
                for lang in LOCALES {
                    out.push(format!("{} TEXT", quote(&format!("{}_{lang}", lf.name))));
                }
                out.push(format!("{} INTEGER", quote(&format!("{}_flags", lf.name))));
            }
        }
    }
    out
}

/// `CREATE TABLE IF NOT EXISTS` statement with primary and unique keys.
#[must_use]
pub fn create_table_sql(meta: &TableMeta) -> String {
    let pk = meta
        .effective_primary_keys()
        .iter()
        .map(|c| quote(c))
        .collect::<Vec<_>>()
        .join(", ");

    let mut sql = format!(
        "CREATE TABLE IF NOT EXISTS {} ({}, PRIMARY KEY ({pk})",
        quote(&meta.table_name()),
        column_defs(meta).join(", "),
    );

    for (i, group) in meta.unique_keys.iter().enumerate() {
        if group.is_empty() {
            continue;
        }
        let cols = group.iter().map(|c| quote(c)).collect::<Vec<_>>().join(", ");
        sql.push_str(&format!(", CONSTRAINT {} UNIQUE ({cols})", quote(&format!("uk_{i}"))));
    }

    sql.push(')');
    sql
}

/// Multi-row upsert statement for `row_count` rows.
///
/// `INSERT OR REPLACE` makes the write idempotent under any primary or
/// unique key collision; the last row in batch order wins.
#[must_use]
pub fn insert_sql(table: &str, columns: &[String], row_count: usize) -> String {
    let cols = columns.iter().map(|c| quote(c)).collect::<Vec<_>>().join(", ");
    let row = format!("({})", vec!["?"; columns.len()].join(", "));
    let rows = vec![row; row_count].join(", ");
    format!("INSERT OR REPLACE INTO {} ({cols}) VALUES {rows}", quote(table))
}

/// `ORDER BY` clause from the schema's sort declarations, or empty.
#[must_use]
pub fn order_by_clause(meta: &TableMeta) -> String {
    if meta.sort_order.is_empty() {
        return String::new();
    }
    let parts = meta
        .sort_order
        .iter()
        .map(|sf| format!("{} {}", quote(&sf.name), sf.direction.sql()))
        .collect::<Vec<_>>()
        .join(", ");
    format!(" ORDER BY {parts}")
}

/// `SELECT` statement reading all rows in export order.
#[must_use]
pub fn select_sql(meta: &TableMeta) -> String {
    let cols = meta
        .column_names()
        .iter()
        .map(|c| quote(c))
        .collect::<Vec<_>>()
        .join(", ");
    format!(
        "SELECT {cols} FROM {}{}",
        quote(&meta.table_name()),
        order_by_clause(meta)
    )
}

/// `SELECT` statement for checksum scans: primary-key order, so the
/// fingerprint is stable regardless of insertion order.
#[must_use]
pub fn checksum_select_sql(meta: &TableMeta) -> String {
    let cols = meta
        .column_names()
        .iter()
        .map(|c| quote(c))
        .collect::<Vec<_>>()
        .join(", ");
    let pk = meta
        .effective_primary_keys()
        .iter()
        .map(|c| quote(c))
        .collect::<Vec<_>>()
        .join(", ");
    format!(
        "SELECT {cols} FROM {} ORDER BY {pk}",
        quote(&meta.table_name())
    )
}

/// Flatten one record into SQL parameter values, one per column.
///
/// # Errors
///
/// Returns an internal error if the record does not line up with the
/// schema; that indicates a bug upstream.
pub fn bind_record(record: &Record, logical: &[LogicalField]) -> Result<Vec<SqlValue>> {
    if record.len() != logical.len() {
        return Err(Error::Internal(format!(
            "record has {} values, schema expects {}",
            record.len(),
            logical.len()
        )));
    }

    let mut out = Vec::new();
    for (lf, value) in logical.iter().zip(&record.values) {
        match (lf.kind, value) {
            (FieldKind::Int32, Value::Int32(v)) => out.push(SqlValue::Integer(i64::from(*v))),
            (FieldKind::Uint32, Value::Uint32(v)) => out.push(SqlValue::Integer(i64::from(*v))),
            (FieldKind::Float, Value::Float(v)) => out.push(SqlValue::Real(f64::from(*v))),
            (FieldKind::Text, Value::Text(s)) => out.push(SqlValue::Text(s.clone())),
            (FieldKind::Loc, Value::Loc(loc)) => {
                for s in &loc.strings {
                    out.push(SqlValue::Text(s.clone()));
                }
                out.push(SqlValue::Integer(i64::from(loc.flags)));
            }
            (kind, value) => {
                return Err(Error::Internal(format!(
                    "{} value in field `{}` declared {}",
                    value.kind().wire_name(),
                    lf.name,
                    kind.wire_name()
                )));
            }
        }
    }
    Ok(out)
}

/// Rebuild a record from a SQL row.
///
/// NULL and missing cells become the field kind's zero value rather
/// than failing; exported files should not depend on how a row was
/// originally populated.
pub fn row_to_record(row: &Row<'_>, logical: &[LogicalField]) -> rusqlite::Result<Record> {
    let mut values = Vec::with_capacity(logical.len());
    let mut idx = 0;
    for lf in logical {
        match lf.kind {
            FieldKind::Int32 => {
                let v: Option<i64> = row.get(idx)?;
                values.push(Value::Int32(v.unwrap_or(0) as i32));
                idx += 1;
            }
            FieldKind::Uint32 => {
                let v: Option<i64> = row.get(idx)?;
                values.push(Value::Uint32(v.unwrap_or(0) as u32));
                idx += 1;
            }
            FieldKind::Float => {
                let v: Option<f64> = row.get(idx)?;
                values.push(Value::Float(v.unwrap_or(0.0) as f32));
                idx += 1;
            }
            FieldKind::Text => {
                let v: Option<String> = row.get(idx)?;
                values.push(Value::Text(v.unwrap_or_default()));
                idx += 1;
            }
            FieldKind::Loc => {
                let mut loc = LocValue::default();
                for s in &mut loc.strings {
                    *s = row.get::<_, Option<String>>(idx)?.unwrap_or_default();
                    idx += 1;
                }
                let flags: Option<i64> = row.get(idx)?;
                loc.flags = flags.unwrap_or(0) as u32;
                idx += 1;
                values.push(Value::Loc(loc));
            }
        }
    }
    Ok(Record::new(values))
}
