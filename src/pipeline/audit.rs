//! Duplicate-key auditor.
//!
//! A diagnostic pass over decoded records before import: for every
//! declared unique-key group, records sharing the same key values are
//! reported with their full field sets. Advisory only; the subsequent
//! upsert still runs, and storage-level dedup (last write wins) is the
//! upsert's job, not this pass's.

use std::collections::HashMap;

use colored::Colorize;
use tracing::warn;

use crate::meta::TableMeta;
use crate::model::{Record, Value};

/// Sentinel for a key column a record has no value for.
pub const MISSING_SENTINEL: &str = "<MISSING>";

/// One set of records sharing a unique key.
#[derive(Debug, Clone)]
pub struct DuplicateGroup {
    /// Index of the unique-key declaration in the schema.
    pub key_index: usize,
    /// Columns that make up the key.
    pub columns: Vec<String>,
    /// Concatenated key values shared by the records.
    pub key: String,
    /// Indices of all records carrying this key.
    pub indices: Vec<usize>,
}

/// Scan records for unique-key violations.
///
/// Keys are compared by the concatenated string form of the group's
/// column values, matching how the values would collide in storage.
#[must_use]
pub fn check_unique_keys(records: &[Record], meta: &TableMeta) -> Vec<DuplicateGroup> {
    let column_names = meta.column_names();
    let col_index: HashMap<&str, usize> = column_names
        .iter()
        .enumerate()
        .map(|(i, c)| (c.as_str(), i))
        .collect();

    // Expand each record to its relational cell strings once.
    let expanded: Vec<Vec<String>> = records.iter().map(expand_cells).collect();

    let mut out = Vec::new();
    for (key_index, group) in meta.unique_keys.iter().enumerate() {
        if group.is_empty() {
            continue;
        }

        let mut seen: HashMap<String, Vec<usize>> = HashMap::new();
        for (idx, cells) in expanded.iter().enumerate() {
            let key = group
                .iter()
                .map(|col| {
                    col_index
                        .get(col.as_str())
                        .and_then(|&i| cells.get(i))
                        .map_or_else(|| MISSING_SENTINEL.to_string(), Clone::clone)
                })
                .collect::<Vec<_>>()
                .join(":");
            seen.entry(key).or_default().push(idx);
        }

        let mut groups: Vec<DuplicateGroup> = seen
            .into_iter()
            .filter(|(_, indices)| indices.len() > 1)
            .map(|(key, indices)| DuplicateGroup {
                key_index,
                columns: group.clone(),
                key,
                indices,
            })
            .collect();
        groups.sort_by_key(|g| g.indices[0]);
        out.extend(groups);
    }
    out
}

/// Log every duplicate group with a full field dump per record.
pub fn report(table: &str, groups: &[DuplicateGroup], records: &[Record], meta: &TableMeta) {
    let logical = meta.logical_fields();
    for g in groups {
        warn!(
            "duplicate records in table '{table}' for unique key #{} ({}): {}",
            g.key_index,
            g.columns.join(", "),
            g.key
        );
        for &idx in &g.indices {
            eprintln!("  {} {{", format!("Record {idx}:").yellow());
            if let Some(rec) = records.get(idx) {
                for (lf, value) in logical.iter().zip(&rec.values) {
                    eprintln!("    {}: {value}", lf.name);
                }
            }
            eprintln!("  }}");
        }
    }
}

/// A record's values as relational cell strings, aligned with
/// [`TableMeta::column_names`].
fn expand_cells(record: &Record) -> Vec<String> {
    let mut out = Vec::new();
    for value in &record.values {
        match value {
            Value::Loc(loc) => {
                for s in &loc.strings {
                    out.push(s.clone());
                }
                out.push(loc.flags.to_string());
            }
            v => out.push(v.to_string()),
        }
    }
    out
}
