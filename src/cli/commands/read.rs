//! Read command implementation.
//!
//! Decodes a DBC file, prints one sample record, and optionally
//! rebuilds the file into the export directory as a codec sanity
//! check.

use std::fs;

use colored::Colorize;

use crate::codec;
use crate::config::Config;
use crate::error::{Error, Result};
use crate::meta::{LOCALES, TableMeta};
use crate::model::{Record, Value};

/// Execute the read command.
///
/// # Errors
///
/// Returns an error if the meta document or DBC file is invalid, or
/// the sample index is out of range.
pub fn execute(config: &Config, name: &str, record: usize, out: bool, json: bool) -> Result<()> {
    let meta = TableMeta::load(&config.meta_path(name))?;
    let bytes = fs::read(config.dbc_path(&meta.file))?;
    let records = codec::decode(&bytes, &meta)?;

    if record >= records.len() {
        return Err(Error::InvalidArgument(format!(
            "record index {record} out of range; {} has {} records",
            meta.file,
            records.len()
        )));
    }

    if json {
        let output = serde_json::json!({
            "file": meta.file,
            "records": records.len(),
            "record": record,
            "fields": record_to_json(&records[record], &meta),
        });
        println!("{output}");
    } else {
        println!("Read {} ({} records)", meta.file.bold(), records.len());
        println!("Record {record}:");
        print_record(&records[record], &meta);
    }

    if out {
        let rebuilt = codec::encode(&records, &meta)?;
        let out_path = config.export_path(&meta.file);
        if let Some(parent) = out_path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&out_path, &rebuilt)?;
        if !json {
            println!("\n{} written to {}", meta.file, out_path.display());
        }
    }

    Ok(())
}

/// Print a record field by field.
fn print_record(record: &Record, meta: &TableMeta) {
    for (lf, value) in meta.logical_fields().iter().zip(&record.values) {
        println!("  {}: {value}", lf.name.cyan());
    }
}

/// A record as a JSON object keyed by logical field name.
fn record_to_json(record: &Record, meta: &TableMeta) -> serde_json::Value {
    let mut obj = serde_json::Map::new();
    for (lf, value) in meta.logical_fields().iter().zip(&record.values) {
        let json = match value {
            Value::Int32(v) => serde_json::json!(v),
            Value::Uint32(v) => serde_json::json!(v),
            Value::Float(v) => serde_json::json!(v),
            Value::Text(s) => serde_json::json!(s),
            Value::Loc(loc) => {
                let mut inner = serde_json::Map::new();
                for (lang, s) in LOCALES.iter().zip(&loc.strings) {
                    inner.insert((*lang).to_string(), serde_json::json!(s));
                }
                inner.insert("flags".to_string(), serde_json::json!(loc.flags));
                serde_json::Value::Object(inner)
            }
        };
        obj.insert(lf.name.clone(), json);
    }
    serde_json::Value::Object(obj)
}
