//! Header command implementation.

use std::fs;

use crate::codec;
use crate::config::Config;
use crate::error::Result;

/// Print header info of a DBC file without decoding its records.
///
/// # Errors
///
/// Returns an error if the file cannot be read or its header is
/// malformed.
pub fn execute(config: &Config, name: &str, json: bool) -> Result<()> {
    let file = format!("{name}.dbc");
    let bytes = fs::read(config.dbc_path(&file))?;
    let header = codec::read_header(&bytes, &file)?;

    if json {
        let output = serde_json::json!({
            "file": file,
            "magic": "WDBC",
            "record_count": header.record_count,
            "field_count": header.field_count,
            "record_size": header.record_size,
            "string_block_size": header.string_block_size,
        });
        println!("{output}");
    } else {
        println!("Header info for {file}:");
        println!("  Magic: WDBC");
        println!("  Record Count: {}", header.record_count);
        println!("  Field Count: {}", header.field_count);
        println!("  Record Size: {} bytes", header.record_size);
        println!("  String Block Size: {} bytes", header.string_block_size);
    }
    Ok(())
}
