//! Import command implementation.

use crate::config::Config;
use crate::error::Result;
use crate::pipeline::{ImportOutcome, Importer};

/// Import one table or every table with a meta document.
///
/// # Errors
///
/// Bulk runs only fail if the meta directory cannot be scanned;
/// single-table runs surface that table's error.
pub fn execute(config: &Config, name: Option<&str>, json: bool) -> Result<()> {
    let mut storage = super::open_storage(config)?;
    let mut importer = Importer::new(&mut storage, config);

    if let Some(name) = name {
        let outcome = importer.import_table(&config.meta_path(name))?;
        if json {
            let output = serde_json::json!({
                "table": name,
                "result": outcome,
            });
            println!("{output}");
        } else {
            match outcome {
                ImportOutcome::Imported { records } => {
                    println!("Imported {name} ({records} records)");
                }
                ImportOutcome::SkippedMissingFile => {
                    println!("Skipped {name}: DBC file does not exist");
                }
                ImportOutcome::SkippedTableExists => {
                    println!("Skipped {name}: table already exists");
                }
            }
        }
        return Ok(());
    }

    let stats = importer.import_all()?;
    if json {
        let output = serde_json::json!({
            "success": stats.failed == 0,
            "stats": stats,
        });
        println!("{output}");
    } else {
        println!("Import complete.");
        println!();
        println!("  Imported: {}", stats.imported);
        println!("  Skipped:  {}", stats.skipped);
        if stats.failed > 0 {
            println!("  Failed:   {}", stats.failed);
        }
        println!();
        println!("  Total: {} tables", stats.total());
    }
    Ok(())
}
