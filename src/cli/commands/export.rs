//! Export command implementation.

use crate::config::Config;
use crate::error::Result;
use crate::pipeline::{ExportOutcome, Exporter};

/// Export one table or every table with a meta document.
///
/// `--force` disables versioning for this run, so unchanged tables are
/// rebuilt anyway.
///
/// # Errors
///
/// Bulk runs only fail if the meta directory cannot be scanned;
/// single-table runs surface that table's error.
pub fn execute(config: &Config, name: Option<&str>, force: bool, json: bool) -> Result<()> {
    let mut storage = super::open_storage(config)?;
    let mut exporter = Exporter::new(&mut storage, config);
    if force {
        exporter = exporter.with_versioning(false);
    }

    if let Some(name) = name {
        let outcome = exporter.export_table(&config.meta_path(name))?;
        if json {
            let output = serde_json::json!({
                "table": name,
                "result": outcome,
            });
            println!("{output}");
        } else {
            match outcome {
                ExportOutcome::Exported { records, path } => {
                    println!("Exported {} ({records} records)", path.display());
                }
                ExportOutcome::Skipped => {
                    println!("Skipped {name}: content unchanged");
                }
                ExportOutcome::SkippedMissingTable => {
                    println!("Skipped {name}: table does not exist");
                }
            }
        }
        return Ok(());
    }

    let stats = exporter.export_all()?;
    if json {
        let output = serde_json::json!({
            "success": stats.failed == 0,
            "stats": stats,
        });
        println!("{output}");
    } else {
        println!("Export complete.");
        println!();
        println!("  Exported: {}", stats.exported);
        println!("  Skipped:  {}", stats.skipped);
        if stats.failed > 0 {
            println!("  Failed:   {}", stats.failed);
        }
        println!();
        println!("  Total: {} tables", stats.total());
    }
    Ok(())
}
