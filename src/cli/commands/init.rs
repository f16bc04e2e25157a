//! Init command implementation.

use std::path::Path;

use crate::config::Config;
use crate::error::{Error, Result};

/// Write a config template for the user to edit.
///
/// # Errors
///
/// Returns a config error if the file already exists and `--force`
/// was not given, or an IO error if the write fails.
pub fn execute(config_path: &Path, force: bool, json: bool) -> Result<()> {
    if config_path.exists() && !force {
        return Err(Error::Config(format!(
            "config file {} already exists (use --force to overwrite)",
            config_path.display()
        )));
    }

    Config::template().write(config_path)?;

    if json {
        let output = serde_json::json!({
            "created": config_path.display().to_string(),
        });
        println!("{output}");
    } else {
        println!(
            "Config template created at {}. Edit it and re-run.",
            config_path.display()
        );
    }
    Ok(())
}
