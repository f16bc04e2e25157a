//! Command implementations.

pub mod completions;
pub mod export;
pub mod header;
pub mod import;
pub mod init;
pub mod read;
pub mod version;

use crate::config::Config;
use crate::error::Result;
use crate::storage::DbcStorage;

/// Open the configured database, creating its parent directory first.
pub(crate) fn open_storage(config: &Config) -> Result<DbcStorage> {
    if let Some(parent) = config.database.path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    DbcStorage::open(&config.database.path)
}
