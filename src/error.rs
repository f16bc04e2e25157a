//! Error types for the dbcsync CLI.
//!
//! Provides structured error handling with:
//! - Machine-readable error codes (`ErrorCode`)
//! - Category-based exit codes (2=db, 4=schema, 5=format, etc.)
//! - Context-aware recovery hints
//! - Structured JSON output for piped / non-TTY consumers
//!
//! Non-fatal conditions (missing source file, table already present,
//! duplicate unique keys) are deliberately NOT errors. They are logged
//! warnings plus skip outcomes in [`crate::pipeline`], so a bulk run
//! continues past them.

use thiserror::Error;

/// Result type alias for dbcsync operations.
pub type Result<T> = std::result::Result<T, Error>;

// ── Error Code ────────────────────────────────────────────────

/// Machine-readable error codes grouped by category.
///
/// Each code maps to a SCREAMING_SNAKE string and a category-based
/// exit code. Scripts match on the string or the exit code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    // Database (exit 2)
    DatabaseError,

    // Bad invocation (exit 3)
    InvalidArgument,

    // Schema metadata (exit 4)
    SchemaError,

    // Binary layout (exit 5)
    FormatError,

    // Config (exit 7)
    ConfigError,

    // I/O (exit 8)
    IoError,
    JsonError,

    // Internal (exit 1)
    InternalError,
}

impl ErrorCode {
    /// Machine-readable SCREAMING_SNAKE code string.
    #[must_use]
    pub const fn as_str(&self) -> &str {
        match self {
            Self::DatabaseError => "DATABASE_ERROR",
            Self::InvalidArgument => "INVALID_ARGUMENT",
            Self::SchemaError => "SCHEMA_ERROR",
            Self::FormatError => "FORMAT_ERROR",
            Self::ConfigError => "CONFIG_ERROR",
            Self::IoError => "IO_ERROR",
            Self::JsonError => "JSON_ERROR",
            Self::InternalError => "INTERNAL_ERROR",
        }
    }

    /// Category-based exit code.
    #[must_use]
    pub const fn exit_code(&self) -> u8 {
        match self {
            Self::InternalError => 1,
            Self::DatabaseError => 2,
            Self::InvalidArgument => 3,
            Self::SchemaError => 4,
            Self::FormatError => 5,
            Self::ConfigError => 7,
            Self::IoError | Self::JsonError => 8,
        }
    }
}

// ── Error Enum ────────────────────────────────────────────────

/// Errors that can occur in dbcsync operations.
#[derive(Error, Debug)]
pub enum Error {
    #[error("Schema error in `{table}`: {message}")]
    Schema { table: String, message: String },

    #[error("Format error in `{file}`: {message}")]
    Format { file: String, message: String },

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Convenience constructor for schema metadata failures.
    pub fn schema(table: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Schema {
            table: table.into(),
            message: message.into(),
        }
    }

    /// Convenience constructor for binary layout failures.
    pub fn format(file: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Format {
            file: file.into(),
            message: message.into(),
        }
    }

    /// Map this error to its structured `ErrorCode`.
    #[must_use]
    pub const fn error_code(&self) -> ErrorCode {
        match self {
            Self::Schema { .. } => ErrorCode::SchemaError,
            Self::Format { .. } => ErrorCode::FormatError,
            Self::Database(_) => ErrorCode::DatabaseError,
            Self::Io(_) => ErrorCode::IoError,
            Self::Json(_) => ErrorCode::JsonError,
            Self::Config(_) => ErrorCode::ConfigError,
            Self::InvalidArgument(_) => ErrorCode::InvalidArgument,
            Self::Internal(_) => ErrorCode::InternalError,
        }
    }

    /// Category-based exit code, delegating to the `ErrorCode`.
    #[must_use]
    pub const fn exit_code(&self) -> u8 {
        self.error_code().exit_code()
    }

    /// Context-aware recovery hint.
    ///
    /// Returns `None` if no actionable suggestion exists.
    #[must_use]
    pub fn hint(&self) -> Option<String> {
        match self {
            Self::Config(msg) if msg.contains("not found") => Some(
                "Run `dbcsync init` to create a config template, then edit it.".to_string(),
            ),
            Self::Schema { table, .. } => Some(format!(
                "Check the field/key definitions in `{table}.meta.json`."
            )),
            Self::Format { file, .. } => Some(format!(
                "`{file}` does not match its schema; the file may be truncated or the meta document out of date."
            )),
            _ => None,
        }
    }

    /// Structured JSON representation for machine consumption.
    ///
    /// Includes error code, message, exit code, and optional recovery hint.
    #[must_use]
    pub fn to_structured_json(&self) -> serde_json::Value {
        let code = self.error_code();
        let mut obj = serde_json::json!({
            "error": {
                "code": code.as_str(),
                "message": self.to_string(),
                "exit_code": code.exit_code(),
            }
        });

        if let Some(hint) = self.hint() {
            obj["error"]["hint"] = serde_json::Value::String(hint);
        }

        obj
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_codes_by_category() {
        assert_eq!(Error::schema("Spell", "bad").exit_code(), 4);
        assert_eq!(Error::format("Spell.dbc", "bad magic").exit_code(), 5);
        assert_eq!(Error::Config("x".into()).exit_code(), 7);
        assert_eq!(Error::Internal("x".into()).exit_code(), 1);
    }

    #[test]
    fn test_structured_json_has_code_and_message() {
        let err = Error::format("Map.dbc", "truncated record section");
        let json = err.to_structured_json();
        assert_eq!(json["error"]["code"], "FORMAT_ERROR");
        assert!(
            json["error"]["message"]
                .as_str()
                .unwrap()
                .contains("Map.dbc")
        );
        assert!(json["error"]["hint"].is_string());
    }

    #[test]
    fn test_schema_error_names_table() {
        let err = Error::schema("ItemClass", "field `Flags` has unknown type `uint16`");
        let msg = err.to_string();
        assert!(msg.contains("ItemClass"));
        assert!(msg.contains("uint16"));
    }
}
