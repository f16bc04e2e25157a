//! DBC <-> SQL converter driven by external schema metadata.
//!
//! This crate provides the core functionality for the `dbcsync` CLI tool:
//! importing DBC files (fixed header, fixed-stride rows, offset-addressed
//! string block) into SQLite tables and rebuilding DBC files from those
//! tables, skipping unchanged tables via a content checksum.
//!
//! # Architecture
//!
//! - [`cli`] - Command-line interface using clap
//! - [`meta`] - Schema metadata documents (`*.meta.json`)
//! - [`model`] - Typed record values
//! - [`codec`] - DBC binary decode/encode
//! - [`storage`] - SQLite table layer (DDL, batched upserts, checksums)
//! - [`pipeline`] - Import/export orchestration and duplicate auditing
//! - [`config`] - Configuration management
//! - [`error`] - Error types and handling

#![forbid(unsafe_code)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod cli;
pub mod codec;
pub mod config;
pub mod error;
pub mod meta;
pub mod model;
pub mod pipeline;
pub mod storage;

pub use error::{Error, Result};
