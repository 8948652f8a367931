//! Error types for colfeed.
//!
//! Errors are `thiserror` enums composed with `?` and `From` conversions.
//!
//! # Error Hierarchy
//!
//! - [`AppError`] - top-level error returned from `main`
//!   - [`ConfigError`] - config file read/parse failures
//!   - [`LoggingError`] - tracing subscriber setup failures
//!   - [`SnapshotError`] - snapshot file loading failures
//!   - `TuiError` - terminal failures
//!   - `serde_json::Error` - `--dump` output failures
//! - [`UpdateError`] - one malformed line of an update stream (non-fatal)
//! - [`CardError`] - card descriptor derivation failure for one item (non-fatal)
//!
//! # Recovery Strategy
//!
//! Only the top-level variants are fatal. The pipeline itself is total: a
//! malformed update line is logged and skipped, and a descriptor failure
//! degrades that single item to a zero-size layout slot.

use crate::config::ConfigError;
use crate::logging::LoggingError;
use crate::model::ItemKey;
use std::path::PathBuf;
use thiserror::Error;

/// Top-level application error.
#[derive(Debug, Error)]
pub enum AppError {
    /// Configuration could not be loaded.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Logging could not be initialized.
    #[error("Logging error: {0}")]
    Logging(#[from] LoggingError),

    /// The snapshot file could not be loaded.
    #[error("Failed to load snapshot: {0}")]
    Snapshot(#[from] SnapshotError),

    /// Terminal or TUI rendering error.
    ///
    /// Fatal: the terminal is restored and the error is written to stderr.
    #[error("Terminal error: {0}")]
    Terminal(#[from] crate::view::TuiError),

    /// Writing the frame dump failed.
    #[error("Failed to write dump: {0}")]
    Dump(#[from] serde_json::Error),
}

/// Errors encountered when loading a snapshot file.
#[derive(Debug, Error)]
pub enum SnapshotError {
    /// The snapshot file does not exist.
    #[error("File not found: {path}")]
    FileNotFound {
        /// The path that was attempted.
        path: PathBuf,
    },

    /// The file exists but is not a valid snapshot document.
    #[error("Invalid snapshot in {path}: {reason}")]
    Parse {
        /// Path of the offending file.
        path: PathBuf,
        /// Parser message.
        reason: String,
    },

    /// Any other I/O failure.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// One malformed line of a JSONL update stream.
///
/// Non-fatal: the line is logged and skipped.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum UpdateError {
    /// The line is not valid JSON or does not match the update shape.
    #[error("Invalid update at line {line}: {message}")]
    InvalidJson {
        /// 1-based line number.
        line: usize,
        /// Parser message.
        message: String,
    },

    /// The update's item has no resolvable identity.
    #[error("Update at line {line} has no item identity")]
    MissingIdentity {
        /// 1-based line number.
        line: usize,
    },
}

/// Failure to derive a card descriptor for an item.
///
/// Non-fatal: the item keeps its slot with a zero size.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CardError {
    /// The item has an empty title.
    #[error("Item {} has no title", display_key(.key))]
    MissingTitle {
        /// Identity of the item, if it has one.
        key: Option<ItemKey>,
    },

    /// An activity event without an actor.
    #[error("Event {} has no actor", display_key(.key))]
    MissingActor {
        /// Identity of the item, if it has one.
        key: Option<ItemKey>,
    },
}

fn display_key(key: &Option<ItemKey>) -> String {
    key.as_ref()
        .map(|k| k.to_string())
        .unwrap_or_else(|| "<unidentified>".to_string())
}
