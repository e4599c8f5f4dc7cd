//! Error kinds surfaced by the paste pipeline.
//!
//! Each kind maps to exactly one user-facing message at the router boundary.

use std::path::PathBuf;
use thiserror::Error;

/// Reading or decoding clipboard data failed.
#[derive(Error, Debug)]
pub enum ClipboardError {
    #[error("Could not access the system clipboard: {0}")]
    Unavailable(String),

    #[error("Could not read clipboard text: {0}")]
    ReadText(String),

    #[error("Could not write to the clipboard: {0}")]
    Write(String),
}

/// The external converter failed or produced nothing usable.
#[derive(Error, Debug)]
pub enum ConversionError {
    #[error("Converter executable not found: {0}")]
    NotFound(String),

    #[error("Converter is not working: {0}")]
    Unusable(String),

    #[error("Conversion failed: {0}")]
    Failed(String),

    #[error("Converter produced no output")]
    EmptyOutput,

    #[error("Could not post-process the document: {0}")]
    PostProcess(String),

    #[error("Could not build the spreadsheet: {0}")]
    Spreadsheet(String),
}

/// Inserting into the focused application failed.
#[derive(Error, Debug)]
pub enum InsertionError {
    #[error("{app} is not reachable through automation: {reason}")]
    AppUnavailable { app: &'static str, reason: String },

    #[error("Automation script failed: {0}")]
    Script(String),

    #[error("Insertion into {0} is not supported on this platform")]
    Unsupported(&'static str),

    #[error("No insertable target is focused")]
    NoTarget,
}

/// Configuration file could not be read or written.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Could not determine the user data directory")]
    NoDataDir,

    #[error("IO error on config file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid JSON in config {path}: {source}")]
    InvalidJson {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Config root must be a JSON object")]
    NotAnObject,
}
