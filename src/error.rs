//! Error types for card generation

use std::path::PathBuf;

use thiserror::Error;

/// Result type alias for snapcard operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while loading configuration or exporting cards.
///
/// Parsing, rendering, measuring and paginating never fail; anomalies in the
/// markdown are resolved by fallbacks instead.
#[derive(Error, Debug)]
pub enum Error {
    /// Failed to read an input or theme file
    #[error("Failed to read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Failed to write an exported card
    #[error("Failed to write {}: {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Unknown built-in theme '{name}'. Available: {available}")]
    UnknownTheme { name: String, available: String },

    /// Theme file was neither valid TOML nor valid YAML
    #[error("Failed to parse theme: {0}")]
    ThemeParse(String),

    #[error("Invalid canvas size '{0}' (use auto, square, landscape or WIDTHxHEIGHT)")]
    InvalidCanvas(String),

    /// The export backend could not be initialised
    #[error("Export backend unavailable: {0}")]
    BackendUnavailable(String),

    #[error("Nothing to export")]
    NothingToExport,

    #[error("An export is already in progress")]
    ExportInProgress,

    #[error("Failed to serialize pagination: {0}")]
    Json(#[from] serde_json::Error),

    /// A single page failed to encode; the remaining pages were skipped
    #[error("Export failed on page {page}: {reason}")]
    ExportFailed { page: usize, reason: String },
}
