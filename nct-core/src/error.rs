//! Error types for nct-core.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for nct-core operations.
pub type Result<T> = std::result::Result<T, GraphError>;

/// Errors that can occur while loading, building or saving a correlation graph.
///
/// Every variant is a deterministic structural failure; none of them is worth
/// retrying.
#[derive(Error, Debug)]
pub enum GraphError {
    /// The meta description does not exist.
    #[error("Meta file not found: {}", path.display())]
    InputNotFound {
        /// Path that was looked up.
        path: PathBuf,
    },

    /// The meta description exists but could not be read.
    #[error("Failed to read meta file {}: {source}", path.display())]
    InputUnreadable {
        /// Path that failed to read.
        path: PathBuf,
        /// Underlying OS error.
        #[source]
        source: std::io::Error,
    },

    /// The meta description is not valid JSON of the expected shape.
    #[error("Invalid meta file {}: {source}", path.display())]
    InvalidMeta {
        /// Path of the rejected document.
        path: PathBuf,
        /// Parser error with line/column.
        #[source]
        source: serde_json::Error,
    },

    /// The requested NCT entry does not exist.
    #[error("NCT index {index} out of range: meta file has {len} entries")]
    IndexOutOfRange {
        /// Requested index.
        index: usize,
        /// Number of entries available.
        len: usize,
    },

    /// The selected entry has no feature pairs, so importance cannot be normalized.
    #[error("NCT {nct_index} has no feature pairs: cannot normalize importance without a maximum degree")]
    EmptyGraph {
        /// Index of the empty entry.
        nct_index: usize,
    },

    /// The output file could not be written.
    #[error("Failed to write graph to {}: {source}", path.display())]
    WriteFailure {
        /// Destination path.
        path: PathBuf,
        /// Underlying OS error.
        #[source]
        source: std::io::Error,
    },

    /// Graph serialization failed.
    #[error("JSON serialization error: {0}")]
    Serialize(#[from] serde_json::Error),
}

impl GraphError {
    /// True for both "missing" and "unreadable" input failures.
    pub fn is_input_not_found(&self) -> bool {
        matches!(
            self,
            GraphError::InputNotFound { .. } | GraphError::InputUnreadable { .. }
        )
    }
}
