//! Error types for store operations.

use std::io;
use thiserror::Error;

/// Result type for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Errors that can occur during store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// An I/O error occurred.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Attempted to read beyond the end of the written region.
    #[error("read beyond end of store: position {position}, len {len}, size {size}")]
    ReadPastEnd {
        /// The requested read position.
        position: u64,
        /// The requested read length.
        len: u64,
        /// The current store size.
        size: u64,
    },

    /// The store is closed.
    #[error("store is closed")]
    Closed,

    /// The segment file is corrupted.
    #[error("segment corrupted: {0}")]
    Corrupted(String),
}
