//! Error types for the expense store.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

use crate::token::Token;

/// Result type for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Errors that can occur in store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// I/O error reading or writing a token's file.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// A token's file exists but is not a valid expense collection.
    #[error("malformed expense file for token {token}: {source}")]
    Parse {
        /// Token whose file failed to deserialize.
        token: String,
        /// Underlying JSON error.
        source: serde_json::Error,
    },

    /// A collection could not be serialized for writing.
    #[error("failed to encode expenses: {0}")]
    Encode(#[source] serde_json::Error),

    /// The storage directory does not exist or is not a directory.
    #[error("storage directory missing: {}", .0.display())]
    DirectoryMissing(PathBuf),
}

impl StoreError {
    /// Creates a parse error for the given token's file.
    pub fn parse(token: &Token, source: serde_json::Error) -> Self {
        Self::Parse {
            token: token.as_str().to_owned(),
            source,
        }
    }
}
