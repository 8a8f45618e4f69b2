//! Error types for the sync server.

use std::time::Duration;

use hyper::StatusCode;
use outlay_store::StoreError;
use thiserror::Error;

/// Result type for server operations.
pub type ServerResult<T> = Result<T, ServerError>;

/// Errors that can occur while serving requests.
#[derive(Debug, Error)]
pub enum ServerError {
    /// The request carried no usable bearer token.
    #[error("authentication failed: {0}")]
    Auth(String),

    /// The request was well-addressed but its content was unusable.
    #[error("invalid request: {0}")]
    Validation(String),

    /// The store rejected or failed the operation.
    #[error("store operation failed: {0}")]
    Store(#[from] StoreError),

    /// The store operation did not finish within the deadline.
    #[error("store operation timed out after {0:?}")]
    Timeout(Duration),

    /// The operation failed for reasons internal to the server.
    #[error("internal error: {0}")]
    Internal(String),

    /// The listener could not be set up or failed while accepting.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl ServerError {
    /// Creates an authentication error.
    pub fn auth(message: impl Into<String>) -> Self {
        Self::Auth(message.into())
    }

    /// Creates a validation error.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// Returns `true` if the error was caused by the client.
    #[must_use]
    pub fn is_client_error(&self) -> bool {
        matches!(self, Self::Auth(_) | Self::Validation(_))
    }

    /// Returns `true` if the error is the server's fault.
    #[must_use]
    pub fn is_server_error(&self) -> bool {
        !self.is_client_error()
    }

    /// Maps the error to its response status.
    #[must_use]
    pub fn status(&self) -> StatusCode {
        match self {
            Self::Auth(_) => StatusCode::UNAUTHORIZED,
            Self::Validation(_) => StatusCode::BAD_REQUEST,
            Self::Store(_) | Self::Timeout(_) | Self::Internal(_) | Self::Io(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}
