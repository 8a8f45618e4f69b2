//! # Outlay Store
//!
//! Token-scoped, file-backed storage for expense collections.
//!
//! This crate is the concurrency-bearing core of the outlay service:
//!
//! - [`Token`]: a bearer string validated for use as a storage key
//! - [`LockRegistry`]: one mutual-exclusion lock per token, created
//!   lazily and softly bounded
//! - [`StoreDir`]: the fixed storage directory and per-token JSON file
//!   persistence
//! - [`ExpenseStore`]: the request-level operations (replace-all,
//!   read-all, delete-by-id), each holding its token's lock for the
//!   full critical section
//!
//! Collections are wholly replaced on sync, never merged. The only
//! ordering guarantee per token is lock-acquisition order. Everything
//! here is synchronous; callers that must not block (the HTTP server)
//! run these operations on a blocking pool.

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod dir;
mod error;
mod locks;
mod store;
mod token;

pub use dir::StoreDir;
pub use error::{StoreError, StoreResult};
pub use locks::LockRegistry;
pub use store::ExpenseStore;
pub use token::{InvalidToken, Token, MAX_TOKEN_LEN};
