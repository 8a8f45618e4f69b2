//! Storage directory management and expense file persistence.
//!
//! File system layout is one JSON file per token inside a single fixed
//! directory:
//!
//! ```text
//! <data_dir>/
//! ├── data_alice.json
//! └── data_device-42.json
//! ```
//!
//! A token's file exists only once its first save has succeeded;
//! loading an absent file yields an empty collection. Operations here
//! assume the caller holds that token's lock (see
//! [`LockRegistry`](crate::LockRegistry)); this layer performs no
//! locking of its own.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use outlay_model::Expense;

use crate::error::{StoreError, StoreResult};
use crate::token::Token;

/// Prefix of every per-token expense file.
const FILE_PREFIX: &str = "data_";

/// Handle to the fixed storage directory.
///
/// [`StoreDir::open`] expects the directory to exist. Provisioning
/// happens once at startup via [`StoreDir::create`], never lazily per
/// request.
#[derive(Debug, Clone)]
pub struct StoreDir {
    path: PathBuf,
}

impl StoreDir {
    /// Opens an existing storage directory.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::DirectoryMissing`] if the path does not
    /// exist or is not a directory.
    pub fn open(path: &Path) -> StoreResult<Self> {
        if !path.is_dir() {
            return Err(StoreError::DirectoryMissing(path.to_path_buf()));
        }
        Ok(Self {
            path: path.to_path_buf(),
        })
    }

    /// Creates the storage directory (and parents) if missing, then
    /// opens it.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Io`] if the directory cannot be created.
    pub fn create(path: &Path) -> StoreResult<Self> {
        fs::create_dir_all(path)?;
        Self::open(path)
    }

    /// Returns the storage directory path.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Returns the path of a token's expense file.
    ///
    /// The name is `data_<token>.json`. Tokens are allow-listed at
    /// construction, so the result is always a plain file inside the
    /// storage directory.
    #[must_use]
    pub fn expense_path(&self, token: &Token) -> PathBuf {
        self.path.join(format!("{FILE_PREFIX}{token}.json"))
    }

    /// Writes a token's full collection, replacing any prior contents.
    ///
    /// The collection is serialized as pretty-printed JSON and written
    /// with a single `fs::write`. No partial-write recovery is
    /// attempted: a failed write may leave the previous file intact or
    /// truncated, and the caller must treat the update as lost.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Io`] if the write cannot complete.
    pub fn save_expenses(&self, token: &Token, expenses: &[Expense]) -> StoreResult<()> {
        let data = serde_json::to_vec_pretty(expenses).map_err(StoreError::Encode)?;
        fs::write(self.expense_path(token), data)?;
        Ok(())
    }

    /// Loads a token's collection in stored order.
    ///
    /// A token with no file yet is a new user: the result is an empty
    /// collection, not an error, and nothing is created on disk.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Parse`] if the file exists but does not
    /// deserialize to an expense collection, or [`StoreError::Io`] if
    /// it cannot be read.
    pub fn load_expenses(&self, token: &Token) -> StoreResult<Vec<Expense>> {
        let data = match fs::read(self.expense_path(token)) {
            Ok(data) => data,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(err) => return Err(err.into()),
        };
        serde_json::from_slice(&data).map_err(|source| StoreError::parse(token, source))
    }
}
