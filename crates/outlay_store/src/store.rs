//! The request-level expense operations.

use outlay_model::Expense;
use tracing::debug;

use crate::dir::StoreDir;
use crate::error::StoreResult;
use crate::locks::LockRegistry;
use crate::token::Token;

/// Token-scoped expense storage.
///
/// Each operation acquires its token's lock from the registry, holds
/// it across every file access, and releases it before returning.
/// Operations on different tokens never contend.
pub struct ExpenseStore {
    dir: StoreDir,
    locks: LockRegistry,
}

impl ExpenseStore {
    /// Creates a store over the given directory with a default-bounded
    /// lock registry.
    #[must_use]
    pub fn new(dir: StoreDir) -> Self {
        Self::with_locks(dir, LockRegistry::new())
    }

    /// Creates a store with an explicitly configured lock registry.
    #[must_use]
    pub fn with_locks(dir: StoreDir, locks: LockRegistry) -> Self {
        Self { dir, locks }
    }

    /// Returns the underlying storage directory.
    #[must_use]
    pub fn dir(&self) -> &StoreDir {
        &self.dir
    }

    /// Returns the per-token lock registry.
    #[must_use]
    pub fn locks(&self) -> &LockRegistry {
        &self.locks
    }

    /// Replaces the token's entire collection with `expenses`.
    ///
    /// The previous contents are discarded, never merged. Concurrent
    /// replacements for the same token serialize on its lock, so the
    /// file always holds exactly one caller's complete collection.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Io`](crate::StoreError::Io) if the write
    /// fails; the update is then lost and the caller must retry.
    pub fn replace_all(&self, token: &Token, expenses: &[Expense]) -> StoreResult<()> {
        let lock = self.locks.lock_for(token);
        let _guard = lock.lock();

        self.dir.save_expenses(token, expenses)?;
        debug!(count = expenses.len(), "collection replaced");
        Ok(())
    }

    /// Returns the token's collection in stored order.
    ///
    /// A token that has never synced gets an empty collection.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Parse`](crate::StoreError::Parse) if the
    /// token's file is malformed, or
    /// [`StoreError::Io`](crate::StoreError::Io) if it cannot be read.
    pub fn load_all(&self, token: &Token) -> StoreResult<Vec<Expense>> {
        let lock = self.locks.lock_for(token);
        let _guard = lock.lock();

        self.dir.load_expenses(token)
    }

    /// Removes every expense whose id renders to the given decimal
    /// string, then persists the remainder.
    ///
    /// Comparison is textual: `"01"` never matches id `1`. Deleting an
    /// absent id is a successful no-op, and a token with no file is
    /// left without one.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Parse`](crate::StoreError::Parse) or
    /// [`StoreError::Io`](crate::StoreError::Io) from the underlying
    /// load and save.
    pub fn delete_by_id(&self, token: &Token, id: &str) -> StoreResult<()> {
        let lock = self.locks.lock_for(token);
        let _guard = lock.lock();

        let expenses = self.dir.load_expenses(token)?;
        if expenses.is_empty() {
            return Ok(());
        }

        let before = expenses.len();
        let remaining: Vec<Expense> = expenses
            .into_iter()
            .filter(|expense| expense.id.to_string() != id)
            .collect();

        self.dir.save_expenses(token, &remaining)?;
        debug!(id, removed = before - remaining.len(), "delete applied");
        Ok(())
    }
}
