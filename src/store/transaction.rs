//! Transaction scoping over a [`TripleStore`]
//!
//! A [`Transaction`] guard rolls back when dropped without a commit, so an
//! early return or a panic inside a unit of work never leaves partial writes.

use super::{StoreResult, TripleStore};
use tracing::{debug, error, warn};

/// Open transaction on a store
pub struct Transaction<'a, S: TripleStore + ?Sized> {
    store: &'a S,
    active: bool,
}

impl<'a, S: TripleStore + ?Sized> Transaction<'a, S> {
    /// Start a transaction, fails if one is already open on the store
    pub fn begin(store: &'a S) -> StoreResult<Self> {
        store.start_transaction()?;
        debug!("Transaction started");
        Ok(Self {
            store,
            active: true,
        })
    }

    pub fn store(&self) -> &'a S {
        self.store
    }

    pub fn commit(mut self) -> StoreResult<()> {
        self.active = false;
        self.store.commit_transaction()?;
        debug!("Transaction committed");
        Ok(())
    }

    pub fn rollback(mut self) -> StoreResult<()> {
        self.active = false;
        self.store.rollback_transaction()?;
        warn!("Transaction rolled back");
        Ok(())
    }
}

impl<S: TripleStore + ?Sized> Drop for Transaction<'_, S> {
    fn drop(&mut self) {
        if self.active {
            warn!("Transaction dropped without commit, rolling back");
            if let Err(e) = self.store.rollback_transaction() {
                error!("Rollback failed: {}", e);
            }
        }
    }
}

/// Run `work` inside a transaction.
///
/// Commits when `work` succeeds. On error the transaction is rolled back and
/// the original error is returned; a failing rollback is only logged.
pub fn run_in_transaction<S, T, E, F>(store: &S, work: F) -> Result<T, E>
where
    S: TripleStore + ?Sized,
    E: From<super::StoreError>,
    F: FnOnce(&S) -> Result<T, E>,
{
    let transaction = Transaction::begin(store)?;
    match work(store) {
        Ok(value) => {
            transaction.commit()?;
            Ok(value)
        }
        Err(e) => {
            if let Err(rollback) = transaction.rollback() {
                error!("Rollback after failed unit of work failed: {}", rollback);
            }
            Err(e)
        }
    }
}
