//! Triple store backends
//!
//! The engine talks to a store only through [`TripleStore`]. Two backends are
//! provided:
//!
//! - [`MemoryStore`]: in-memory oxigraph store with snapshot transactions
//! - [`HttpStore`]: SPARQL 1.1 protocol client for a remote endpoint
//!
//! A transaction belongs to the thread that opened it. Other threads never
//! see it as open.

mod http;
mod memory;
mod transaction;

use crate::sparql::QuerySolution;
use spargebra::{Query, Update};
use thiserror::Error;

pub use http::{HttpStore, HttpStoreConfig};
pub use memory::MemoryStore;
pub use transaction::{run_in_transaction, Transaction};

/// Store errors
#[derive(Error, Debug)]
pub enum StoreError {
    /// The store failed to run an operation
    #[error("{operation} failed: {message}")]
    Query { operation: String, message: String },

    /// Query text rejected before it was sent
    #[error("Invalid {operation} query: {message}")]
    InvalidQuery { operation: String, message: String },

    /// The calling thread already has an open transaction
    #[error("A transaction is already open")]
    TransactionAlreadyStarted,

    /// Commit or rollback without a transaction open on the calling thread
    #[error("No open transaction")]
    NoTransaction,
}

impl StoreError {
    pub(crate) fn query(operation: &str, message: impl ToString) -> Self {
        StoreError::Query {
            operation: operation.to_string(),
            message: message.to_string(),
        }
    }
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Lazily produced solution rows
pub type SolutionStream<'a> = Box<dyn Iterator<Item = StoreResult<QuerySolution>> + 'a>;

/// Operations the engine needs from a triple store
pub trait TripleStore: Send + Sync {
    /// Run a select, rows are produced lazily where the backend allows it
    fn select(&self, query: &Query) -> StoreResult<SolutionStream<'_>>;

    fn ask(&self, query: &Query) -> StoreResult<bool>;

    fn update(&self, update: &Update) -> StoreResult<()>;

    /// Open a transaction for the calling thread. Transactions are not
    /// reentrant.
    fn start_transaction(&self) -> StoreResult<()>;

    fn commit_transaction(&self) -> StoreResult<()>;

    fn rollback_transaction(&self) -> StoreResult<()>;

    /// Whether the calling thread has an open transaction
    fn in_transaction(&self) -> bool;
}

impl<T: TripleStore + ?Sized> TripleStore for &T {
    fn select(&self, query: &Query) -> StoreResult<SolutionStream<'_>> {
        (**self).select(query)
    }

    fn ask(&self, query: &Query) -> StoreResult<bool> {
        (**self).ask(query)
    }

    fn update(&self, update: &Update) -> StoreResult<()> {
        (**self).update(update)
    }

    fn start_transaction(&self) -> StoreResult<()> {
        (**self).start_transaction()
    }

    fn commit_transaction(&self) -> StoreResult<()> {
        (**self).commit_transaction()
    }

    fn rollback_transaction(&self) -> StoreResult<()> {
        (**self).rollback_transaction()
    }

    fn in_transaction(&self) -> bool {
        (**self).in_transaction()
    }
}
