//! In-memory triple store
//!
//! Runs the rendered queries on an in-memory oxigraph [`Store`], with the
//! default graph read as the union of all graphs.
//!
//! Select rows are produced lazily from the snapshot the query started on.
//! The transaction lock is only held while evaluation starts, so an open
//! stream never blocks writers.
//!
//! A transaction snapshots the quads on start and belongs to the thread that
//! opened it. Other threads wait until it is committed or rolled back;
//! rollback restores the snapshot.

use super::{SolutionStream, StoreError, StoreResult, TripleStore};
use crate::rdf::Quad;
use crate::sparql::QuerySolution;
use oxigraph::sparql::QueryResults;
use oxigraph::store::Store;
use spargebra::{Query, Update};
use std::sync::{Condvar, Mutex, MutexGuard, PoisonError};
use std::thread::{self, ThreadId};
use tracing::debug;

#[derive(Default)]
struct TransactionState {
    owner: Option<ThreadId>,
    snapshot: Vec<oxrdf::Quad>,
}

/// Thread-safe in-memory store
pub struct MemoryStore {
    store: Store,
    state: Mutex<TransactionState>,
    released: Condvar,
}

impl MemoryStore {
    pub fn new() -> StoreResult<Self> {
        Ok(Self {
            store: Store::new().map_err(|e| StoreError::query("open", e))?,
            state: Mutex::new(TransactionState::default()),
            released: Condvar::new(),
        })
    }

    /// Store preloaded with quads (ontology, fixtures)
    pub fn from_quads(quads: impl IntoIterator<Item = Quad>) -> StoreResult<Self> {
        let store = Self::new()?;
        store.insert_quads(quads)?;
        Ok(store)
    }

    /// Insert quads directly, outside of any update. Returns the number of
    /// quads that were not already stored.
    pub fn insert_quads(&self, quads: impl IntoIterator<Item = Quad>) -> StoreResult<usize> {
        let _state = self.acquire();
        let mut inserted = 0;
        for quad in quads {
            let quad = oxrdf::Quad::try_from(quad).map_err(|e| StoreError::query("insert", e))?;
            if self.store.insert(&quad).map_err(|e| StoreError::query("insert", e))? {
                inserted += 1;
            }
        }
        Ok(inserted)
    }

    /// Number of quads currently stored
    pub fn len(&self) -> StoreResult<usize> {
        let _state = self.acquire();
        self.store.len().map_err(|e| StoreError::query("len", e))
    }

    pub fn is_empty(&self) -> StoreResult<bool> {
        Ok(self.len()? == 0)
    }

    /// Copy of all quads
    pub fn quads(&self) -> StoreResult<Vec<Quad>> {
        let _state = self.acquire();
        self.store
            .iter()
            .map(|quad| {
                let quad = quad.map_err(|e| StoreError::query("scan", e))?;
                Quad::try_from(quad).map_err(|e| StoreError::query("scan", e))
            })
            .collect()
    }

    pub fn contains(&self, quad: &Quad) -> StoreResult<bool> {
        let quad = oxrdf::Quad::try_from(quad.clone()).map_err(|e| StoreError::query("scan", e))?;
        let _state = self.acquire();
        self.store
            .contains(&quad)
            .map_err(|e| StoreError::query("scan", e))
    }

    fn lock(&self) -> MutexGuard<'_, TransactionState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Lock the state once no other thread holds a transaction
    fn acquire(&self) -> MutexGuard<'_, TransactionState> {
        let current = thread::current().id();
        self.released
            .wait_while(self.lock(), |state| {
                state.owner.is_some_and(|owner| owner != current)
            })
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn evaluate(&self, operation: &str, query: &Query) -> StoreResult<QueryResults> {
        let mut query = oxigraph::sparql::Query::parse(&query.to_string(), None).map_err(|e| {
            StoreError::InvalidQuery {
                operation: operation.to_string(),
                message: e.to_string(),
            }
        })?;
        query.dataset_mut().set_default_graph_as_union();
        self.store
            .query(query)
            .map_err(|e| StoreError::query(operation, e))
    }

    /// End the transaction owned by the calling thread, restoring its
    /// snapshot first when `restore` is set
    fn finish(&self, restore: bool) -> StoreResult<()> {
        let mut state = self.lock();
        if state.owner != Some(thread::current().id()) {
            return Err(StoreError::NoTransaction);
        }
        let snapshot = std::mem::take(&mut state.snapshot);
        let restored = if restore {
            self.restore(&snapshot)
        } else {
            Ok(())
        };
        state.owner = None;
        drop(state);
        self.released.notify_all();
        restored
    }

    fn restore(&self, snapshot: &[oxrdf::Quad]) -> StoreResult<()> {
        self.store
            .clear()
            .map_err(|e| StoreError::query("rollback", e))?;
        for quad in snapshot {
            self.store
                .insert(quad)
                .map_err(|e| StoreError::query("rollback", e))?;
        }
        debug!("Rolled back to {} quads", snapshot.len());
        Ok(())
    }
}

fn convert(solution: oxigraph::sparql::QuerySolution) -> StoreResult<QuerySolution> {
    QuerySolution::try_from(solution).map_err(|e| StoreError::query("select", e))
}

impl TripleStore for MemoryStore {
    fn select(&self, query: &Query) -> StoreResult<SolutionStream<'_>> {
        let solutions = {
            let _state = self.acquire();
            match self.evaluate("select", query)? {
                QueryResults::Solutions(solutions) => solutions,
                _ => {
                    return Err(StoreError::query(
                        "select",
                        "query did not produce solutions",
                    ))
                }
            }
        };
        debug!("Memory select started");
        Ok(Box::new(solutions.map(|solution| {
            solution
                .map_err(|e| StoreError::query("select", e))
                .and_then(convert)
        })))
    }

    fn ask(&self, query: &Query) -> StoreResult<bool> {
        let _state = self.acquire();
        match self.evaluate("ask", query)? {
            QueryResults::Boolean(value) => Ok(value),
            _ => Err(StoreError::query("ask", "query did not produce a boolean")),
        }
    }

    fn update(&self, update: &Update) -> StoreResult<()> {
        if update.operations.is_empty() {
            return Ok(());
        }
        let _state = self.acquire();
        let text = update.to_string();
        self.store
            .update(text.as_str())
            .map_err(|e| StoreError::query("update", e))?;
        debug!("Memory update: {} operations", update.operations.len());
        Ok(())
    }

    fn start_transaction(&self) -> StoreResult<()> {
        let current = thread::current().id();
        let mut state = self.acquire();
        if state.owner == Some(current) {
            return Err(StoreError::TransactionAlreadyStarted);
        }
        state.snapshot = self
            .store
            .iter()
            .collect::<Result<_, _>>()
            .map_err(|e| StoreError::query("start transaction", e))?;
        state.owner = Some(current);
        Ok(())
    }

    fn commit_transaction(&self) -> StoreResult<()> {
        self.finish(false)
    }

    fn rollback_transaction(&self) -> StoreResult<()> {
        self.finish(true)
    }

    fn in_transaction(&self) -> bool {
        self.lock().owner == Some(thread::current().id())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rdf::{Literal, NamedNode};
    use std::time::Duration;

    fn quad(s: &str, o: &str) -> Quad {
        Quad::new(
            NamedNode::new(s).unwrap(),
            NamedNode::new("http://ex.org/name").unwrap(),
            Literal::new_simple_literal(o),
            Some(NamedNode::new("http://ex.org/g").unwrap()),
        )
    }

    fn update(text: &str) -> Update {
        Update::parse(text, None).unwrap()
    }

    #[test]
    fn test_update_insert_and_delete() {
        let store = MemoryStore::new().unwrap();
        store
            .update(&update(
                "INSERT DATA { GRAPH <http://ex.org/g> { <http://ex.org/a> <http://ex.org/name> \"A\" } }",
            ))
            .unwrap();
        assert_eq!(store.len().unwrap(), 1);
        assert!(store.contains(&quad("http://ex.org/a", "A")).unwrap());

        store
            .update(&update(
                "DELETE DATA { GRAPH <http://ex.org/g> { <http://ex.org/a> <http://ex.org/name> \"A\" } }",
            ))
            .unwrap();
        assert!(store.is_empty().unwrap());
    }

    #[test]
    fn test_default_graph_is_union_of_graphs() {
        let store = MemoryStore::from_quads(vec![quad("http://ex.org/a", "A")]).unwrap();
        let query =
            Query::parse("ASK { <http://ex.org/a> <http://ex.org/name> \"A\" }", None).unwrap();
        assert!(store.ask(&query).unwrap());

        let select = Query::parse("SELECT ?name WHERE { ?s <http://ex.org/name> ?name }", None)
            .unwrap();
        let rows: Vec<_> = store.select(&select).unwrap().collect::<Result<_, _>>().unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].get("name").map(|t| t.lexical()), Some("A"));
    }

    #[test]
    fn test_open_stream_does_not_block_writes() {
        let store = MemoryStore::from_quads(vec![
            quad("http://ex.org/a", "A"),
            quad("http://ex.org/b", "B"),
        ])
        .unwrap();
        let select = Query::parse("SELECT ?name WHERE { ?s <http://ex.org/name> ?name }", None)
            .unwrap();

        let mut rows = store.select(&select).unwrap();
        assert!(rows.next().unwrap().is_ok());

        store.insert_quads(vec![quad("http://ex.org/c", "C")]).unwrap();
        store.start_transaction().unwrap();
        store.rollback_transaction().unwrap();
        drop(rows);
        assert_eq!(store.len().unwrap(), 3);
    }

    #[test]
    fn test_transaction_rollback_restores_state() {
        let store = MemoryStore::from_quads(vec![quad("http://ex.org/a", "A")]).unwrap();
        store.start_transaction().unwrap();
        assert!(store.in_transaction());
        assert!(matches!(
            store.start_transaction(),
            Err(StoreError::TransactionAlreadyStarted)
        ));

        store.insert_quads(vec![quad("http://ex.org/b", "B")]).unwrap();
        assert_eq!(store.len().unwrap(), 2);
        store.rollback_transaction().unwrap();

        assert_eq!(store.len().unwrap(), 1);
        assert!(!store.in_transaction());
        assert!(matches!(store.commit_transaction(), Err(StoreError::NoTransaction)));
    }

    #[test]
    fn test_commit_keeps_changes() {
        let store = MemoryStore::new().unwrap();
        store.start_transaction().unwrap();
        store.insert_quads(vec![quad("http://ex.org/a", "A")]).unwrap();
        store.commit_transaction().unwrap();
        assert_eq!(store.len().unwrap(), 1);
        assert!(matches!(store.rollback_transaction(), Err(StoreError::NoTransaction)));
    }

    #[test]
    fn test_transaction_belongs_to_opening_thread() {
        let store = MemoryStore::new().unwrap();
        store.start_transaction().unwrap();
        store.insert_quads(vec![quad("http://ex.org/a", "A")]).unwrap();

        thread::scope(|scope| {
            let other = scope.spawn(|| {
                assert!(!store.in_transaction());
                assert!(matches!(
                    store.commit_transaction(),
                    Err(StoreError::NoTransaction)
                ));
                // waits for the commit below
                store.insert_quads(vec![quad("http://ex.org/b", "B")]).unwrap();
                store.len().unwrap()
            });

            thread::sleep(Duration::from_millis(50));
            assert_eq!(store.len().unwrap(), 1);
            store.commit_transaction().unwrap();
            assert_eq!(other.join().unwrap(), 2);
        });
        assert!(!store.in_transaction());
    }
}
