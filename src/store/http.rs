//! SPARQL 1.1 protocol client
//!
//! Queries and updates are rendered to text and POSTed to the configured
//! endpoints. Results are read as `application/sparql-results+json`.
//! Updates issued inside a transaction are buffered per calling thread and
//! sent as one request on commit; rollback discards the buffer.
//!
//! Reads always go to the endpoint, so a transaction does not see its own
//! buffered writes. An existence check made after a buffered delete still
//! finds the resource.

use super::{SolutionStream, StoreError, StoreResult, TripleStore};
use crate::sparql::{validate_query, validate_update, QuerySolution};
use reqwest::blocking::Client;
use reqwest::header::{ACCEPT, CONTENT_TYPE};
use serde::{Deserialize, Serialize};
use sparesults::{QueryResultsFormat, QueryResultsParser, ReaderQueryResultsParserOutput};
use spargebra::{Query, Update};
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::thread::{self, ThreadId};
use std::time::Duration;
use tracing::{debug, info};

const SPARQL_QUERY: &str = "application/sparql-query";
const SPARQL_UPDATE: &str = "application/sparql-update";
const SPARQL_RESULTS_JSON: &str = "application/sparql-results+json";

/// Remote endpoint configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpStoreConfig {
    /// Query endpoint URL
    pub query_endpoint: String,
    /// Update endpoint URL, defaults to the query endpoint
    pub update_endpoint: Option<String>,
    /// Parse the rendered text locally before sending it
    pub validate_queries: bool,
    /// Request timeout in seconds
    pub timeout_secs: u64,
}

impl Default for HttpStoreConfig {
    fn default() -> Self {
        Self {
            query_endpoint: "http://localhost:7200/repositories/default".to_string(),
            update_endpoint: None,
            validate_queries: false,
            timeout_secs: 30,
        }
    }
}

impl HttpStoreConfig {
    pub fn new(query_endpoint: impl Into<String>) -> Self {
        Self {
            query_endpoint: query_endpoint.into(),
            ..Self::default()
        }
    }

    pub fn update_endpoint(&self) -> &str {
        self.update_endpoint.as_deref().unwrap_or(&self.query_endpoint)
    }
}

/// Triple store reached over HTTP
pub struct HttpStore {
    client: Client,
    config: HttpStoreConfig,
    /// Buffered updates of each thread with an open transaction
    pending: Mutex<HashMap<ThreadId, Vec<String>>>,
}

impl HttpStore {
    pub fn new(config: HttpStoreConfig) -> StoreResult<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| StoreError::query("connect", e))?;
        info!("SPARQL endpoint: {}", config.query_endpoint);
        Ok(Self {
            client,
            config,
            pending: Mutex::new(HashMap::new()),
        })
    }

    pub fn config(&self) -> &HttpStoreConfig {
        &self.config
    }

    fn post(&self, operation: &str, url: &str, content_type: &str, body: String) -> StoreResult<reqwest::blocking::Response> {
        let response = self
            .client
            .post(url)
            .header(CONTENT_TYPE, content_type)
            .header(ACCEPT, SPARQL_RESULTS_JSON)
            .body(body)
            .send()
            .map_err(|e| StoreError::query(operation, e))?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().unwrap_or_default();
            return Err(StoreError::query(operation, format!("{}: {}", status, text)));
        }
        Ok(response)
    }

    fn run_query(&self, operation: &str, text: String) -> StoreResult<ReaderQueryResultsParserOutput<reqwest::blocking::Response>> {
        if self.config.validate_queries {
            validate_query(operation, &text)?;
        }
        debug!("{} query:\n{}", operation, text);
        let response = self.post(operation, &self.config.query_endpoint, SPARQL_QUERY, text)?;
        QueryResultsParser::from_format(QueryResultsFormat::Json)
            .for_reader(response)
            .map_err(|e| StoreError::query(operation, e))
    }

    fn send_update(&self, text: String) -> StoreResult<()> {
        if self.config.validate_queries {
            validate_update("update", &text)?;
        }
        debug!("update:\n{}", text);
        self.post("update", self.config.update_endpoint(), SPARQL_UPDATE, text)?;
        Ok(())
    }

    fn pending(&self) -> MutexGuard<'_, HashMap<ThreadId, Vec<String>>> {
        self.pending.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Buffer of the calling thread, removed from the store
    fn take_pending(&self) -> StoreResult<Vec<String>> {
        self.pending()
            .remove(&thread::current().id())
            .ok_or(StoreError::NoTransaction)
    }
}

fn convert(solution: sparesults::QuerySolution) -> StoreResult<QuerySolution> {
    QuerySolution::try_from(solution).map_err(|e| StoreError::query("select", e))
}

impl TripleStore for HttpStore {
    fn select(&self, query: &Query) -> StoreResult<SolutionStream<'_>> {
        match self.run_query("select", query.to_string())? {
            ReaderQueryResultsParserOutput::Solutions(solutions) => Ok(Box::new(solutions.map(
                |solution| {
                    solution
                        .map_err(|e| StoreError::query("select", e))
                        .and_then(convert)
                },
            ))),
            ReaderQueryResultsParserOutput::Boolean(_) => Err(StoreError::query(
                "select",
                "endpoint returned a boolean result",
            )),
        }
    }

    fn ask(&self, query: &Query) -> StoreResult<bool> {
        match self.run_query("ask", query.to_string())? {
            ReaderQueryResultsParserOutput::Boolean(value) => Ok(value),
            ReaderQueryResultsParserOutput::Solutions(_) => Err(StoreError::query(
                "ask",
                "endpoint returned solutions",
            )),
        }
    }

    fn update(&self, update: &Update) -> StoreResult<()> {
        if update.operations.is_empty() {
            return Ok(());
        }
        let text = update.to_string();
        if let Some(buffer) = self.pending().get_mut(&thread::current().id()) {
            buffer.push(text);
            return Ok(());
        }
        self.send_update(text)
    }

    fn start_transaction(&self) -> StoreResult<()> {
        let mut pending = self.pending();
        let current = thread::current().id();
        if pending.contains_key(&current) {
            return Err(StoreError::TransactionAlreadyStarted);
        }
        pending.insert(current, Vec::new());
        Ok(())
    }

    fn commit_transaction(&self) -> StoreResult<()> {
        let buffered = self.take_pending()?;
        if buffered.is_empty() {
            return Ok(());
        }
        debug!("Committing {} buffered updates", buffered.len());
        self.send_update(buffered.join(" ;\n"))
    }

    fn rollback_transaction(&self) -> StoreResult<()> {
        let buffered = self.take_pending()?;
        debug!("Discarding {} buffered updates", buffered.len());
        Ok(())
    }

    fn in_transaction(&self) -> bool {
        self.pending().contains_key(&thread::current().id())
    }
}
