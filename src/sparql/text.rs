//! Checks on SPARQL text received from outside the synthesizer

use crate::store::{StoreError, StoreResult};

/// Check query text with the spargebra parser
pub fn validate_query(operation: &str, text: &str) -> StoreResult<()> {
    spargebra::Query::parse(text, None)
        .map(|_| ())
        .map_err(|e| StoreError::InvalidQuery {
            operation: operation.to_string(),
            message: e.to_string(),
        })
}

/// Check update text with the spargebra parser
pub fn validate_update(operation: &str, text: &str) -> StoreResult<()> {
    spargebra::Update::parse(text, None)
        .map(|_| ())
        .map_err(|e| StoreError::InvalidQuery {
            operation: operation.to_string(),
            message: e.to_string(),
        })
}
