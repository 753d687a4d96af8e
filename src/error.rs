//! Error taxonomy for descriptor analysis, query synthesis and the CRUD layer

use crate::rdf::RdfError;
use crate::store::StoreError;
use thiserror::Error;

/// Mapping errors
#[derive(Error, Debug)]
pub enum MappingError {
    /// A model type declares an unusable descriptor. Fatal for that type.
    #[error("Invalid descriptor for {type_name}: {reason}")]
    InvalidDescriptor { type_name: String, reason: String },

    /// Some requested URIs do not exist; carries exactly the missing ones
    #[error("Unknown URIs: {}", .0.join(", "))]
    InvalidUriList(Vec<String>),

    /// A lookup by a unique field matched several instances
    #[error("{count} instances have {field} = {value}")]
    NotUnique {
        field: String,
        value: String,
        count: usize,
    },

    /// Create targeted an identifier that already exists
    #[error("URI already exists: {0}")]
    DuplicateUri(String),

    /// No descriptor is registered for an rdf:type
    #[error("No descriptor registered for type {0}")]
    MapperNotFound(String),

    /// Caller misuse (empty field set, duplicate identifiers in a page, ...)
    #[error("Illegal argument: {0}")]
    IllegalArgument(String),

    /// Inconsistent engine or query configuration
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// A stored value cannot be read back as the declared datatype
    #[error("Cannot read {value} as {datatype} for field {field}")]
    Deserialization {
        field: String,
        value: String,
        datatype: String,
    },

    /// An update tried to change the rdf:type of an existing resource
    #[error("rdf:type of {uri} cannot change from {stored} to {requested}")]
    ImmutableType {
        uri: String,
        stored: String,
        requested: String,
    },

    /// Adding a node would make it its own ancestor
    #[error("Cycle detected in tree at {0}")]
    CyclicTree(String),

    /// Reference validation found problems
    #[error("Validation failed with {} violation(s)", .0.len())]
    Validation(Vec<crate::service::ReferenceViolation>),

    /// RDF term error
    #[error(transparent)]
    Rdf(#[from] RdfError),

    /// Query execution or transaction error
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl MappingError {
    pub(crate) fn invalid_descriptor(type_name: &str, reason: impl Into<String>) -> Self {
        MappingError::InvalidDescriptor {
            type_name: type_name.to_string(),
            reason: reason.into(),
        }
    }
}

pub type MappingResult<T> = Result<T, MappingError>;
