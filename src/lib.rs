//! Triplemap
//!
//! Resource mapping and SPARQL query synthesis for RDF triple stores.
//! Domain model types describe themselves once; the engine turns them into
//! graph-scoped reads and writes against any [`TripleStore`].
//!
//! # Architecture
//!
//! - [`mapping`]: descriptor registry (process-wide cache), model mappers and
//!   the batched list fetcher for multi-valued fields
//! - [`sparql`]: descriptor-driven synthesis of spargebra queries and
//!   updates, multi-graph existence queries
//! - [`tree`]: parent/children index over hierarchical models, plus a
//!   lazily loaded variant
//! - [`store`]: the [`TripleStore`] trait, in-memory and HTTP backends,
//!   transaction scoping
//! - [`service`]: CRUD façade tying the above together
//!
//! Flow: registry → synthesizer → store → rows → list fetcher / tree index →
//! typed models.
//!
//! ## Example Usage
//!
//! ```rust
//! use triplemap::mapping::{DescriptorBuilder, SparqlModel};
//! use triplemap::model::{Datatype, ResourceModel, Value};
//! use triplemap::{MemoryStore, SparqlService};
//!
//! #[derive(Debug, Clone, Default)]
//! struct Device {
//!     resource: ResourceModel,
//!     brand: Option<String>,
//! }
//!
//! impl SparqlModel for Device {
//!     const RDF_TYPE: &'static str = "http://example.org/vocab#Device";
//!     const GRAPH: &'static str = "http://example.org/set/devices";
//!
//!     fn describe(d: &mut DescriptorBuilder<Self>) {
//!         d.resource_fields();
//!         d.property("brand", "http://example.org/vocab#hasBrand")
//!             .datatype(Datatype::String)
//!             .getter(|m| m.brand.clone().map(Value::String))
//!             .setter(|m, v| m.brand = v.and_then(Value::into_string));
//!     }
//!
//!     fn resource(&self) -> &ResourceModel { &self.resource }
//!     fn resource_mut(&mut self) -> &mut ResourceModel { &mut self.resource }
//! }
//!
//! let service = SparqlService::new(MemoryStore::new().unwrap());
//!
//! let mut device = Device { brand: Some("Acme".to_string()), ..Default::default() };
//! service.create(&mut device).unwrap();
//!
//! let uri = device.resource.uri().unwrap().to_string();
//! let loaded: Device = service.get_by_uri(&uri, None).unwrap().unwrap();
//! assert_eq!(loaded.brand.as_deref(), Some("Acme"));
//! ```

#![allow(missing_docs)]
#![warn(clippy::all)]

pub mod config;
pub mod error;
pub mod mapping;
pub mod model;
pub mod rdf;
pub mod service;
pub mod sparql;
pub mod store;
pub mod tree;

// Re-export main types for convenience
pub use config::{EngineConfig, DEFAULT_BATCH_SIZE};
pub use error::{MappingError, MappingResult};

pub use mapping::{
    describe, mapper, DescriptorBuilder, DescriptorRegistry, ListFetcher, ModelMapper,
    PropertyDescriptor, ResourceDescriptor, SparqlModel,
};

pub use model::{ParentRef, Relation, ResourceModel, TreeLink, TreeModel, Datatype, Value};

pub use rdf::{BlankNode, Literal, NamedNode, NamespaceManager, Quad, RdfError, RdfResult, Term};

pub use sparql::{
    Filter, MultiGraphQuery, OrderBy, Query, QuerySolution, QuerySynthesizer, SelectOptions,
    Update,
};

pub use store::{
    run_in_transaction, HttpStore, HttpStoreConfig, MemoryStore, StoreError, StoreResult,
    Transaction, TripleStore,
};

pub use service::{ListWithPagination, ReferenceViolation, SparqlService, ViolationReason};

pub use tree::{PartialTreeIndex, TreeIndex};

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Get version string
pub fn version() -> &'static str {
    VERSION
}
