//! Resource descriptor registry
//!
//! Model types describe themselves once through [`SparqlModel::describe`];
//! the registry turns that declaration into a cached [`ResourceDescriptor`]
//! and a [`ModelMapper`] that converts instances to quads and solution rows
//! back to instances.
//!
//! ```rust
//! use triplemap::mapping::{describe, DescriptorBuilder, SparqlModel};
//! use triplemap::model::{Datatype, ResourceModel, Value};
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
//! let first = describe::<Device>().unwrap();
//! let second = describe::<Device>().unwrap();
//! assert!(std::sync::Arc::ptr_eq(&first, &second));
//! ```

mod builder;
mod descriptor;
mod list_fetcher;
mod mapper;
mod registry;

use crate::model::ResourceModel;

pub use builder::{DescriptorBuilder, PropertyDef};
pub use descriptor::{
    Cardinality, Direction, NestedType, PropertyDescriptor, PropertyRole, ResourceDescriptor,
};
pub use list_fetcher::ListFetcher;
pub use mapper::ModelMapper;
pub use registry::{describe, mapper, DescriptorRegistry};

pub(crate) use mapper::decode;

/// A model type mapped to triples
pub trait SparqlModel: Default + Send + Sync + Sized + 'static {
    /// rdf:type IRI of the model
    const RDF_TYPE: &'static str;
    /// Default graph of the model
    const GRAPH: &'static str;

    /// Declare identifier, type and property fields
    fn describe(builder: &mut DescriptorBuilder<Self>);

    fn resource(&self) -> &ResourceModel;
    fn resource_mut(&mut self) -> &mut ResourceModel;
}
