//! Immutable descriptor tables
//!
//! A [`ResourceDescriptor`] is computed once per model type by the registry
//! and shared behind an `Arc` for the rest of the process.

use crate::model::Datatype;
use crate::rdf::NamedNode;
use indexmap::IndexMap;

/// Number of values a property holds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cardinality {
    Scalar,
    List,
}

/// Which side of the triple the model sits on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// `?uri <predicate> ?value`
    Forward,
    /// `?value <predicate> ?uri`
    Inverse,
}

/// Role of a declared property
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PropertyRole {
    Plain,
    Label,
    ObjectReference,
    InverseReference,
}

/// Target of an object reference
#[derive(Debug, Clone, PartialEq)]
pub struct NestedType {
    /// Rust type name of the referenced model
    pub type_name: String,
    pub rdf_type: NamedNode,
    /// Default graph of the referenced model
    pub graph: NamedNode,
}

/// Mapping of one model field to a predicate
#[derive(Debug, Clone, PartialEq)]
pub struct PropertyDescriptor {
    /// Field name, also used as the SPARQL variable name
    pub field: String,
    pub predicate: NamedNode,
    pub datatype: Datatype,
    pub nested: Option<NestedType>,
    pub cardinality: Cardinality,
    pub direction: Direction,
    pub required: bool,
    /// Graph the triples of this property live in
    pub graph: NamedNode,
    /// Whether `graph` was declared explicitly on the property
    pub graph_overridden: bool,
    pub role: PropertyRole,
}

impl PropertyDescriptor {
    pub fn is_list(&self) -> bool {
        self.cardinality == Cardinality::List
    }

    pub fn is_inverse(&self) -> bool {
        self.direction == Direction::Inverse
    }
}

/// Descriptor of a model type
#[derive(Debug, Clone, PartialEq)]
pub struct ResourceDescriptor {
    pub(crate) type_name: String,
    pub(crate) rdf_type: NamedNode,
    pub(crate) graph: NamedNode,
    pub(crate) identifier: String,
    pub(crate) type_field: String,
    pub(crate) type_label: Option<String>,
    pub(crate) properties: IndexMap<String, PropertyDescriptor>,
}

impl ResourceDescriptor {
    /// Rust type name of the model
    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    pub fn rdf_type(&self) -> &NamedNode {
        &self.rdf_type
    }

    /// Default graph of the model
    pub fn graph(&self) -> &NamedNode {
        &self.graph
    }

    /// Identifier field name (`?uri` by default)
    pub fn identifier(&self) -> &str {
        &self.identifier
    }

    pub fn type_field(&self) -> &str {
        &self.type_field
    }

    pub fn type_label(&self) -> Option<&str> {
        self.type_label.as_deref()
    }

    pub fn property(&self, field: &str) -> Option<&PropertyDescriptor> {
        self.properties.get(field)
    }

    /// Declared properties in declaration order
    pub fn properties(&self) -> impl Iterator<Item = &PropertyDescriptor> {
        self.properties.values()
    }

    pub fn scalar_properties(&self) -> impl Iterator<Item = &PropertyDescriptor> {
        self.properties().filter(|p| !p.is_list())
    }

    pub fn list_properties(&self) -> impl Iterator<Item = &PropertyDescriptor> {
        self.properties().filter(|p| p.is_list())
    }

    /// Whether a declared property writes `predicate` in `graph` with the
    /// instance on the given side
    pub fn declares(&self, graph: &NamedNode, predicate: &NamedNode, direction: Direction) -> bool {
        self.properties()
            .any(|p| p.direction == direction && &p.graph == graph && &p.predicate == predicate)
    }

    /// Model graph followed by every distinct property graph
    pub fn graphs(&self) -> Vec<&NamedNode> {
        let mut graphs = vec![&self.graph];
        for property in self.properties() {
            if !graphs.contains(&&property.graph) {
                graphs.push(&property.graph);
            }
        }
        graphs
    }
}
