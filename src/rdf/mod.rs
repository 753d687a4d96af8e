//! RDF primitives
//!
//! Terms and quads wrapping oxrdf, and namespace handling for compact URIs.
//!
//! # Example
//!
//! ```rust
//! use triplemap::rdf::{Literal, NamedNode, NamespaceManager, Quad};
//!
//! let mut namespaces = NamespaceManager::new();
//! namespaces.add_prefix("ex", "http://example.org/");
//!
//! let alice = namespaces.named_node("ex:alice").unwrap();
//! let name = NamedNode::new("http://xmlns.com/foaf/0.1/name").unwrap();
//! let quad = Quad::new(alice, name, Literal::new_simple_literal("Alice"), None);
//! assert_eq!(quad.subject.lexical(), "http://example.org/alice");
//! ```

mod namespace;
mod types;

pub use types::{BlankNode, Literal, NamedNode, Quad, RdfError, RdfResult, Term};

pub use namespace::{vocab, Namespace, NamespaceManager};
