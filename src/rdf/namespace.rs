//! RDF namespace and prefix management
//!
//! Prefixes expand the compact URIs handed in by callers (`vocabulary:Device`).

use super::types::{NamedNode, RdfError, RdfResult};
use indexmap::IndexMap;
use oxiri::Iri;

/// Well-known vocabulary IRIs used by the query synthesizer
pub mod vocab {
    pub const RDF: &str = "http://www.w3.org/1999/02/22-rdf-syntax-ns#";
    pub const RDFS: &str = "http://www.w3.org/2000/01/rdf-schema#";
    pub const XSD: &str = "http://www.w3.org/2001/XMLSchema#";
    pub const OWL: &str = "http://www.w3.org/2002/07/owl#";

    pub const RDF_TYPE: &str = "http://www.w3.org/1999/02/22-rdf-syntax-ns#type";
    pub const RDFS_LABEL: &str = "http://www.w3.org/2000/01/rdf-schema#label";
    pub const RDFS_SUB_CLASS_OF: &str = "http://www.w3.org/2000/01/rdf-schema#subClassOf";
}

/// Namespace (prefix → IRI mapping)
#[derive(Debug, Clone, PartialEq)]
pub struct Namespace {
    /// Prefix
    pub prefix: String,
    /// IRI
    pub iri: String,
}

impl Namespace {
    /// Create a new namespace
    pub fn new(prefix: impl Into<String>, iri: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            iri: iri.into(),
        }
    }
}

/// Namespace manager with common prefixes
#[derive(Debug, Clone)]
pub struct NamespaceManager {
    /// Prefix → IRI mappings, in declaration order
    prefixes: IndexMap<String, String>,
}

impl NamespaceManager {
    /// Create a new namespace manager with common prefixes
    pub fn new() -> Self {
        let mut mgr = Self {
            prefixes: IndexMap::new(),
        };

        mgr.add_prefix("rdf", vocab::RDF);
        mgr.add_prefix("rdfs", vocab::RDFS);
        mgr.add_prefix("xsd", vocab::XSD);
        mgr.add_prefix("owl", vocab::OWL);

        mgr
    }

    /// Add a prefix
    pub fn add_prefix(&mut self, prefix: impl Into<String>, iri: impl Into<String>) {
        self.prefixes.insert(prefix.into(), iri.into());
    }

    /// Get IRI for a prefix
    pub fn get_iri(&self, prefix: &str) -> RdfResult<&str> {
        self.prefixes
            .get(prefix)
            .map(|s| s.as_str())
            .ok_or_else(|| RdfError::UnknownPrefix(prefix.to_string()))
    }

    /// Expand a compact IRI (prefix:local) to full IRI
    pub fn expand(&self, compact_iri: &str) -> RdfResult<String> {
        match compact_iri.split_once(':') {
            Some((prefix, local)) => {
                let iri = self.get_iri(prefix)?;
                Ok(format!("{}{}", iri, local))
            }
            None => Err(RdfError::InvalidIri(compact_iri.to_string())),
        }
    }

    /// Normalize a caller-supplied URI: trim it, expand a known prefix, and
    /// check that the result is an absolute IRI.
    pub fn normalize_uri(&self, uri: &str) -> RdfResult<String> {
        let uri = uri.trim();
        if let Some((prefix, _)) = uri.split_once(':') {
            if self.prefixes.contains_key(prefix) {
                return self.expand(uri);
            }
        }
        Iri::parse(uri)
            .map(|iri| iri.into_inner().to_string())
            .map_err(|e| RdfError::InvalidIri(format!("{}: {}", uri, e)))
    }

    /// Normalize then wrap as a named node
    pub fn named_node(&self, uri: &str) -> RdfResult<NamedNode> {
        NamedNode::new(&self.normalize_uri(uri)?)
    }

    /// Get all registered prefixes
    pub fn prefixes(&self) -> Vec<Namespace> {
        self.prefixes
            .iter()
            .map(|(prefix, iri)| Namespace::new(prefix.clone(), iri.clone()))
            .collect()
    }
}

impl Default for NamespaceManager {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_common_prefixes() {
        let mgr = NamespaceManager::new();

        assert_eq!(mgr.get_iri("rdf").unwrap(), vocab::RDF);
        assert_eq!(mgr.get_iri("rdfs").unwrap(), vocab::RDFS);
        assert_eq!(mgr.get_iri("xsd").unwrap(), vocab::XSD);
        assert!(matches!(mgr.get_iri("foaf"), Err(RdfError::UnknownPrefix(_))));
    }

    #[test]
    fn test_expand() {
        let mgr = NamespaceManager::new();

        let expanded = mgr.expand("rdf:type").unwrap();
        assert_eq!(expanded, vocab::RDF_TYPE);
        assert!(mgr.expand("nocolon").is_err());
    }

    #[test]
    fn test_normalize_uri() {
        let mut mgr = NamespaceManager::new();
        mgr.add_prefix("dev", "http://example.org/devices/");

        assert_eq!(
            mgr.normalize_uri("  http://example.org/a  ").unwrap(),
            "http://example.org/a"
        );
        assert_eq!(
            mgr.normalize_uri("dev:d1").unwrap(),
            "http://example.org/devices/d1"
        );
        assert_eq!(mgr.normalize_uri("urn:a1").unwrap(), "urn:a1");
        assert!(mgr.normalize_uri("not a uri").is_err());
    }
}
