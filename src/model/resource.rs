//! Base resource state embedded in every mapped model

use super::value::Value;
use crate::error::{MappingError, MappingResult};

/// Ad-hoc relation written alongside the declared properties
#[derive(Debug, Clone, PartialEq)]
pub struct Relation {
    /// Predicate IRI
    pub predicate: String,
    /// Object value (or subject value when `inverse`)
    pub value: Value,
    /// `value <predicate> resource` instead of `resource <predicate> value`
    pub inverse: bool,
    /// Graph override, defaults to the model graph
    pub graph: Option<String>,
}

impl Relation {
    pub fn new(predicate: impl Into<String>, value: Value) -> Self {
        Self {
            predicate: predicate.into(),
            value,
            inverse: false,
            graph: None,
        }
    }

    pub fn inverse(mut self) -> Self {
        self.inverse = true;
        self
    }

    pub fn in_graph(mut self, graph: impl Into<String>) -> Self {
        self.graph = Some(graph.into());
        self
    }
}

/// Identifier, type and type label shared by all models
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResourceModel {
    uri: Option<String>,
    rdf_type: Option<String>,
    rdf_type_name: Option<String>,
    relations: Vec<Relation>,
}

impl ResourceModel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Resource with a known identifier
    pub fn with_uri(uri: impl Into<String>) -> Self {
        Self {
            uri: Some(uri.into()),
            ..Self::default()
        }
    }

    pub fn uri(&self) -> Option<&str> {
        self.uri.as_deref()
    }

    pub fn set_uri(&mut self, uri: impl Into<String>) {
        self.uri = Some(uri.into());
    }

    pub fn rdf_type(&self) -> Option<&str> {
        self.rdf_type.as_deref()
    }

    /// Set the rdf:type. Once set, the type can only be re-set to the same value.
    pub fn set_rdf_type(&mut self, rdf_type: impl Into<String>) -> MappingResult<()> {
        let rdf_type = rdf_type.into();
        match &self.rdf_type {
            Some(current) if *current != rdf_type => Err(MappingError::ImmutableType {
                uri: self.uri.clone().unwrap_or_default(),
                stored: current.clone(),
                requested: rdf_type,
            }),
            _ => {
                self.rdf_type = Some(rdf_type);
                Ok(())
            }
        }
    }

    pub fn rdf_type_name(&self) -> Option<&str> {
        self.rdf_type_name.as_deref()
    }

    pub fn set_rdf_type_name(&mut self, name: Option<String>) {
        self.rdf_type_name = name;
    }

    pub fn relations(&self) -> &[Relation] {
        &self.relations
    }

    pub fn add_relation(&mut self, relation: Relation) {
        self.relations.push(relation);
    }

    /// Replace the relations, typically with the ones read from the store
    pub fn set_relations(&mut self, relations: Vec<Relation>) {
        self.relations = relations;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rdf_type_is_set_once() {
        let mut resource = ResourceModel::with_uri("http://example.org/d1");
        resource.set_rdf_type("http://example.org/Device").unwrap();
        // same value is accepted again
        resource.set_rdf_type("http://example.org/Device").unwrap();

        let err = resource.set_rdf_type("http://example.org/Sensor").unwrap_err();
        assert!(matches!(err, MappingError::ImmutableType { .. }));
        assert_eq!(resource.rdf_type(), Some("http://example.org/Device"));
    }

    #[test]
    fn test_relations() {
        let mut resource = ResourceModel::new();
        resource.add_relation(
            Relation::new("http://example.org/hosts", Value::Uri("http://example.org/x".into()))
                .inverse(),
        );
        assert_eq!(resource.relations().len(), 1);
        assert!(resource.relations()[0].inverse);
    }
}
