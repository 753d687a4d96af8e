//! Declarative descriptor builder
//!
//! Each model type fills a [`DescriptorBuilder`] from
//! [`SparqlModel::describe`](super::SparqlModel::describe). The builder
//! records field names, predicates and accessor closures; `build` checks the
//! declaration and produces the immutable descriptor plus the accessor table
//! used by the [`ModelMapper`](super::ModelMapper).

use super::descriptor::{
    Cardinality, Direction, NestedType, PropertyDescriptor, PropertyRole, ResourceDescriptor,
};
use super::registry::validate_nested;
use super::SparqlModel;
use crate::error::{MappingError, MappingResult};
use crate::model::{Datatype, Value};
use crate::rdf::NamedNode;
use crate::sparql::RESERVED_PREFIX;
use indexmap::IndexMap;
use std::collections::HashSet;

pub(crate) type ScalarGetter<T> = Box<dyn Fn(&T) -> Option<Value> + Send + Sync>;
pub(crate) type ScalarSetter<T> = Box<dyn Fn(&mut T, Option<Value>) + Send + Sync>;
pub(crate) type ListGetter<T> = Box<dyn Fn(&T) -> Vec<Value> + Send + Sync>;
pub(crate) type ListSetter<T> = Box<dyn Fn(&mut T, Vec<Value>) + Send + Sync>;

/// Accessor/mutator pair of one property
pub(crate) enum FieldAccess<T> {
    Scalar {
        get: ScalarGetter<T>,
        set: ScalarSetter<T>,
    },
    List {
        get: ListGetter<T>,
        set: ListSetter<T>,
    },
}

/// Referenced model type, resolved lazily at build time
struct NestedTarget {
    type_name: &'static str,
    rdf_type: &'static str,
    graph: &'static str,
    validate: fn() -> MappingResult<()>,
}

/// Declaration of one property
pub struct PropertyDef<T> {
    name: String,
    predicate: String,
    datatype: Datatype,
    nested: Option<NestedTarget>,
    graph: Option<String>,
    inverse: bool,
    required: bool,
    label: bool,
    getter: Option<ScalarGetter<T>>,
    setter: Option<ScalarSetter<T>>,
    list_getter: Option<ListGetter<T>>,
    list_setter: Option<ListSetter<T>>,
}

impl<T: SparqlModel> PropertyDef<T> {
    fn new(name: String, predicate: String) -> Self {
        Self {
            name,
            predicate,
            datatype: Datatype::String,
            nested: None,
            graph: None,
            inverse: false,
            required: false,
            label: false,
            getter: None,
            setter: None,
            list_getter: None,
            list_setter: None,
        }
    }

    /// Literal datatype (defaults to `String`)
    pub fn datatype(&mut self, datatype: Datatype) -> &mut Self {
        self.datatype = datatype;
        self
    }

    /// Language-tagged label
    pub fn label(&mut self) -> &mut Self {
        self.datatype = Datatype::LangString;
        self.label = true;
        self
    }

    /// Reference to another mapped model type
    pub fn object<U: SparqlModel>(&mut self) -> &mut Self {
        self.datatype = Datatype::Uri;
        self.nested = Some(NestedTarget {
            type_name: std::any::type_name::<U>(),
            rdf_type: U::RDF_TYPE,
            graph: U::GRAPH,
            validate: validate_nested::<U>,
        });
        self
    }

    /// Store this property in another graph than the model graph
    pub fn graph(&mut self, graph: impl Into<String>) -> &mut Self {
        self.graph = Some(graph.into());
        self
    }

    /// The model is the object of the triple
    pub fn inverse(&mut self) -> &mut Self {
        self.inverse = true;
        self
    }

    pub fn required(&mut self) -> &mut Self {
        self.required = true;
        self
    }

    pub fn getter<F>(&mut self, f: F) -> &mut Self
    where
        F: Fn(&T) -> Option<Value> + Send + Sync + 'static,
    {
        self.getter = Some(Box::new(f));
        self
    }

    pub fn setter<F>(&mut self, f: F) -> &mut Self
    where
        F: Fn(&mut T, Option<Value>) + Send + Sync + 'static,
    {
        self.setter = Some(Box::new(f));
        self
    }

    pub fn list_getter<F>(&mut self, f: F) -> &mut Self
    where
        F: Fn(&T) -> Vec<Value> + Send + Sync + 'static,
    {
        self.list_getter = Some(Box::new(f));
        self
    }

    pub fn list_setter<F>(&mut self, f: F) -> &mut Self
    where
        F: Fn(&mut T, Vec<Value>) + Send + Sync + 'static,
    {
        self.list_setter = Some(Box::new(f));
        self
    }

    fn build(
        self,
        type_name: &str,
        model_graph: &NamedNode,
    ) -> MappingResult<(PropertyDescriptor, FieldAccess<T>)> {
        let name = self.name;
        let invalid = |reason: String| MappingError::invalid_descriptor(type_name, reason);

        let predicate = NamedNode::new(&self.predicate)
            .map_err(|e| invalid(format!("property {}: {}", name, e)))?;

        let (cardinality, access) = match (
            self.getter,
            self.setter,
            self.list_getter,
            self.list_setter,
        ) {
            (Some(get), Some(set), None, None) => {
                (Cardinality::Scalar, FieldAccess::Scalar { get, set })
            }
            (None, None, Some(get), Some(set)) => (Cardinality::List, FieldAccess::List { get, set }),
            (None, None, None, None) => {
                return Err(invalid(format!("property {} has no accessor", name)))
            }
            (g, s, lg, ls) if (g.is_some() || s.is_some()) && (lg.is_some() || ls.is_some()) => {
                return Err(invalid(format!(
                    "property {} mixes scalar and list accessors",
                    name
                )))
            }
            (g, _, lg, _) if g.is_some() || lg.is_some() => {
                return Err(invalid(format!("property {} has an accessor but no mutator", name)))
            }
            _ => return Err(invalid(format!("property {} has a mutator but no accessor", name))),
        };

        if self.inverse && self.datatype.is_literal() {
            return Err(invalid(format!(
                "inverse property {} must reference resources, not literals",
                name
            )));
        }

        let nested = match self.nested {
            Some(target) => {
                (target.validate)().map_err(|e| {
                    invalid(format!(
                        "property {} references invalid type {}: {}",
                        name, target.type_name, e
                    ))
                })?;
                Some(NestedType {
                    type_name: target.type_name.to_string(),
                    rdf_type: NamedNode::new(target.rdf_type)?,
                    graph: NamedNode::new(target.graph)?,
                })
            }
            None => None,
        };

        let graph_overridden = self.graph.is_some();
        let graph = match (&self.graph, &nested) {
            (Some(explicit), _) => NamedNode::new(explicit)
                .map_err(|e| invalid(format!("property {}: {}", name, e)))?,
            (None, Some(target)) if self.inverse => target.graph.clone(),
            (None, None) if self.inverse => {
                return Err(invalid(format!(
                    "inverse property {} has no resolvable graph",
                    name
                )))
            }
            _ => model_graph.clone(),
        };

        let direction = if self.inverse {
            Direction::Inverse
        } else {
            Direction::Forward
        };
        let role = match (self.label, self.inverse, self.datatype) {
            (true, _, _) => PropertyRole::Label,
            (_, true, _) => PropertyRole::InverseReference,
            (_, false, Datatype::Uri) => PropertyRole::ObjectReference,
            _ => PropertyRole::Plain,
        };

        let descriptor = PropertyDescriptor {
            field: name,
            predicate,
            datatype: self.datatype,
            nested,
            cardinality,
            direction,
            required: self.required,
            graph,
            graph_overridden,
            role,
        };
        Ok((descriptor, access))
    }
}

/// Collects the declaration of a model type
pub struct DescriptorBuilder<T> {
    identifiers: Vec<String>,
    type_fields: Vec<String>,
    type_labels: Vec<String>,
    properties: Vec<PropertyDef<T>>,
}

impl<T: SparqlModel> DescriptorBuilder<T> {
    pub(crate) fn new() -> Self {
        Self {
            identifiers: Vec::new(),
            type_fields: Vec::new(),
            type_labels: Vec::new(),
            properties: Vec::new(),
        }
    }

    /// Declare the fields held by the embedded `ResourceModel`:
    /// `uri`, `rdf_type` and `rdf_type_name`
    pub fn resource_fields(&mut self) -> &mut Self {
        self.identifier("uri").type_field("rdf_type").type_label("rdf_type_name")
    }

    pub fn identifier(&mut self, name: impl Into<String>) -> &mut Self {
        self.identifiers.push(name.into());
        self
    }

    pub fn type_field(&mut self, name: impl Into<String>) -> &mut Self {
        self.type_fields.push(name.into());
        self
    }

    pub fn type_label(&mut self, name: impl Into<String>) -> &mut Self {
        self.type_labels.push(name.into());
        self
    }

    /// Start declaring a property mapped to `predicate`
    pub fn property(
        &mut self,
        name: impl Into<String>,
        predicate: impl Into<String>,
    ) -> &mut PropertyDef<T> {
        self.properties
            .push(PropertyDef::new(name.into(), predicate.into()));
        let last = self.properties.len() - 1;
        &mut self.properties[last]
    }

    pub(crate) fn build(
        self,
        type_name: &str,
    ) -> MappingResult<(ResourceDescriptor, Vec<FieldAccess<T>>)> {
        let invalid = |reason: &str| MappingError::invalid_descriptor(type_name, reason);

        let identifier = single(&self.identifiers, "identifier")
            .map_err(|reason| invalid(&reason))?;
        let type_field = single(&self.type_fields, "type").map_err(|reason| invalid(&reason))?;
        if self.type_labels.len() > 1 {
            return Err(invalid("more than one type label field"));
        }
        let type_label = self.type_labels.first().cloned();

        let rdf_type = NamedNode::new(T::RDF_TYPE).map_err(|e| invalid(&e.to_string()))?;
        let graph = NamedNode::new(T::GRAPH).map_err(|e| invalid(&e.to_string()))?;

        let mut seen = HashSet::new();
        let names = [&identifier, &type_field]
            .into_iter()
            .chain(type_label.as_ref())
            .chain(self.properties.iter().map(|p| &p.name));
        for name in names {
            if !is_variable_name(name) {
                return Err(invalid(&format!("{} is not a usable field name", name)));
            }
            if name.starts_with(RESERVED_PREFIX) {
                return Err(invalid(&format!(
                    "field {} starts with the reserved prefix {}",
                    name, RESERVED_PREFIX
                )));
            }
            if !seen.insert(name.clone()) {
                return Err(invalid(&format!("field {} is declared twice", name)));
            }
        }

        let mut properties = IndexMap::new();
        let mut accessors = Vec::with_capacity(self.properties.len());
        for def in self.properties {
            let (property, access) = def.build(type_name, &graph)?;
            properties.insert(property.field.clone(), property);
            accessors.push(access);
        }

        let descriptor = ResourceDescriptor {
            type_name: type_name.to_string(),
            rdf_type,
            graph,
            identifier,
            type_field,
            type_label,
            properties,
        };
        Ok((descriptor, accessors))
    }
}

fn single(fields: &[String], kind: &str) -> Result<String, String> {
    match fields {
        [one] => Ok(one.clone()),
        [] => Err(format!("no {} field", kind)),
        _ => Err(format!("more than one {} field", kind)),
    }
}

/// SPARQL VARNAME restricted to ASCII
fn is_variable_name(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {
            chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
        }
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_variable_names() {
        assert!(is_variable_name("uri"));
        assert!(is_variable_name("_brand2"));
        assert!(!is_variable_name("2brand"));
        assert!(!is_variable_name("has-brand"));
        assert!(!is_variable_name(""));
    }

    #[test]
    fn test_single() {
        assert_eq!(single(&["uri".to_string()], "identifier"), Ok("uri".to_string()));
        assert_eq!(
            single(&[], "identifier"),
            Err("no identifier field".to_string())
        );
        assert_eq!(
            single(&["a".to_string(), "b".to_string()], "type"),
            Err("more than one type field".to_string())
        );
    }
}
