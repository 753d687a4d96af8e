//! Conversion between model instances and quads / solution rows

use super::builder::FieldAccess;
use super::descriptor::{Direction, PropertyDescriptor, ResourceDescriptor};
use super::SparqlModel;
use crate::error::{MappingError, MappingResult};
use crate::model::{Relation, Value};
use crate::rdf::{vocab, NamedNode, Quad, Term};
use crate::sparql::{QuerySolution, RELATION_VARIABLES};
use std::sync::Arc;
use uuid::Uuid;

/// Descriptor plus the accessor table of a model type
pub struct ModelMapper<T> {
    descriptor: Arc<ResourceDescriptor>,
    accessors: Vec<FieldAccess<T>>,
}

impl<T: SparqlModel> ModelMapper<T> {
    pub(crate) fn new(descriptor: ResourceDescriptor, accessors: Vec<FieldAccess<T>>) -> Self {
        Self {
            descriptor: Arc::new(descriptor),
            accessors,
        }
    }

    pub fn descriptor(&self) -> &Arc<ResourceDescriptor> {
        &self.descriptor
    }

    /// Identifier of a model as a named node
    pub fn uri_of(&self, model: &T) -> MappingResult<NamedNode> {
        let uri = model.resource().uri().ok_or_else(|| {
            MappingError::IllegalArgument(format!(
                "{} instance has no URI",
                self.descriptor.type_name()
            ))
        })?;
        Ok(NamedNode::new(uri)?)
    }

    /// rdf:type of a model, falling back to the descriptor type
    pub fn type_of(&self, model: &T) -> MappingResult<NamedNode> {
        match model.resource().rdf_type() {
            Some(rdf_type) => Ok(NamedNode::new(rdf_type)?),
            None => Ok(self.descriptor.rdf_type().clone()),
        }
    }

    /// New URI under `base` for this model type
    pub fn generate_uri(&self, base: &str) -> String {
        let separator = if base.ends_with('/') || base.ends_with('#') {
            ""
        } else {
            "/"
        };
        format!(
            "{}{}{}/{}",
            base,
            separator,
            self.descriptor.rdf_type().local_name().to_lowercase(),
            Uuid::new_v4().simple()
        )
    }

    /// Graph-scoped quads describing a model instance
    pub fn to_quads(&self, model: &T) -> MappingResult<Vec<Quad>> {
        let uri = self.uri_of(model)?;
        let graph = self.descriptor.graph();
        let rdf_type = NamedNode::new(vocab::RDF_TYPE)?;

        let mut quads = vec![Quad::new(
            uri.clone(),
            rdf_type,
            self.type_of(model)?,
            Some(graph.clone()),
        )];

        for (property, access) in self.descriptor.properties().zip(&self.accessors) {
            let values = match access {
                FieldAccess::Scalar { get, .. } => get(model).into_iter().collect(),
                FieldAccess::List { get, .. } => get(model),
            };
            if values.is_empty() && property.required {
                return Err(MappingError::IllegalArgument(format!(
                    "required field {} of {} has no value",
                    property.field,
                    self.descriptor.type_name()
                )));
            }
            for value in values {
                quads.push(self.property_quad(&uri, property, &value)?);
            }
        }

        for relation in model.resource().relations() {
            quads.push(self.relation_quad(&uri, relation)?);
        }

        Ok(quads)
    }

    /// Quad of an ad-hoc relation, in the model graph unless overridden
    pub fn relation_quad(&self, uri: &NamedNode, relation: &Relation) -> MappingResult<Quad> {
        let predicate = NamedNode::new(&relation.predicate)?;
        let graph = match &relation.graph {
            Some(g) => NamedNode::new(g)?,
            None => self.descriptor.graph().clone(),
        };
        let value = relation.value.to_term()?;
        Ok(if relation.inverse {
            Quad::new(value, predicate, uri.clone(), Some(graph))
        } else {
            Quad::new(uri.clone(), predicate, value, Some(graph))
        })
    }

    /// Relations among rows of [`QuerySynthesizer::build_relations`].
    ///
    /// Statements written by a declared property are skipped: the forward
    /// properties of this type, and the inverse properties of `others`
    /// (which store the instance as subject).
    ///
    /// [`QuerySynthesizer::build_relations`]: crate::sparql::QuerySynthesizer::build_relations
    pub fn relations_from_rows(
        &self,
        rows: &[QuerySolution],
        others: &[Arc<ResourceDescriptor>],
    ) -> MappingResult<Vec<Relation>> {
        let [graph_var, predicate_var, value_var] = RELATION_VARIABLES;
        let model_graph = self.descriptor.graph();
        let mut relations = Vec::new();

        for row in rows {
            let (Some(Term::NamedNode(graph)), Some(Term::NamedNode(predicate)), Some(term)) =
                (row.get(graph_var), row.get(predicate_var), row.get(value_var))
            else {
                continue;
            };
            let managed = (graph == model_graph && predicate.as_str() == vocab::RDF_TYPE)
                || self.descriptor.declares(graph, predicate, Direction::Forward)
                || others
                    .iter()
                    .any(|d| d.declares(graph, predicate, Direction::Inverse));
            if managed {
                continue;
            }
            let Some(value) = Value::infer(term) else {
                continue;
            };
            let mut relation = Relation::new(predicate.as_str(), value);
            if graph != model_graph {
                relation = relation.in_graph(graph.as_str());
            }
            if !relations.contains(&relation) {
                relations.push(relation);
            }
        }
        Ok(relations)
    }

    fn property_quad(
        &self,
        uri: &NamedNode,
        property: &PropertyDescriptor,
        value: &Value,
    ) -> MappingResult<Quad> {
        if !value.fits(property.datatype) {
            return Err(MappingError::IllegalArgument(format!(
                "field {} expects {}, got {}",
                property.field,
                property.datatype.name(),
                value.datatype().name()
            )));
        }
        let term = value.to_term()?;
        let graph = Some(property.graph.clone());
        Ok(match property.direction {
            Direction::Forward => Quad::new(uri.clone(), property.predicate.clone(), term, graph),
            Direction::Inverse => Quad::new(term, property.predicate.clone(), uri.clone(), graph),
        })
    }

    /// Build a model from one solution row of a synthesized select.
    ///
    /// Optional properties missing from the row stay unset. List properties
    /// are left empty; they are hydrated by the list fetcher.
    pub fn from_solution(&self, solution: &QuerySolution) -> MappingResult<T> {
        let mut model = T::default();

        let uri = solution
            .get(self.descriptor.identifier())
            .and_then(Term::as_named_node)
            .ok_or_else(|| MappingError::Deserialization {
                field: self.descriptor.identifier().to_string(),
                value: format!("{:?}", solution.get(self.descriptor.identifier())),
                datatype: "Uri".to_string(),
            })?;
        model.resource_mut().set_uri(uri.as_str());

        if let Some(Term::NamedNode(rdf_type)) = solution.get(self.descriptor.type_field()) {
            model.resource_mut().set_rdf_type(rdf_type.as_str())?;
        }
        if let Some(label_field) = self.descriptor.type_label() {
            let label = solution.get(label_field).map(|t| t.lexical().to_string());
            model.resource_mut().set_rdf_type_name(label);
        }

        for (property, access) in self.descriptor.properties().zip(&self.accessors) {
            let FieldAccess::Scalar { set, .. } = access else {
                continue;
            };
            let value = match solution.get(&property.field) {
                Some(term) => Some(decode(property, term)?),
                None => None,
            };
            set(&mut model, value);
        }

        Ok(model)
    }

    fn access(&self, field: &str) -> MappingResult<(&PropertyDescriptor, &FieldAccess<T>)> {
        self.descriptor
            .properties()
            .zip(&self.accessors)
            .find(|(p, _)| p.field == field)
            .ok_or_else(|| {
                MappingError::IllegalArgument(format!(
                    "{} has no field {}",
                    self.descriptor.type_name(),
                    field
                ))
            })
    }

    /// Current value of a scalar field
    pub fn get_scalar(&self, model: &T, field: &str) -> MappingResult<Option<Value>> {
        match self.access(field)? {
            (_, FieldAccess::Scalar { get, .. }) => Ok(get(model)),
            (p, FieldAccess::List { .. }) => Err(MappingError::IllegalArgument(format!(
                "field {} is multi-valued",
                p.field
            ))),
        }
    }

    /// Current values of a multi-valued field
    pub fn get_list(&self, model: &T, field: &str) -> MappingResult<Vec<Value>> {
        match self.access(field)? {
            (_, FieldAccess::List { get, .. }) => Ok(get(model)),
            (p, FieldAccess::Scalar { .. }) => Err(MappingError::IllegalArgument(format!(
                "field {} is not multi-valued",
                p.field
            ))),
        }
    }

    /// Replace the collection of a multi-valued field
    pub fn set_list(&self, model: &mut T, field: &str, values: Vec<Value>) -> MappingResult<()> {
        match self.access(field)? {
            (_, FieldAccess::List { set, .. }) => {
                set(model, values);
                Ok(())
            }
            (p, FieldAccess::Scalar { .. }) => Err(MappingError::IllegalArgument(format!(
                "field {} is not multi-valued",
                p.field
            ))),
        }
    }
}

/// Read a stored term as the declared datatype of a property
pub(crate) fn decode(property: &PropertyDescriptor, term: &Term) -> MappingResult<Value> {
    Value::from_term(term, property.datatype).ok_or_else(|| MappingError::Deserialization {
        field: property.field.clone(),
        value: term.to_string(),
        datatype: property.datatype.name().to_string(),
    })
}
