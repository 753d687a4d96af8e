//! Descriptor-driven query synthesis
//!
//! Pure functions from a [`ResourceDescriptor`] (plus filters, ordering and
//! paging) to spargebra queries and updates. Nothing here touches a store.
//!
//! Shape of a synthesized select:
//!
//! ```text
//! SELECT DISTINCT ?uri ?rdf_type ?rdf_type_name ?brand ... WHERE {
//!   VALUES ?uri { ... }                                  # identifier filters
//!   ?rdf_type rdfs:subClassOf* <Type> .
//!   OPTIONAL { ?rdf_type rdfs:label ?rdf_type_name . FILTER(lang) }
//!   GRAPH <model graph> {
//!     ?uri rdf:type ?rdf_type .
//!     ?uri <required> ?required .
//!     OPTIONAL { ?uri <optional> ?optional . }
//!   }
//!   OPTIONAL { GRAPH <other graph> { ?uri <p> ?other . } }
//!   FILTER(...)
//!   FILTER(!isBLANK(?uri))
//! }
//! ORDER BY ... ASC(?uri)
//! ```
//!
//! A paged select first picks the page of distinct identifiers in a grouped
//! sub-select, so `LIMIT` counts instances rather than rows.

use super::algebra::{
    conjunction, data_quad, function, ground_quad, internal_variable, join, lang_filter, named,
    not_blank, rdf_type, sub_class_of_any, term_expression, union, values, variable,
    GroupBuilder,
};
use super::filter::{Filter, SelectOptions};
use crate::error::{MappingError, MappingResult};
use crate::mapping::{Direction, PropertyDescriptor, PropertyRole, ResourceDescriptor};
use crate::model::{Datatype, Value};
use crate::rdf::{vocab, NamedNode, Quad, Term};
use indexmap::IndexMap;
use spargebra::algebra::{
    AggregateExpression, AggregateFunction, Expression, Function, GraphPattern, OrderExpression,
};
use spargebra::term::{
    GraphNamePattern, GroundQuadPattern, GroundTermPattern, NamedNodePattern, TriplePattern,
    Variable,
};
use spargebra::{GraphUpdateOperation, Query, Update};
use std::collections::HashSet;
use tracing::debug;

/// Alias of the aggregate in count queries
pub const COUNT_VARIABLE: &str = "__count";

/// Variables of a relation select: graph, predicate and value
pub const RELATION_VARIABLES: [&str; 3] = ["__graph", "__predicate", "__value"];

/// Patterns of one graph block
#[derive(Default)]
struct GraphBucket {
    required: GroupBuilder,
    optional: Vec<GroupBuilder>,
}

/// One `ORDER BY` key of a select
struct SortKey {
    variable: Variable,
    descending: bool,
}

impl SortKey {
    fn order(&self) -> OrderExpression {
        let expression = Expression::Variable(self.variable.clone());
        if self.descending {
            OrderExpression::Desc(expression)
        } else {
            OrderExpression::Asc(expression)
        }
    }
}

fn select(pattern: GraphPattern) -> Query {
    Query::Select {
        dataset: None,
        pattern,
        base_iri: None,
    }
}

fn ask(pattern: GraphPattern) -> Query {
    Query::Ask {
        dataset: None,
        pattern,
        base_iri: None,
    }
}

fn update(operations: Vec<GraphUpdateOperation>) -> Update {
    Update {
        base_iri: None,
        operations,
    }
}

/// Builds queries for one model type
pub struct QuerySynthesizer<'a> {
    descriptor: &'a ResourceDescriptor,
}

impl<'a> QuerySynthesizer<'a> {
    pub fn new(descriptor: &'a ResourceDescriptor) -> Self {
        Self { descriptor }
    }

    fn identifier(&self) -> Variable {
        variable(self.descriptor.identifier())
    }

    fn type_variable(&self) -> Variable {
        variable(self.descriptor.type_field())
    }

    /// Paged, filtered, ordered select of all scalar fields
    pub fn build_select(&self, options: &SelectOptions) -> MappingResult<Query> {
        let lang = options.lang.as_deref();
        let identifier = self.identifier();

        let mut projection = vec![identifier.clone(), self.type_variable()];
        if let Some(label) = self.descriptor.type_label() {
            projection.push(variable(label));
        }
        projection.extend(self.descriptor.scalar_properties().map(|p| variable(&p.field)));

        let mut order = Vec::with_capacity(options.order_by.len() + 1);
        for o in &options.order_by {
            order.push(SortKey {
                variable: self.sortable_variable(&o.field)?,
                descending: o.descending,
            });
        }
        if order.last().map(|k| &k.variable) != Some(&identifier) {
            order.push(SortKey {
                variable: identifier.clone(),
                descending: false,
            });
        }

        let mut pattern = self.where_pattern(&options.filters, lang)?;
        if let Some((offset, limit)) = options.pagination() {
            let (page, keys) = self.page_of_identifiers(&options.filters, lang, &order, offset, limit)?;
            pattern = join(page, pattern);
            order = keys;
        }

        let pattern = GraphPattern::Distinct {
            inner: Box::new(GraphPattern::Project {
                inner: Box::new(GraphPattern::OrderBy {
                    inner: Box::new(pattern),
                    expression: order.iter().map(SortKey::order).collect(),
                }),
                variables: projection,
            }),
        };

        debug!(
            "Synthesized select for {} ({} filters)",
            self.descriptor.type_name(),
            options.filters.len()
        );
        Ok(select(pattern))
    }

    /// Sub-select of one page of distinct identifiers with their sort keys.
    ///
    /// Returns the pattern and the keys the outer query orders by.
    fn page_of_identifiers(
        &self,
        filters: &[Filter],
        lang: Option<&str>,
        order: &[SortKey],
        offset: usize,
        limit: usize,
    ) -> MappingResult<(GraphPattern, Vec<SortKey>)> {
        let identifier = self.identifier();
        let mut aggregates = Vec::new();
        let mut keys = Vec::with_capacity(order.len());
        for (i, key) in order.iter().enumerate() {
            if key.variable == identifier {
                keys.push(SortKey {
                    variable: identifier.clone(),
                    descending: key.descending,
                });
                continue;
            }
            let alias = internal_variable(&format!("order_key_{}", i));
            let name = if key.descending {
                AggregateFunction::Max
            } else {
                AggregateFunction::Min
            };
            aggregates.push((
                alias.clone(),
                AggregateExpression::FunctionCall {
                    name,
                    expr: Expression::Variable(key.variable.clone()),
                    distinct: false,
                },
            ));
            keys.push(SortKey {
                variable: alias,
                descending: key.descending,
            });
        }

        let mut projected = vec![identifier.clone()];
        projected.extend(aggregates.iter().map(|(alias, _)| alias.clone()));

        let grouped = GraphPattern::Group {
            inner: Box::new(self.where_pattern(filters, lang)?),
            variables: vec![identifier],
            aggregates,
        };
        let page = GraphPattern::Slice {
            inner: Box::new(GraphPattern::Project {
                inner: Box::new(GraphPattern::OrderBy {
                    inner: Box::new(grouped),
                    expression: keys.iter().map(SortKey::order).collect(),
                }),
                variables: projected,
            }),
            start: offset,
            length: Some(limit),
        };
        Ok((page, keys))
    }

    /// `COUNT(DISTINCT ?uri)` over the same pattern as [`build_select`](Self::build_select)
    pub fn build_count(&self, filters: &[Filter], lang: Option<&str>) -> MappingResult<Query> {
        let count = variable(COUNT_VARIABLE);
        let grouped = GraphPattern::Group {
            inner: Box::new(self.where_pattern(filters, lang)?),
            variables: Vec::new(),
            aggregates: vec![(
                count.clone(),
                AggregateExpression::FunctionCall {
                    name: AggregateFunction::Count,
                    expr: Expression::Variable(self.identifier()),
                    distinct: true,
                },
            )],
        };
        Ok(select(GraphPattern::Project {
            inner: Box::new(grouped),
            variables: vec![count],
        }))
    }

    /// Whether any instance matches the filters
    pub fn build_ask(&self, filters: &[Filter]) -> MappingResult<Query> {
        Ok(ask(self.where_pattern(filters, None)?))
    }

    /// Whether `uri` is typed with this model type or a subclass, in any graph
    pub fn build_uri_exists(&self, uri: &NamedNode) -> Query {
        let type_variable = self.type_variable();
        let mut group = GroupBuilder::new();
        group
            .triple(named(uri), named(&rdf_type()), type_variable.clone())
            .path(type_variable, sub_class_of_any(), named(self.descriptor.rdf_type()));
        ask(group.build())
    }

    /// Whether `uri` occurs as subject or object of any statement, whatever its type
    pub fn build_uri_exists_any(uri: &NamedNode) -> Query {
        let (s, p, o) = (variable("s"), variable("p"), variable("o"));
        let mut as_subject = GroupBuilder::new();
        as_subject.triple(named(uri), p.clone(), o);
        let mut as_object = GroupBuilder::new();
        as_object.triple(s, p, named(uri));

        let branches = vec![as_subject.build(), as_object.build()];
        ask(union(branches).unwrap_or_default())
    }

    /// Every `(graph, predicate, value)` stated about `uri` as subject.
    /// Blank node values are left out.
    pub fn build_relations(uri: &NamedNode) -> Query {
        let [graph, predicate, value] = RELATION_VARIABLES.map(variable);
        let mut inner = GroupBuilder::new();
        inner.triple(named(uri), predicate.clone(), value.clone());

        let mut group = GroupBuilder::new();
        group
            .push(GraphPattern::Graph {
                name: NamedNodePattern::Variable(graph.clone()),
                inner: Box::new(inner.build()),
            })
            .filter(not_blank(&value));
        select(GraphPattern::Distinct {
            inner: Box::new(GraphPattern::Project {
                inner: Box::new(group.build()),
                variables: vec![graph, predicate, value],
            }),
        })
    }

    /// `INSERT DATA` of instance quads
    pub fn build_insert(&self, quads: Vec<Quad>) -> MappingResult<Update> {
        let mut operations = Vec::new();
        if !quads.is_empty() {
            let data = quads
                .into_iter()
                .map(data_quad)
                .collect::<MappingResult<_>>()?;
            operations.push(GraphUpdateOperation::InsertData { data });
        }
        Ok(update(operations))
    }

    /// `DELETE DATA` of instance quads
    pub fn build_delete_data(&self, quads: Vec<Quad>) -> MappingResult<Update> {
        let mut operations = Vec::new();
        if !quads.is_empty() {
            let data = quads
                .into_iter()
                .map(ground_quad)
                .collect::<MappingResult<_>>()?;
            operations.push(GraphUpdateOperation::DeleteData { data });
        }
        Ok(update(operations))
    }

    /// Remove everything the descriptor writes for `uri`.
    ///
    /// One `DELETE WHERE` per pattern: a single operation holding several
    /// patterns would only delete when all of them match.
    pub fn build_delete(&self, uri: &NamedNode) -> Update {
        let subject = || GroundTermPattern::NamedNode(named(uri));
        let model_graph = self.descriptor.graph();
        let mut operations = vec![delete_where(
            model_graph,
            subject(),
            NamedNodePattern::Variable(variable("p")),
            variable("o").into(),
        )];

        let mut seen = HashSet::new();
        for property in self.descriptor.properties() {
            let inverse = property.is_inverse();
            if !inverse && &property.graph == model_graph {
                continue;
            }
            if !seen.insert((property.graph.clone(), property.predicate.clone(), inverse)) {
                continue;
            }
            let (s, o): (GroundTermPattern, GroundTermPattern) = if inverse {
                (variable("s").into(), subject())
            } else {
                (subject(), variable("o").into())
            };
            operations.push(delete_where(
                &property.graph,
                s,
                NamedNodePattern::NamedNode(named(&property.predicate)),
                o,
            ));
        }
        update(operations)
    }

    /// Values of one multi-valued field for a batch of identifiers
    pub fn build_list_values(&self, field: &str, uris: &[NamedNode]) -> MappingResult<Query> {
        let property = self.descriptor.property(field).ok_or_else(|| {
            MappingError::IllegalArgument(format!(
                "{} has no field {}",
                self.descriptor.type_name(),
                field
            ))
        })?;
        if !property.is_list() {
            return Err(MappingError::IllegalArgument(format!(
                "field {} is not multi-valued",
                field
            )));
        }

        let mut inner = GroupBuilder::new();
        self.property_triple(&mut inner, property);

        let identifiers: Vec<Term> = uris.iter().cloned().map(Term::from).collect();
        let mut group = GroupBuilder::new();
        group
            .push(values(self.identifier(), &identifiers)?)
            .graph(&property.graph, inner);

        Ok(select(GraphPattern::Distinct {
            inner: Box::new(GraphPattern::Project {
                inner: Box::new(group.build()),
                variables: vec![self.identifier(), variable(field)],
            }),
        }))
    }

    fn property_triple(&self, group: &mut GroupBuilder, property: &PropertyDescriptor) {
        let value = variable(&property.field);
        let predicate = named(&property.predicate);
        match property.direction {
            Direction::Forward => group.triple(self.identifier(), predicate, value),
            Direction::Inverse => group.triple(value, predicate, self.identifier()),
        };
    }

    fn where_pattern(&self, filters: &[Filter], lang: Option<&str>) -> MappingResult<GraphPattern> {
        let identifier = self.identifier();
        let type_variable = self.type_variable();
        let mut group = GroupBuilder::new();

        // identifier restrictions first, so evaluation starts from bound URIs
        let mut remaining = Vec::new();
        for filter in filters {
            match filter {
                Filter::Equals { field, value } if field == self.descriptor.identifier() => {
                    group.push(values(identifier.clone(), &[uri_term(value)?])?);
                }
                Filter::In { field, values: uris } if field == self.descriptor.identifier() => {
                    let terms = uris.iter().map(uri_term).collect::<MappingResult<Vec<_>>>()?;
                    group.push(values(identifier.clone(), &terms)?);
                }
                other => remaining.push(other),
            }
        }

        group.path(
            type_variable.clone(),
            sub_class_of_any(),
            named(self.descriptor.rdf_type()),
        );
        if let Some(label) = self.descriptor.type_label() {
            let label = variable(label);
            let mut optional = GroupBuilder::new();
            optional.triple(
                type_variable.clone(),
                named(&NamedNode::new(vocab::RDFS_LABEL)?),
                label.clone(),
            );
            if let Some(lang) = lang {
                optional.filter(lang_filter(&label, lang));
            }
            group.optional(optional);
        }

        let filtered_lists: HashSet<&str> = remaining
            .iter()
            .map(|f| f.field())
            .filter(|f| self.descriptor.property(f).is_some_and(|p| p.is_list()))
            .collect();

        let mut buckets: IndexMap<NamedNode, GraphBucket> = IndexMap::new();
        buckets
            .entry(self.descriptor.graph().clone())
            .or_default()
            .required
            .triple(identifier.clone(), named(&rdf_type()), type_variable);

        for property in self.descriptor.properties() {
            let bucket = buckets.entry(property.graph.clone()).or_default();
            if property.is_list() {
                if filtered_lists.contains(property.field.as_str()) {
                    self.property_triple(&mut bucket.required, property);
                }
                continue;
            }
            let label_lang = match (property.role, lang) {
                (PropertyRole::Label, Some(lang)) => Some(lang_filter(&variable(&property.field), lang)),
                _ => None,
            };
            if property.required {
                self.property_triple(&mut bucket.required, property);
                if let Some(filter) = label_lang {
                    bucket.required.filter(filter);
                }
            } else {
                let mut optional = GroupBuilder::new();
                self.property_triple(&mut optional, property);
                if let Some(filter) = label_lang {
                    optional.filter(filter);
                }
                bucket.optional.push(optional);
            }
        }

        for (graph, bucket) in buckets {
            if bucket.required.is_empty() {
                for optional in bucket.optional {
                    let mut scoped = GroupBuilder::new();
                    scoped.graph(&graph, optional);
                    group.optional(scoped);
                }
            } else {
                let mut inner = bucket.required;
                for optional in bucket.optional {
                    inner.optional(optional);
                }
                group.graph(&graph, inner);
            }
        }

        for filter in remaining {
            self.apply_filter(&mut group, filter)?;
        }

        group.filter(not_blank(&identifier));
        Ok(group.build())
    }

    /// Variable bound by a field in the select pattern
    fn field_variable(&self, field: &str) -> MappingResult<Variable> {
        let declared = field == self.descriptor.identifier()
            || field == self.descriptor.type_field()
            || self.descriptor.type_label() == Some(field)
            || self.descriptor.property(field).is_some();
        if declared {
            Ok(variable(field))
        } else {
            Err(MappingError::IllegalArgument(format!(
                "{} has no field {}",
                self.descriptor.type_name(),
                field
            )))
        }
    }

    fn sortable_variable(&self, field: &str) -> MappingResult<Variable> {
        let variable = self.field_variable(field)?;
        if self.descriptor.property(field).is_some_and(|p| p.is_list()) {
            return Err(MappingError::IllegalArgument(format!(
                "cannot order by multi-valued field {}",
                field
            )));
        }
        Ok(variable)
    }

    fn apply_filter(&self, group: &mut GroupBuilder, filter: &Filter) -> MappingResult<()> {
        let var = Expression::Variable(self.field_variable(filter.field())?);
        match filter {
            Filter::Regex {
                field,
                pattern,
                case_insensitive,
            } => {
                regex::Regex::new(pattern).map_err(|e| {
                    MappingError::IllegalArgument(format!("regex filter on {}: {}", field, e))
                })?;
                let mut args = vec![
                    function(Function::Str, vec![var]),
                    Expression::Literal(oxrdf::Literal::new_simple_literal(pattern)),
                ];
                if *case_insensitive {
                    args.push(Expression::Literal(oxrdf::Literal::new_simple_literal("i")));
                }
                group.filter(function(Function::Regex, args));
            }
            Filter::Equals { field, value } => {
                let operand = term_expression(&self.filter_term(field, value)?)?;
                group.filter(Expression::Equal(Box::new(var), Box::new(operand)));
            }
            Filter::In { field, values: allowed } => {
                let terms = allowed
                    .iter()
                    .map(|v| self.filter_term(field, v))
                    .collect::<MappingResult<Vec<_>>>()?;
                group.push(values(self.field_variable(field)?, &terms)?);
            }
            Filter::Range { field, min, max } => {
                let mut bounds = Vec::new();
                if let Some(min) = min {
                    let operand = term_expression(&self.filter_term(field, min)?)?;
                    bounds.push(Expression::GreaterOrEqual(Box::new(var.clone()), Box::new(operand)));
                }
                if let Some(max) = max {
                    let operand = term_expression(&self.filter_term(field, max)?)?;
                    bounds.push(Expression::LessOrEqual(Box::new(var), Box::new(operand)));
                }
                let Some(range) = conjunction(bounds) else {
                    return Err(MappingError::IllegalArgument(format!(
                        "range filter on {} has no bound",
                        field
                    )));
                };
                group.filter(range);
            }
        }
        Ok(())
    }

    fn filter_term(&self, field: &str, value: &Value) -> MappingResult<Term> {
        if field == self.descriptor.type_field() {
            return uri_term(value);
        }
        match self.descriptor.property(field) {
            Some(p) if p.datatype == Datatype::Uri => uri_term(value),
            _ => Ok(value.to_term()?),
        }
    }
}

/// `DELETE WHERE { GRAPH <graph> { s p o } }`
fn delete_where(
    graph: &NamedNode,
    subject: GroundTermPattern,
    predicate: NamedNodePattern,
    object: GroundTermPattern,
) -> GraphUpdateOperation {
    let triple = TriplePattern {
        subject: subject.clone().into(),
        predicate: predicate.clone(),
        object: object.clone().into(),
    };
    GraphUpdateOperation::DeleteInsert {
        delete: vec![GroundQuadPattern {
            subject,
            predicate,
            object,
            graph_name: GraphNamePattern::NamedNode(named(graph)),
        }],
        insert: Vec::new(),
        using: None,
        pattern: Box::new(GraphPattern::Graph {
            name: NamedNodePattern::NamedNode(named(graph)),
            inner: Box::new(GraphPattern::Bgp {
                patterns: vec![triple],
            }),
        }),
    }
}

/// URI-valued filter operand
fn uri_term(value: &Value) -> MappingResult<Term> {
    let uri = match value {
        Value::Uri(u) | Value::String(u) => u,
        other => {
            return Err(MappingError::IllegalArgument(format!(
                "expected a URI, got {}",
                other
            )))
        }
    };
    Ok(NamedNode::new(uri)?.into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sparql::algebra::ground_term;

    #[test]
    fn test_uri_exists_any_matches_both_positions() {
        let uri = NamedNode::new("http://example.org/id/d1").unwrap();
        let text = QuerySynthesizer::build_uri_exists_any(&uri).to_string();
        assert!(text.starts_with("ASK"));
        assert!(text.contains("UNION"));
        assert!(text.contains("<http://example.org/id/d1> ?p ?o"));
        assert!(text.contains("?s ?p <http://example.org/id/d1>"));
        Query::parse(&text, None).unwrap();
    }

    #[test]
    fn test_relations_select_any_graph() {
        let uri = NamedNode::new("http://example.org/id/d1").unwrap();
        let text = QuerySynthesizer::build_relations(&uri).to_string();
        assert!(text.contains("GRAPH ?__graph"));
        assert!(text.contains("<http://example.org/id/d1> ?__predicate ?__value"));
        Query::parse(&text, None).unwrap();
    }

    #[test]
    fn test_delete_where_shares_pattern() {
        let operation = delete_where(
            &NamedNode::new("http://example.org/g").unwrap(),
            GroundTermPattern::NamedNode(oxrdf::NamedNode::new_unchecked("http://example.org/id/d1")),
            NamedNodePattern::Variable(variable("p")),
            variable("o").into(),
        );
        let text = update(vec![operation]).to_string();
        assert!(text.contains("DELETE {"));
        assert!(text.contains("GRAPH <http://example.org/g>"));
        Update::parse(&text, None).unwrap();
    }

    #[test]
    fn test_ground_term_for_values() {
        let term = Term::from(NamedNode::new("http://example.org/a").unwrap());
        assert_eq!(ground_term(&term).unwrap().to_string(), "<http://example.org/a>");
    }
}
