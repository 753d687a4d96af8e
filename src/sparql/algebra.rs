//! Group graph patterns over the spargebra algebra
//!
//! [`GroupBuilder`] mirrors a SPARQL group `{ ... }`: elements are joined in
//! the order they are added, consecutive triples share one basic graph
//! pattern, and filters apply to the whole group.

use crate::error::{MappingError, MappingResult};
use crate::rdf::{NamedNode, Quad, Term};
use spargebra::algebra::{Expression, Function, GraphPattern, PropertyPathExpression};
use spargebra::term::{
    GraphName, GroundQuad, GroundTerm, NamedNodePattern, TermPattern, TriplePattern, Variable,
};

/// Prefix of variables the synthesizer introduces itself. Field names may
/// not start with it.
pub(crate) const RESERVED_PREFIX: &str = "__";

/// Variable for a descriptor field. Field names are checked when the
/// descriptor is built.
pub(crate) fn variable(name: &str) -> Variable {
    Variable::new_unchecked(name)
}

/// Synthesizer-owned variable that cannot collide with a field
pub(crate) fn internal_variable(name: &str) -> Variable {
    Variable::new_unchecked(format!("{}{}", RESERVED_PREFIX, name))
}

pub(crate) fn rdf_type() -> NamedNode {
    NamedNode::from(oxrdf::vocab::rdf::TYPE)
}

/// `rdfs:subClassOf*`
pub(crate) fn sub_class_of_any() -> PropertyPathExpression {
    PropertyPathExpression::ZeroOrMore(Box::new(PropertyPathExpression::NamedNode(
        oxrdf::vocab::rdfs::SUB_CLASS_OF.into_owned(),
    )))
}

pub(crate) fn named(node: &NamedNode) -> oxrdf::NamedNode {
    node.inner().clone()
}

/// Bindable term for `VALUES` rows and expression operands
pub(crate) fn ground_term(term: &Term) -> MappingResult<GroundTerm> {
    match term {
        Term::NamedNode(n) => Ok(GroundTerm::NamedNode(named(n))),
        Term::Literal(l) => Ok(GroundTerm::Literal(l.clone().into())),
        Term::BlankNode(b) => Err(MappingError::IllegalArgument(format!(
            "blank node _:{} cannot be bound in a query",
            b.as_str()
        ))),
    }
}

pub(crate) fn term_expression(term: &Term) -> MappingResult<Expression> {
    Ok(match ground_term(term)? {
        GroundTerm::NamedNode(n) => Expression::NamedNode(n),
        GroundTerm::Literal(l) => Expression::Literal(l),
        #[allow(unreachable_patterns)]
        other => {
            return Err(MappingError::IllegalArgument(format!(
                "unsupported filter operand {}",
                other
            )))
        }
    })
}

/// `VALUES ?variable { ... }` with one row per term
pub(crate) fn values(variable: Variable, terms: &[Term]) -> MappingResult<GraphPattern> {
    let bindings = terms
        .iter()
        .map(|t| ground_term(t).map(|g| vec![Some(g)]))
        .collect::<MappingResult<_>>()?;
    Ok(GraphPattern::Values {
        variables: vec![variable],
        bindings,
    })
}

pub(crate) fn function(function: Function, args: Vec<Expression>) -> Expression {
    Expression::FunctionCall(function, args)
}

/// Value in the requested language or without language tag
pub(crate) fn lang_filter(variable: &Variable, lang: &str) -> Expression {
    let lang_of = || function(Function::Lang, vec![Expression::Variable(variable.clone())]);
    Expression::Or(
        Box::new(function(
            Function::LangMatches,
            vec![lang_of(), Expression::Literal(oxrdf::Literal::new_simple_literal(lang))],
        )),
        Box::new(Expression::Equal(
            Box::new(lang_of()),
            Box::new(Expression::Literal(oxrdf::Literal::new_simple_literal(""))),
        )),
    )
}

/// `!isBlank(?variable)`
pub(crate) fn not_blank(variable: &Variable) -> Expression {
    Expression::Not(Box::new(function(
        Function::IsBlank,
        vec![Expression::Variable(variable.clone())],
    )))
}

pub(crate) fn conjunction(expressions: Vec<Expression>) -> Option<Expression> {
    expressions
        .into_iter()
        .reduce(|left, right| Expression::And(Box::new(left), Box::new(right)))
}

/// `{ a } UNION { b } UNION ...`, `None` without branches
pub(crate) fn union(branches: Vec<GraphPattern>) -> Option<GraphPattern> {
    branches.into_iter().reduce(|left, right| GraphPattern::Union {
        left: Box::new(left),
        right: Box::new(right),
    })
}

pub(crate) fn join(left: GraphPattern, right: GraphPattern) -> GraphPattern {
    GraphPattern::Join {
        left: Box::new(left),
        right: Box::new(right),
    }
}

/// Quad for `INSERT DATA`
pub(crate) fn data_quad(quad: Quad) -> MappingResult<spargebra::term::Quad> {
    let ox = oxrdf::Quad::try_from(quad)?;
    Ok(spargebra::term::Quad {
        subject: ox.subject,
        predicate: ox.predicate,
        object: ox.object,
        graph_name: graph_name(ox.graph_name)?,
    })
}

/// Quad for `DELETE DATA`, which cannot hold blank nodes
pub(crate) fn ground_quad(quad: Quad) -> MappingResult<GroundQuad> {
    let display = quad.to_string();
    GroundQuad::try_from(data_quad(quad)?)
        .map_err(|()| MappingError::IllegalArgument(format!("cannot delete blank node data {}", display)))
}

fn graph_name(graph: oxrdf::GraphName) -> MappingResult<GraphName> {
    match graph {
        oxrdf::GraphName::NamedNode(n) => Ok(GraphName::NamedNode(n)),
        oxrdf::GraphName::DefaultGraph => Ok(GraphName::DefaultGraph),
        other => Err(MappingError::IllegalArgument(format!(
            "unsupported graph name {}",
            other
        ))),
    }
}

/// One SPARQL group under construction
#[derive(Debug, Default)]
pub(crate) struct GroupBuilder {
    pattern: Option<GraphPattern>,
    triples: Vec<TriplePattern>,
    filters: Vec<Expression>,
}

impl GroupBuilder {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn triple(
        &mut self,
        subject: impl Into<TermPattern>,
        predicate: impl Into<NamedNodePattern>,
        object: impl Into<TermPattern>,
    ) -> &mut Self {
        self.triples.push(TriplePattern {
            subject: subject.into(),
            predicate: predicate.into(),
            object: object.into(),
        });
        self
    }

    pub(crate) fn path(
        &mut self,
        subject: impl Into<TermPattern>,
        path: PropertyPathExpression,
        object: impl Into<TermPattern>,
    ) -> &mut Self {
        self.push(GraphPattern::Path {
            subject: subject.into(),
            path,
            object: object.into(),
        })
    }

    /// Join `element` after everything added so far
    pub(crate) fn push(&mut self, element: GraphPattern) -> &mut Self {
        self.flush();
        self.pattern = Some(match self.pattern.take() {
            Some(left) => join(left, element),
            None => element,
        });
        self
    }

    /// `GRAPH <name> { group }`
    pub(crate) fn graph(&mut self, name: &NamedNode, group: GroupBuilder) -> &mut Self {
        self.push(GraphPattern::Graph {
            name: NamedNodePattern::NamedNode(named(name)),
            inner: Box::new(group.build()),
        })
    }

    /// `OPTIONAL { group }`; the group filters become the left join condition
    pub(crate) fn optional(&mut self, group: GroupBuilder) -> &mut Self {
        self.flush();
        let (right, filters) = group.into_parts();
        let left = self.pattern.take().unwrap_or_default();
        self.pattern = Some(GraphPattern::LeftJoin {
            left: Box::new(left),
            right: Box::new(right),
            expression: conjunction(filters),
        });
        self
    }

    pub(crate) fn filter(&mut self, expression: Expression) -> &mut Self {
        self.filters.push(expression);
        self
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.pattern.is_none() && self.triples.is_empty() && self.filters.is_empty()
    }

    fn flush(&mut self) {
        if self.triples.is_empty() {
            return;
        }
        let bgp = GraphPattern::Bgp {
            patterns: std::mem::take(&mut self.triples),
        };
        self.pattern = Some(match self.pattern.take() {
            Some(left) => join(left, bgp),
            None => bgp,
        });
    }

    fn into_parts(mut self) -> (GraphPattern, Vec<Expression>) {
        self.flush();
        (self.pattern.unwrap_or_default(), self.filters)
    }

    pub(crate) fn build(self) -> GraphPattern {
        let (pattern, filters) = self.into_parts();
        match conjunction(filters) {
            Some(expr) => GraphPattern::Filter {
                expr,
                inner: Box::new(pattern),
            },
            None => pattern,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rdf::Literal;

    fn node(iri: &str) -> NamedNode {
        NamedNode::new(iri).unwrap()
    }

    #[test]
    fn test_consecutive_triples_share_one_bgp() {
        let mut group = GroupBuilder::new();
        group
            .triple(variable("s"), named(&node("http://ex.org/p")), variable("o"))
            .triple(variable("o"), named(&node("http://ex.org/q")), variable("x"));
        match group.build() {
            GraphPattern::Bgp { patterns } => assert_eq!(patterns.len(), 2),
            other => panic!("expected a BGP, got {}", other),
        }
    }

    #[test]
    fn test_optional_filters_become_join_condition() {
        let label = variable("label");
        let mut optional = GroupBuilder::new();
        optional
            .triple(variable("t"), named(&node("http://ex.org/label")), label.clone())
            .filter(lang_filter(&label, "en"));

        let mut group = GroupBuilder::new();
        group
            .triple(variable("s"), rdf_type().inner().clone(), variable("t"))
            .optional(optional)
            .filter(not_blank(&variable("s")));

        let pattern = group.build();
        let GraphPattern::Filter { inner, .. } = &pattern else {
            panic!("expected the group filter outermost, got {}", pattern);
        };
        assert!(matches!(
            inner.as_ref(),
            GraphPattern::LeftJoin { expression: Some(_), .. }
        ));

        let text = spargebra::Query::Select {
            dataset: None,
            pattern,
            base_iri: None,
        }
        .to_string();
        assert!(text.contains("OPTIONAL"));
        assert!(text.contains("LANGMATCHES"));
        spargebra::Query::parse(&text, None).unwrap();
    }

    #[test]
    fn test_data_quad_keeps_graph() {
        let quad = Quad::new(
            node("http://ex.org/a"),
            node("http://ex.org/p"),
            Literal::new_simple_literal("A"),
            Some(node("http://ex.org/g")),
        );
        let data = data_quad(quad.clone()).unwrap();
        assert_eq!(data.graph_name, GraphName::NamedNode(named(&node("http://ex.org/g"))));
        ground_quad(quad).unwrap();
    }

    #[test]
    fn test_union_of_nothing() {
        assert!(union(Vec::new()).is_none());
        assert!(conjunction(Vec::new()).is_none());
        assert!(GroupBuilder::new().is_empty());
    }
}
