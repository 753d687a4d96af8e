//! RDF term definitions
//!
//! Thin wrappers around the oxrdf primitives. Every term and quad written to or
//! read from a store goes through these types.

use oxrdf::{
    vocab::{rdf, xsd},
    BlankNode as OxBlankNode, GraphName as OxGraphName, Literal as OxLiteral,
    NamedNode as OxNamedNode, Quad as OxQuad, Subject as OxSubject, Term as OxTerm,
};
use std::fmt;
use thiserror::Error;

/// RDF errors
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RdfError {
    /// Invalid IRI
    #[error("Invalid IRI: {0}")]
    InvalidIri(String),

    /// Invalid literal
    #[error("Invalid literal: {0}")]
    InvalidLiteral(String),

    /// Unknown prefix in a compact IRI
    #[error("Unknown prefix: {0}")]
    UnknownPrefix(String),

    /// Term kind not representable here (e.g. RDF-star triples)
    #[error("Unsupported term: {0}")]
    UnsupportedTerm(String),
}

pub type RdfResult<T> = Result<T, RdfError>;

/// Named node (IRI)
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct NamedNode(OxNamedNode);

impl NamedNode {
    /// Create a new named node from an IRI string
    pub fn new(iri: &str) -> RdfResult<Self> {
        OxNamedNode::new(iri)
            .map(Self)
            .map_err(|e| RdfError::InvalidIri(format!("{}: {}", iri, e)))
    }

    /// Get the IRI string
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }

    /// Get the inner oxrdf NamedNode
    pub fn inner(&self) -> &OxNamedNode {
        &self.0
    }

    /// Part of the IRI after the last `#` or `/`
    pub fn local_name(&self) -> &str {
        let iri = self.as_str();
        iri.rsplit(|c| c == '#' || c == '/').next().unwrap_or(iri)
    }
}

impl fmt::Display for NamedNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<{}>", self.as_str())
    }
}

impl From<OxNamedNode> for NamedNode {
    fn from(node: OxNamedNode) -> Self {
        Self(node)
    }
}

impl From<oxrdf::NamedNodeRef<'_>> for NamedNode {
    fn from(node: oxrdf::NamedNodeRef<'_>) -> Self {
        Self(node.into_owned())
    }
}

impl From<NamedNode> for OxNamedNode {
    fn from(node: NamedNode) -> Self {
        node.0
    }
}

/// Blank node (anonymous node)
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct BlankNode(OxBlankNode);

impl BlankNode {
    /// Get the blank node identifier
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl fmt::Display for BlankNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "_:{}", self.as_str())
    }
}

impl From<OxBlankNode> for BlankNode {
    fn from(node: OxBlankNode) -> Self {
        Self(node)
    }
}

impl From<BlankNode> for OxBlankNode {
    fn from(node: BlankNode) -> Self {
        node.0
    }
}

/// RDF literal value
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Literal(OxLiteral);

impl Literal {
    /// Create a simple literal (plain string)
    pub fn new_simple_literal(value: impl Into<String>) -> Self {
        Self(OxLiteral::new_simple_literal(value))
    }

    /// Create a literal with language tag
    pub fn new_language_tagged_literal(
        value: impl Into<String>,
        language: impl Into<String>,
    ) -> RdfResult<Self> {
        OxLiteral::new_language_tagged_literal(value, language)
            .map(Self)
            .map_err(|e| RdfError::InvalidLiteral(e.to_string()))
    }

    /// Create a typed literal
    pub fn new_typed_literal(value: impl Into<String>, datatype: NamedNode) -> Self {
        Self(OxLiteral::new_typed_literal(value, datatype.0))
    }

    /// Get the literal value
    pub fn value(&self) -> &str {
        self.0.value()
    }

    /// Get the language tag if present
    pub fn language(&self) -> Option<&str> {
        self.0.language()
    }

    /// Get the datatype
    pub fn datatype(&self) -> NamedNode {
        NamedNode(self.0.datatype().into_owned())
    }

    /// True for plain or `xsd:string` literals (no language tag)
    pub fn is_plain(&self) -> bool {
        self.0.language().is_none() && self.0.datatype() == xsd::STRING
    }

    /// Numeric value for the XSD numeric datatypes
    pub fn as_f64(&self) -> Option<f64> {
        let datatype = self.0.datatype();
        let numeric = [
            xsd::INTEGER,
            xsd::INT,
            xsd::LONG,
            xsd::DECIMAL,
            xsd::DOUBLE,
            xsd::FLOAT,
        ];
        if numeric.iter().any(|d| *d == datatype) {
            self.value().trim().parse::<f64>().ok()
        } else {
            None
        }
    }

    /// Boolean value for `xsd:boolean` literals
    pub fn as_bool(&self) -> Option<bool> {
        if self.0.datatype() != xsd::BOOLEAN {
            return None;
        }
        match self.value() {
            "true" | "1" => Some(true),
            "false" | "0" => Some(false),
            _ => None,
        }
    }

    /// Whether the literal carries a date or dateTime value
    pub fn is_temporal(&self) -> bool {
        let datatype = self.0.datatype();
        datatype == xsd::DATE || datatype == xsd::DATE_TIME
    }

    /// Whether the literal is a language-tagged string
    pub fn is_lang_string(&self) -> bool {
        self.0.datatype() == rdf::LANG_STRING
    }
}

impl fmt::Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // oxrdf escapes the lexical form the same way SPARQL expects it
        write!(f, "{}", self.0)
    }
}

impl From<OxLiteral> for Literal {
    fn from(lit: OxLiteral) -> Self {
        Self(lit)
    }
}

impl From<Literal> for OxLiteral {
    fn from(lit: Literal) -> Self {
        lit.0
    }
}

/// Any RDF term that can appear in a quad or a solution
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Term {
    NamedNode(NamedNode),
    BlankNode(BlankNode),
    Literal(Literal),
}

impl Term {
    /// Check if this is a named node
    pub fn is_named_node(&self) -> bool {
        matches!(self, Term::NamedNode(_))
    }

    /// Check if this is a blank node
    pub fn is_blank_node(&self) -> bool {
        matches!(self, Term::BlankNode(_))
    }

    /// Check if this is a literal
    pub fn is_literal(&self) -> bool {
        matches!(self, Term::Literal(_))
    }

    pub fn as_named_node(&self) -> Option<&NamedNode> {
        match self {
            Term::NamedNode(n) => Some(n),
            _ => None,
        }
    }

    pub fn as_literal(&self) -> Option<&Literal> {
        match self {
            Term::Literal(l) => Some(l),
            _ => None,
        }
    }

    /// String value as returned by SPARQL `str()`
    pub fn lexical(&self) -> &str {
        match self {
            Term::NamedNode(n) => n.as_str(),
            Term::BlankNode(b) => b.as_str(),
            Term::Literal(l) => l.value(),
        }
    }
}

impl fmt::Display for Term {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Term::NamedNode(n) => write!(f, "{}", n),
            Term::BlankNode(b) => write!(f, "{}", b),
            Term::Literal(l) => write!(f, "{}", l),
        }
    }
}

impl From<NamedNode> for Term {
    fn from(node: NamedNode) -> Self {
        Term::NamedNode(node)
    }
}

impl From<BlankNode> for Term {
    fn from(node: BlankNode) -> Self {
        Term::BlankNode(node)
    }
}

impl From<Literal> for Term {
    fn from(lit: Literal) -> Self {
        Term::Literal(lit)
    }
}

impl TryFrom<OxTerm> for Term {
    type Error = RdfError;

    fn try_from(term: OxTerm) -> RdfResult<Self> {
        match term {
            OxTerm::NamedNode(n) => Ok(Term::NamedNode(n.into())),
            OxTerm::BlankNode(b) => Ok(Term::BlankNode(b.into())),
            OxTerm::Literal(l) => Ok(Term::Literal(l.into())),
            #[allow(unreachable_patterns)]
            other => Err(RdfError::UnsupportedTerm(other.to_string())),
        }
    }
}

impl From<Term> for OxTerm {
    fn from(term: Term) -> Self {
        match term {
            Term::NamedNode(n) => OxTerm::NamedNode(n.0),
            Term::BlankNode(b) => OxTerm::BlankNode(b.0),
            Term::Literal(l) => OxTerm::Literal(l.0),
        }
    }
}

/// RDF quad: a triple scoped to an optional named graph
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Quad {
    /// Subject (named or blank node)
    pub subject: Term,
    /// Predicate
    pub predicate: NamedNode,
    /// Object
    pub object: Term,
    /// Named graph, `None` for the default graph
    pub graph: Option<NamedNode>,
}

impl Quad {
    /// Create a new quad
    pub fn new(
        subject: impl Into<Term>,
        predicate: NamedNode,
        object: impl Into<Term>,
        graph: Option<NamedNode>,
    ) -> Self {
        Self {
            subject: subject.into(),
            predicate,
            object: object.into(),
            graph,
        }
    }

    /// Same statement moved to another graph
    pub fn in_graph(mut self, graph: Option<NamedNode>) -> Self {
        self.graph = graph;
        self
    }
}

impl TryFrom<Quad> for OxQuad {
    type Error = RdfError;

    fn try_from(quad: Quad) -> RdfResult<Self> {
        let subject = match quad.subject {
            Term::NamedNode(n) => OxSubject::NamedNode(n.0),
            Term::BlankNode(b) => OxSubject::BlankNode(b.0),
            Term::Literal(l) => return Err(RdfError::UnsupportedTerm(format!("literal subject {}", l))),
        };
        let graph_name = match quad.graph {
            Some(g) => OxGraphName::NamedNode(g.0),
            None => OxGraphName::DefaultGraph,
        };
        Ok(OxQuad::new(subject, quad.predicate.0, OxTerm::from(quad.object), graph_name))
    }
}

impl TryFrom<OxQuad> for Quad {
    type Error = RdfError;

    fn try_from(quad: OxQuad) -> RdfResult<Self> {
        let subject = Term::try_from(OxTerm::from(quad.subject))?;
        let graph = match quad.graph_name {
            OxGraphName::NamedNode(g) => Some(g.into()),
            OxGraphName::DefaultGraph => None,
            other => return Err(RdfError::UnsupportedTerm(format!("graph name {}", other))),
        };
        Ok(Quad {
            subject,
            predicate: quad.predicate.into(),
            object: Term::try_from(quad.object)?,
            graph,
        })
    }
}

impl fmt::Display for Quad {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.graph {
            Some(g) => write!(f, "{} {} {} {} .", self.subject, self.predicate, self.object, g),
            None => write!(f, "{} {} {} .", self.subject, self.predicate, self.object),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_named_node() {
        let node = NamedNode::new("http://example.org/alice").unwrap();
        assert_eq!(node.as_str(), "http://example.org/alice");
        assert_eq!(node.to_string(), "<http://example.org/alice>");
        assert_eq!(node.local_name(), "alice");
    }

    #[test]
    fn test_invalid_iri() {
        assert!(matches!(NamedNode::new("not an iri"), Err(RdfError::InvalidIri(_))));
    }

    #[test]
    fn test_literal() {
        let lit = Literal::new_simple_literal("Alice");
        assert_eq!(lit.value(), "Alice");
        assert!(lit.is_plain());
        assert_eq!(lit.to_string(), "\"Alice\"");

        let lang = Literal::new_language_tagged_literal("Bonjour", "fr").unwrap();
        assert_eq!(lang.language(), Some("fr"));
        assert!(lang.is_lang_string());
        assert_eq!(lang.to_string(), "\"Bonjour\"@fr");

        let typed = Literal::new_typed_literal("30", xsd::INTEGER.into());
        assert_eq!(typed.as_f64(), Some(30.0));
        assert_eq!(
            typed.to_string(),
            "\"30\"^^<http://www.w3.org/2001/XMLSchema#integer>"
        );
    }

    #[test]
    fn test_literal_escaping() {
        let lit = Literal::new_simple_literal("say \"hi\"");
        assert_eq!(lit.to_string(), "\"say \\\"hi\\\"\"");
    }

    #[test]
    fn test_quad_conversion() {
        let quad = Quad::new(
            NamedNode::new("http://example.org/alice").unwrap(),
            NamedNode::new("http://xmlns.com/foaf/0.1/name").unwrap(),
            Literal::new_language_tagged_literal("Alice", "en").unwrap(),
            Some(NamedNode::new("http://example.org/g").unwrap()),
        );
        let ox = OxQuad::try_from(quad.clone()).unwrap();
        assert_eq!(ox.graph_name.to_string(), "<http://example.org/g>");
        assert_eq!(Quad::try_from(ox).unwrap(), quad);

        let literal_subject = Quad::new(
            Literal::new_simple_literal("x"),
            NamedNode::new("http://xmlns.com/foaf/0.1/name").unwrap(),
            Literal::new_simple_literal("y"),
            None,
        );
        assert!(matches!(OxQuad::try_from(literal_subject), Err(RdfError::UnsupportedTerm(_))));
    }

    #[test]
    fn test_blank_node_keeps_store_label() {
        let node = BlankNode::from(OxBlankNode::new("b0").unwrap());
        assert_eq!(node.as_str(), "b0");
        assert_eq!(node.to_string(), "_:b0");
        assert_eq!(OxBlankNode::from(node).as_str(), "b0");
    }

    #[test]
    fn test_quad_display() {
        let quad = Quad::new(
            NamedNode::new("http://example.org/alice").unwrap(),
            NamedNode::new("http://xmlns.com/foaf/0.1/name").unwrap(),
            Literal::new_simple_literal("Alice"),
            Some(NamedNode::new("http://example.org/g").unwrap()),
        );
        assert_eq!(
            quad.to_string(),
            "<http://example.org/alice> <http://xmlns.com/foaf/0.1/name> \"Alice\" <http://example.org/g> ."
        );
    }
}
