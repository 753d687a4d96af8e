//! Typed property values and their RDF literal encoding
//!
//! Supports:
//! - String and language-tagged string
//! - Integer (i64) and Double (f64)
//! - Boolean
//! - Date and DateTime
//! - Uri (object references)

use crate::rdf::{vocab, Literal, NamedNode, RdfResult, Term};
use chrono::{DateTime, FixedOffset, NaiveDate};
use std::fmt;

/// Declared datatype of a property
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Datatype {
    String,
    LangString,
    Integer,
    Double,
    Boolean,
    Date,
    DateTime,
    Uri,
}

impl Datatype {
    /// XSD datatype IRI for literal datatypes
    pub fn xsd_iri(&self) -> Option<String> {
        let local = match self {
            Datatype::String => "string",
            Datatype::Integer => "integer",
            Datatype::Double => "double",
            Datatype::Boolean => "boolean",
            Datatype::Date => "date",
            Datatype::DateTime => "dateTime",
            Datatype::LangString | Datatype::Uri => return None,
        };
        Some(format!("{}{}", vocab::XSD, local))
    }

    pub fn is_literal(&self) -> bool {
        !matches!(self, Datatype::Uri)
    }

    pub fn name(&self) -> &'static str {
        match self {
            Datatype::String => "String",
            Datatype::LangString => "LangString",
            Datatype::Integer => "Integer",
            Datatype::Double => "Double",
            Datatype::Boolean => "Boolean",
            Datatype::Date => "Date",
            Datatype::DateTime => "DateTime",
            Datatype::Uri => "Uri",
        }
    }
}

/// Property value stored on a model field
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    String(String),
    LangString { value: String, lang: String },
    Integer(i64),
    Double(f64),
    Boolean(bool),
    Date(NaiveDate),
    DateTime(DateTime<FixedOffset>),
    Uri(String),
}

impl Value {
    /// Get string value if this is a string (plain or language-tagged)
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            Value::LangString { value, .. } => Some(value),
            _ => None,
        }
    }

    /// Consume into a string (plain or language-tagged)
    pub fn into_string(self) -> Option<String> {
        match self {
            Value::String(s) => Some(s),
            Value::LangString { value, .. } => Some(value),
            _ => None,
        }
    }

    pub fn as_integer(&self) -> Option<i64> {
        match self {
            Value::Integer(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_double(&self) -> Option<f64> {
        match self {
            Value::Double(d) => Some(*d),
            Value::Integer(i) => Some(*i as f64),
            _ => None,
        }
    }

    pub fn as_boolean(&self) -> Option<bool> {
        match self {
            Value::Boolean(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_date(&self) -> Option<NaiveDate> {
        match self {
            Value::Date(d) => Some(*d),
            _ => None,
        }
    }

    pub fn as_datetime(&self) -> Option<DateTime<FixedOffset>> {
        match self {
            Value::DateTime(dt) => Some(*dt),
            _ => None,
        }
    }

    pub fn as_uri(&self) -> Option<&str> {
        match self {
            Value::Uri(u) => Some(u),
            _ => None,
        }
    }

    /// Consume into a URI string
    pub fn into_uri(self) -> Option<String> {
        match self {
            Value::Uri(u) => Some(u),
            _ => None,
        }
    }

    /// Datatype carried by the value itself
    pub fn datatype(&self) -> Datatype {
        match self {
            Value::String(_) => Datatype::String,
            Value::LangString { .. } => Datatype::LangString,
            Value::Integer(_) => Datatype::Integer,
            Value::Double(_) => Datatype::Double,
            Value::Boolean(_) => Datatype::Boolean,
            Value::Date(_) => Datatype::Date,
            Value::DateTime(_) => Datatype::DateTime,
            Value::Uri(_) => Datatype::Uri,
        }
    }

    /// Whether this value can be stored in a field declared as `datatype`
    pub fn fits(&self, datatype: Datatype) -> bool {
        match (self.datatype(), datatype) {
            (a, b) if a == b => true,
            (Datatype::String, Datatype::LangString) => true,
            (Datatype::Integer, Datatype::Double) => true,
            _ => false,
        }
    }

    /// Encode as an RDF term
    pub fn to_term(&self) -> RdfResult<Term> {
        let typed = |lexical: String, datatype: Datatype| -> RdfResult<Term> {
            let iri = datatype.xsd_iri().unwrap_or_default();
            Ok(Literal::new_typed_literal(lexical, NamedNode::new(&iri)?).into())
        };
        match self {
            Value::String(s) => Ok(Literal::new_simple_literal(s.clone()).into()),
            Value::LangString { value, lang } if lang.is_empty() => {
                Ok(Literal::new_simple_literal(value.clone()).into())
            }
            Value::LangString { value, lang } => {
                Ok(Literal::new_language_tagged_literal(value.clone(), lang.clone())?.into())
            }
            Value::Integer(i) => typed(i.to_string(), Datatype::Integer),
            Value::Double(d) => typed(d.to_string(), Datatype::Double),
            Value::Boolean(b) => typed(b.to_string(), Datatype::Boolean),
            Value::Date(d) => typed(d.format("%Y-%m-%d").to_string(), Datatype::Date),
            Value::DateTime(dt) => typed(dt.to_rfc3339(), Datatype::DateTime),
            Value::Uri(u) => Ok(NamedNode::new(u)?.into()),
        }
    }

    /// Decode a term read from the store as the declared datatype.
    /// Returns `None` when the term cannot represent that datatype.
    pub fn from_term(term: &Term, datatype: Datatype) -> Option<Self> {
        if datatype == Datatype::Uri {
            return term.as_named_node().map(|n| Value::Uri(n.as_str().to_string()));
        }
        let literal = term.as_literal()?;
        let lexical = literal.value().trim();
        match datatype {
            Datatype::String => Some(Value::String(literal.value().to_string())),
            Datatype::LangString => Some(match literal.language() {
                Some(lang) => Value::LangString {
                    value: literal.value().to_string(),
                    lang: lang.to_string(),
                },
                None => Value::String(literal.value().to_string()),
            }),
            Datatype::Integer => lexical.parse().ok().map(Value::Integer),
            Datatype::Double => lexical.parse().ok().map(Value::Double),
            Datatype::Boolean => match lexical {
                "true" | "1" => Some(Value::Boolean(true)),
                "false" | "0" => Some(Value::Boolean(false)),
                _ => None,
            },
            Datatype::Date => NaiveDate::parse_from_str(lexical, "%Y-%m-%d")
                .ok()
                .map(Value::Date),
            Datatype::DateTime => DateTime::parse_from_rfc3339(lexical)
                .ok()
                .map(Value::DateTime),
            Datatype::Uri => None,
        }
    }

    /// Decode a term without a declared datatype, reading the literal
    /// datatype IRI. Blank nodes have no value.
    pub fn infer(term: &Term) -> Option<Self> {
        let datatype = match term {
            Term::NamedNode(_) => Datatype::Uri,
            Term::BlankNode(_) => return None,
            Term::Literal(literal) if literal.is_lang_string() => Datatype::LangString,
            Term::Literal(literal) => {
                let iri = literal.datatype();
                let local = iri.as_str().strip_prefix(vocab::XSD).unwrap_or_default();
                match local {
                    "integer" | "int" | "long" | "short" => Datatype::Integer,
                    "double" | "float" | "decimal" => Datatype::Double,
                    "boolean" => Datatype::Boolean,
                    "date" => Datatype::Date,
                    "dateTime" => Datatype::DateTime,
                    _ => Datatype::String,
                }
            }
        };
        Value::from_term(term, datatype).or_else(|| {
            term.as_literal()
                .map(|literal| Value::String(literal.value().to_string()))
        })
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::String(s) => write!(f, "\"{}\"", s),
            Value::LangString { value, lang } => write!(f, "\"{}\"@{}", value, lang),
            Value::Integer(i) => write!(f, "{}", i),
            Value::Double(d) => write!(f, "{}", d),
            Value::Boolean(b) => write!(f, "{}", b),
            Value::Date(d) => write!(f, "{}", d),
            Value::DateTime(dt) => write!(f, "{}", dt.to_rfc3339()),
            Value::Uri(u) => write!(f, "<{}>", u),
        }
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Integer(i)
    }
}

impl From<f64> for Value {
    fn from(d: f64) -> Self {
        Value::Double(d)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Boolean(b)
    }
}

impl From<NaiveDate> for Value {
    fn from(d: NaiveDate) -> Self {
        Value::Date(d)
    }
}
