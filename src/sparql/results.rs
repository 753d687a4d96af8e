//! SPARQL query results

use crate::rdf::{RdfError, Term};
use indexmap::IndexMap;

/// Query solution (variable bindings)
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QuerySolution {
    /// Variable name → RDF term bindings
    bindings: IndexMap<String, Term>,
}

impl QuerySolution {
    /// Create a new query solution
    pub fn new() -> Self {
        Self::default()
    }

    /// Get a binding
    pub fn get(&self, variable: &str) -> Option<&Term> {
        self.bindings.get(variable)
    }

    /// Add a binding
    pub fn bind(&mut self, variable: impl Into<String>, term: Term) {
        self.bindings.insert(variable.into(), term);
    }

    /// Builder-style binding
    pub fn with(mut self, variable: impl Into<String>, term: impl Into<Term>) -> Self {
        self.bind(variable, term.into());
        self
    }

    pub fn contains(&self, variable: &str) -> bool {
        self.bindings.contains_key(variable)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Term)> {
        self.bindings.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }

    /// Keep only the given variables
    pub fn project(&self, variables: &[&str]) -> Self {
        let bindings = variables
            .iter()
            .filter_map(|v| self.bindings.get(*v).map(|t| (v.to_string(), t.clone())))
            .collect();
        Self { bindings }
    }
}

impl TryFrom<sparesults::QuerySolution> for QuerySolution {
    type Error = RdfError;

    fn try_from(solution: sparesults::QuerySolution) -> Result<Self, Self::Error> {
        let mut row = Self::new();
        for (variable, term) in solution.iter() {
            row.bind(variable.as_str(), Term::try_from(term.clone())?);
        }
        Ok(row)
    }
}
