//! Batched existence checks over several (rdf:type, graph) candidates
//!
//! A URI matches when it is typed, in the candidate graph, with the candidate
//! type or one of its subclasses, for at least one candidate. The URI list is
//! re-read from the supplier for every stream and split into `VALUES`
//! batches that are sent lazily, one batch at a time.

use super::algebra::{named, rdf_type, sub_class_of_any, union, values, variable, GroupBuilder};
use super::results::QuerySolution;
use crate::error::{MappingError, MappingResult};
use crate::model::ResourceModel;
use crate::rdf::{NamedNode, Term};
use crate::store::{SolutionStream, TripleStore};
use indexmap::{IndexMap, IndexSet};
use spargebra::algebra::{Expression, GraphPattern};
use spargebra::Query;
use std::collections::HashSet;
use tracing::debug;

const URI_VARIABLE: &str = "uri";
const TYPE_VARIABLE: &str = "rdf_type";

type UriSupplier<'a> = Box<dyn Fn() -> Vec<String> + 'a>;

/// Stream of URIs produced batch by batch
pub type UriStream<'s> = Box<dyn Iterator<Item = MappingResult<String>> + 's>;

/// Stream of matched resources (URI and rdf:type)
pub type ResourceStream<'s> = Box<dyn Iterator<Item = MappingResult<ResourceModel>> + 's>;

/// Existence query over many URIs and many (type, graph) candidates
pub struct MultiGraphQuery<'a> {
    types_and_graphs: IndexMap<NamedNode, NamedNode>,
    supplier: UriSupplier<'a>,
    size: usize,
    batch_size: usize,
}

impl<'a> MultiGraphQuery<'a> {
    /// Create a query.
    ///
    /// `size` must be positive and equal to the number of distinct URIs the
    /// supplier yields.
    pub fn new<F, I>(
        types_and_graphs: IndexMap<String, String>,
        supplier: F,
        size: usize,
        batch_size: usize,
    ) -> MappingResult<Self>
    where
        F: Fn() -> I + 'a,
        I: IntoIterator<Item = String>,
    {
        if size == 0 {
            return Err(MappingError::InvalidConfiguration(
                "URI list size must be positive".to_string(),
            ));
        }
        if batch_size == 0 {
            return Err(MappingError::InvalidConfiguration(
                "batch size must be positive".to_string(),
            ));
        }
        let mut candidates = IndexMap::new();
        for (rdf_type, graph) in &types_and_graphs {
            candidates.insert(NamedNode::new(rdf_type)?, NamedNode::new(graph)?);
        }

        let query = Self {
            types_and_graphs: candidates,
            supplier: Box::new(move || supplier().into_iter().collect()),
            size,
            batch_size,
        };
        let distinct = query.uris()?.len();
        if distinct != size {
            return Err(MappingError::InvalidConfiguration(format!(
                "declared {} URIs but the supplier yields {} distinct URIs",
                size, distinct
            )));
        }
        Ok(query)
    }

    /// Query over a fixed URI list
    pub fn from_uris(
        types_and_graphs: IndexMap<String, String>,
        uris: Vec<String>,
        batch_size: usize,
    ) -> MappingResult<Self> {
        let size = uris
            .iter()
            .map(|u| u.trim().to_string())
            .collect::<HashSet<_>>()
            .len();
        Self::new(types_and_graphs, move || uris.clone(), size, batch_size)
    }

    pub fn size(&self) -> usize {
        self.size
    }

    /// Distinct URIs from the supplier, in supply order
    fn uris(&self) -> MappingResult<Vec<NamedNode>> {
        let distinct: IndexSet<String> = (self.supplier)()
            .into_iter()
            .map(|u| u.trim().to_string())
            .collect();
        distinct
            .iter()
            .map(|u| NamedNode::new(u).map_err(MappingError::from))
            .collect()
    }

    fn batches(&self) -> MappingResult<Vec<Vec<NamedNode>>> {
        Ok(self
            .uris()?
            .chunks(self.batch_size)
            .map(|chunk| chunk.to_vec())
            .collect())
    }

    /// Pattern binding `?uri` and `?rdf_type` for any candidate
    fn match_pattern(&self) -> GraphPattern {
        let uri = variable(URI_VARIABLE);
        let type_variable = variable(TYPE_VARIABLE);
        let type_triple = |group: &mut GroupBuilder| {
            group.triple(uri.clone(), named(&rdf_type()), type_variable.clone());
        };

        let branches = self
            .types_and_graphs
            .iter()
            .map(|(candidate_type, graph)| {
                let mut scoped = GroupBuilder::new();
                type_triple(&mut scoped);
                let mut branch = GroupBuilder::new();
                branch.graph(graph, scoped).path(
                    type_variable.clone(),
                    sub_class_of_any(),
                    named(candidate_type),
                );
                branch.build()
            })
            .collect();

        union(branches).unwrap_or_else(|| {
            let mut group = GroupBuilder::new();
            type_triple(&mut group);
            group.build()
        })
    }

    fn values(uris: &[NamedNode]) -> MappingResult<GraphPattern> {
        let terms: Vec<Term> = uris.iter().cloned().map(Term::from).collect();
        values(variable(URI_VARIABLE), &terms)
    }

    /// Select of the URIs of a batch that match a candidate
    pub fn build_existing_query(&self, uris: &[NamedNode]) -> MappingResult<Query> {
        let mut group = GroupBuilder::new();
        group.push(Self::values(uris)?).push(self.match_pattern());
        Ok(distinct_select(
            group.build(),
            vec![variable(URI_VARIABLE), variable(TYPE_VARIABLE)],
        ))
    }

    /// Select of the URIs of a batch that match no candidate
    pub fn build_unknown_query(&self, uris: &[NamedNode]) -> MappingResult<Query> {
        let mut group = GroupBuilder::new();
        group
            .push(Self::values(uris)?)
            .filter(Expression::Not(Box::new(Expression::Exists(Box::new(
                self.match_pattern(),
            )))));
        Ok(distinct_select(group.build(), vec![variable(URI_VARIABLE)]))
    }

    /// Matching resources, one per URI
    pub fn results_as_stream<'s, S>(&'s self, store: &'s S) -> MappingResult<ResourceStream<'s>>
    where
        S: TripleStore + ?Sized,
    {
        let solutions = BatchStream::new(store, self.batches()?, move |batch| {
            self.build_existing_query(batch)
        });
        let mut seen = HashSet::new();
        let resources = solutions.filter_map(move |solution| {
            let solution = match solution {
                Ok(s) => s,
                Err(e) => return Some(Err(e)),
            };
            let uri = solution.get(URI_VARIABLE)?.lexical().to_string();
            if !seen.insert(uri.clone()) {
                return None;
            }
            let mut resource = ResourceModel::with_uri(uri);
            if let Some(Term::NamedNode(rdf_type)) = solution.get(TYPE_VARIABLE) {
                if let Err(e) = resource.set_rdf_type(rdf_type.as_str()) {
                    return Some(Err(e));
                }
            }
            Some(Ok(resource))
        });
        Ok(Box::new(resources))
    }

    /// URIs that match a candidate
    pub fn get_existing_stream<'s, S>(&'s self, store: &'s S) -> MappingResult<UriStream<'s>>
    where
        S: TripleStore + ?Sized,
    {
        let resources = self.results_as_stream(store)?;
        Ok(Box::new(resources.map(|r| {
            r.map(|resource| resource.uri().unwrap_or_default().to_string())
        })))
    }

    /// URIs that match no candidate
    pub fn get_unknown_stream<'s, S>(&'s self, store: &'s S) -> MappingResult<UriStream<'s>>
    where
        S: TripleStore + ?Sized,
    {
        let solutions = BatchStream::new(store, self.batches()?, move |batch| {
            self.build_unknown_query(batch)
        });
        Ok(Box::new(solutions.filter_map(|solution| match solution {
            Ok(s) => s.get(URI_VARIABLE).map(|t| Ok(t.lexical().to_string())),
            Err(e) => Some(Err(e)),
        })))
    }

    /// Fail with [`MappingError::InvalidUriList`] listing every unknown URI
    pub fn check_unknowns<S>(&self, store: &S) -> MappingResult<()>
    where
        S: TripleStore + ?Sized,
    {
        let unknowns = self
            .get_unknown_stream(store)?
            .collect::<MappingResult<Vec<_>>>()?;
        if unknowns.is_empty() {
            Ok(())
        } else {
            Err(MappingError::InvalidUriList(unknowns))
        }
    }

    /// All matched resources, or [`MappingError::InvalidUriList`] with the
    /// URIs that were not matched
    pub fn get_results<S>(&self, store: &S) -> MappingResult<Vec<ResourceModel>>
    where
        S: TripleStore + ?Sized,
    {
        let results = self
            .results_as_stream(store)?
            .collect::<MappingResult<Vec<_>>>()?;
        let found: HashSet<&str> = results.iter().filter_map(|r| r.uri()).collect();
        let missing: Vec<String> = self
            .uris()?
            .iter()
            .map(|u| u.as_str())
            .filter(|u| !found.contains(u))
            .map(str::to_string)
            .collect();
        if missing.is_empty() {
            Ok(results)
        } else {
            Err(MappingError::InvalidUriList(missing))
        }
    }
}

fn distinct_select(pattern: GraphPattern, variables: Vec<spargebra::term::Variable>) -> Query {
    Query::Select {
        dataset: None,
        pattern: GraphPattern::Distinct {
            inner: Box::new(GraphPattern::Project {
                inner: Box::new(pattern),
                variables,
            }),
        },
        base_iri: None,
    }
}

/// Runs one select per batch, only when the previous batch is exhausted
pub(crate) struct BatchStream<'s, S: ?Sized, F> {
    store: &'s S,
    batches: std::vec::IntoIter<Vec<NamedNode>>,
    build: F,
    current: Option<SolutionStream<'s>>,
}

impl<'s, S, F> BatchStream<'s, S, F>
where
    S: TripleStore + ?Sized,
    F: Fn(&[NamedNode]) -> MappingResult<Query>,
{
    pub(crate) fn new(store: &'s S, batches: Vec<Vec<NamedNode>>, build: F) -> Self {
        Self {
            store,
            batches: batches.into_iter(),
            build,
            current: None,
        }
    }
}

impl<'s, S, F> Iterator for BatchStream<'s, S, F>
where
    S: TripleStore + ?Sized,
    F: Fn(&[NamedNode]) -> MappingResult<Query>,
{
    type Item = MappingResult<QuerySolution>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(current) = self.current.as_mut() {
                match current.next() {
                    Some(row) => return Some(row.map_err(MappingError::from)),
                    None => self.current = None,
                }
            }
            let batch = self.batches.next()?;
            debug!("Querying batch of {} URIs", batch.len());
            let query = match (self.build)(&batch) {
                Ok(query) => query,
                Err(e) => return Some(Err(e)),
            };
            match self.store.select(&query) {
                Ok(stream) => self.current = Some(stream),
                Err(e) => return Some(Err(e.into())),
            }
        }
    }
}
