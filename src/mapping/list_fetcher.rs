//! Batched hydration of multi-valued properties
//!
//! Select rows carry scalar fields only. After a page of models is loaded the
//! fetcher runs one `VALUES` query per requested field and per batch of
//! identifiers, and replaces each model's collection with what the store
//! returned. Running it twice over the same page gives the same collections.

use super::{mapper::decode, ModelMapper, SparqlModel};
use crate::config::DEFAULT_BATCH_SIZE;
use crate::error::{MappingError, MappingResult};
use crate::rdf::{NamedNode, Term};
use crate::sparql::QuerySynthesizer;
use crate::store::TripleStore;
use indexmap::IndexSet;
use rustc_hash::{FxHashMap, FxHashSet};
use std::sync::Arc;
use tracing::debug;

/// Loads list fields for a page of models of one type
pub struct ListFetcher<T: SparqlModel> {
    mapper: Arc<ModelMapper<T>>,
    fields: Vec<String>,
    batch_size: usize,
}

impl<T: SparqlModel> ListFetcher<T> {
    /// Fetcher for `fields`, which must be declared multi-valued fields of `T`
    pub fn new<I, F>(fields: I) -> MappingResult<Self>
    where
        I: IntoIterator<Item = F>,
        F: Into<String>,
    {
        let mapper = super::mapper::<T>()?;
        let descriptor = mapper.descriptor();

        let fields: IndexSet<String> = fields.into_iter().map(Into::into).collect();
        if fields.is_empty() {
            return Err(MappingError::IllegalArgument(
                "list fetcher needs at least one field".to_string(),
            ));
        }
        for field in &fields {
            match descriptor.property(field) {
                Some(p) if p.is_list() => {}
                Some(_) => {
                    return Err(MappingError::IllegalArgument(format!(
                        "field {} of {} is not multi-valued",
                        field,
                        descriptor.type_name()
                    )))
                }
                None => {
                    return Err(MappingError::IllegalArgument(format!(
                        "{} has no field {}",
                        descriptor.type_name(),
                        field
                    )))
                }
            }
        }

        Ok(Self {
            mapper,
            fields: fields.into_iter().collect(),
            batch_size: DEFAULT_BATCH_SIZE,
        })
    }

    /// Fetcher for every multi-valued field of `T`, `None` when it has none
    pub fn all_fields() -> MappingResult<Option<Self>> {
        let descriptor = super::describe::<T>()?;
        let fields: Vec<String> = descriptor.list_properties().map(|p| p.field.clone()).collect();
        if fields.is_empty() {
            return Ok(None);
        }
        Self::new(fields).map(Some)
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> MappingResult<Self> {
        if batch_size == 0 {
            return Err(MappingError::InvalidConfiguration(
                "batch size must be positive".to_string(),
            ));
        }
        self.batch_size = batch_size;
        Ok(self)
    }

    pub fn fields(&self) -> &[String] {
        &self.fields
    }

    /// Replace the requested collections of every model in `models`
    pub fn update_models<S>(&self, store: &S, models: &mut [T]) -> MappingResult<()>
    where
        S: TripleStore + ?Sized,
    {
        if models.is_empty() {
            return Ok(());
        }

        let mut uris: Vec<NamedNode> = Vec::with_capacity(models.len());
        let mut seen = FxHashSet::default();
        for model in models.iter() {
            let uri = self.mapper.uri_of(model)?;
            if !seen.insert(uri.clone()) {
                return Err(MappingError::IllegalArgument(format!(
                    "duplicate URI {} in page",
                    uri.as_str()
                )));
            }
            uris.push(uri);
        }

        let descriptor = self.mapper.descriptor();
        let synthesizer = QuerySynthesizer::new(descriptor);
        let identifier = descriptor.identifier();

        for field in &self.fields {
            let Some(property) = descriptor.property(field) else {
                continue;
            };
            let mut values: FxHashMap<String, IndexSet<Term>> = FxHashMap::default();

            for batch in uris.chunks(self.batch_size) {
                let query = synthesizer.build_list_values(field, batch)?;
                debug!(
                    "Fetching {}.{} for {} URIs",
                    descriptor.type_name(),
                    field,
                    batch.len()
                );
                for row in store.select(&query)? {
                    let row = row?;
                    if let (Some(uri), Some(value)) = (row.get(identifier), row.get(field)) {
                        values
                            .entry(uri.lexical().to_string())
                            .or_default()
                            .insert(value.clone());
                    }
                }
            }

            for (model, uri) in models.iter_mut().zip(&uris) {
                let decoded = values
                    .remove(uri.as_str())
                    .unwrap_or_default()
                    .iter()
                    .map(|term| decode(property, term))
                    .collect::<MappingResult<Vec<_>>>()?;
                self.mapper.set_list(model, field, decoded)?;
            }
        }
        Ok(())
    }
}
