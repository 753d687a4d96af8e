//! CRUD façade over a [`TripleStore`]
//!
//! Wires the registry, the synthesizer, the list fetcher and the multi-graph
//! query together for model types. Every method is synchronous and issues
//! its queries on the caller's thread.

use crate::config::EngineConfig;
use crate::error::{MappingError, MappingResult};
use crate::mapping::{mapper, DescriptorRegistry, ListFetcher, ModelMapper, SparqlModel};
use crate::model::{Relation, Value};
use crate::rdf::{NamedNode, NamespaceManager};
use crate::sparql::{Filter, MultiGraphQuery, QuerySynthesizer, SelectOptions, COUNT_VARIABLE};
use crate::sparql::Update;
use crate::store::{run_in_transaction, StoreResult, TripleStore};
use indexmap::{IndexMap, IndexSet};
use rustc_hash::FxHashSet;
use tracing::{debug, info};

/// One page of search results with the total match count
#[derive(Debug, Clone, PartialEq)]
pub struct ListWithPagination<T> {
    pub items: Vec<T>,
    pub total: usize,
    pub page: i64,
    pub page_size: i64,
}

/// Why a reference of a model failed validation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViolationReason {
    /// Required reference field without value
    MissingRequiredValue,
    /// Value is not a usable URI
    InvalidUri,
    /// No resource of the referenced type exists in the referenced graph
    UnknownReference,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReferenceViolation {
    pub field: String,
    pub uri: Option<String>,
    pub reason: ViolationReason,
}

impl ReferenceViolation {
    fn new(field: &str, uri: Option<String>, reason: ViolationReason) -> Self {
        Self {
            field: field.to_string(),
            uri,
            reason,
        }
    }
}

/// Model-level operations against one store
pub struct SparqlService<S: TripleStore> {
    store: S,
    config: EngineConfig,
    namespaces: NamespaceManager,
}

impl<S: TripleStore> SparqlService<S> {
    pub fn new(store: S) -> Self {
        let config = EngineConfig::default();
        let namespaces = config.namespaces();
        Self {
            store,
            config,
            namespaces,
        }
    }

    pub fn with_config(store: S, config: EngineConfig) -> MappingResult<Self> {
        config.validate()?;
        let namespaces = config.namespaces();
        Ok(Self {
            store,
            config,
            namespaces,
        })
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn namespaces(&self) -> &NamespaceManager {
        &self.namespaces
    }

    /// Run `work` in a transaction unless the calling thread already has one
    /// open, in which case `work` joins it
    pub fn transactional<R>(&self, work: impl FnOnce() -> MappingResult<R>) -> MappingResult<R> {
        if self.store.in_transaction() {
            return work();
        }
        run_in_transaction(&self.store, |_| work())
    }

    fn normalize(&self, uri: &str) -> MappingResult<NamedNode> {
        let uri = self.namespaces.normalize_uri(uri)?;
        Ok(NamedNode::new(&uri)?)
    }

    fn with_default_lang(&self, options: &SelectOptions) -> SelectOptions {
        let mut options = options.clone();
        if options.lang.is_none() {
            options.lang = self.config.default_lang.clone();
        }
        options
    }

    /// Give the model a normalized or generated URI and its rdf:type
    fn prepare<T: SparqlModel>(&self, mapper: &ModelMapper<T>, model: &mut T) -> MappingResult<NamedNode> {
        let uri = match model.resource().uri() {
            Some(uri) => self.normalize(uri)?,
            None => loop {
                let candidate = NamedNode::new(&mapper.generate_uri(&self.config.uri_base))?;
                if !self.exists_anywhere(&candidate)? {
                    break candidate;
                }
                debug!("Generated URI {} is taken, retrying", candidate.as_str());
            },
        };
        model.resource_mut().set_uri(uri.as_str());
        if model.resource().rdf_type().is_none() {
            model
                .resource_mut()
                .set_rdf_type(mapper.descriptor().rdf_type().as_str())?;
        }
        Ok(uri)
    }

    /// Insert a new instance, generating its URI when absent
    pub fn create<T: SparqlModel>(&self, model: &mut T) -> MappingResult<()> {
        let mapper = mapper::<T>()?;
        let uri = self.prepare(&mapper, model)?;
        let synthesizer = QuerySynthesizer::new(mapper.descriptor());

        if self.exists_anywhere(&uri)? {
            return Err(MappingError::DuplicateUri(uri.as_str().to_string()));
        }
        self.store
            .update(&synthesizer.build_insert(mapper.to_quads(model)?)?)?;
        debug!("Created {} {}", mapper.descriptor().type_name(), uri.as_str());
        Ok(())
    }

    /// Insert several instances in one transaction
    pub fn create_all<T: SparqlModel>(&self, models: &mut [T]) -> MappingResult<()> {
        let mapper = mapper::<T>()?;
        let synthesizer = QuerySynthesizer::new(mapper.descriptor());

        self.transactional(|| {
            let mut seen = FxHashSet::default();
            let mut quads = Vec::new();
            for model in models.iter_mut() {
                let uri = self.prepare(&mapper, model)?;
                if !seen.insert(uri.clone()) || self.exists_anywhere(&uri)? {
                    return Err(MappingError::DuplicateUri(uri.as_str().to_string()));
                }
                quads.extend(mapper.to_quads(model)?);
            }
            self.store.update(&synthesizer.build_insert(quads)?)?;
            info!(
                "Created {} instances of {}",
                models.len(),
                mapper.descriptor().type_name()
            );
            Ok(())
        })
    }

    /// Create `model` and run a secondary write in the same transaction.
    ///
    /// When `after` fails the creation is rolled back.
    pub fn create_with<T, F>(&self, model: &mut T, after: F) -> MappingResult<()>
    where
        T: SparqlModel,
        F: FnOnce(&T) -> MappingResult<()>,
    {
        self.transactional(|| {
            self.create(model)?;
            after(model)
        })
    }

    /// Instance with scalar fields loaded, `None` when absent
    pub fn get_by_uri<T: SparqlModel>(&self, uri: &str, lang: Option<&str>) -> MappingResult<Option<T>> {
        let uri = self.normalize(uri)?;
        let descriptor = mapper::<T>()?.descriptor().clone();
        let mut options = SelectOptions::new().filter(Filter::equals(
            descriptor.identifier(),
            Value::Uri(uri.as_str().to_string()),
        ));
        options.lang = lang.map(str::to_string);
        Ok(self.search(&options)?.into_iter().next())
    }

    /// Instance with scalar and multi-valued fields and its relations loaded
    pub fn load_by_uri<T: SparqlModel>(&self, uri: &str, lang: Option<&str>) -> MappingResult<Option<T>> {
        let Some(mut model) = self.get_by_uri::<T>(uri, lang)? else {
            return Ok(None);
        };
        let mapper = mapper::<T>()?;
        let relations = self.stored_relations::<T>(&mapper, &mapper.uri_of(&model)?)?;
        model.resource_mut().set_relations(relations);

        let mut models = [model];
        if let Some(fetcher) = ListFetcher::<T>::all_fields()? {
            fetcher
                .with_batch_size(self.config.batch_size)?
                .update_models(&self.store, &mut models)?;
        }
        let [model] = models;
        Ok(Some(model))
    }

    /// Instances in the order of `uris`; fails with the URIs not found
    pub fn get_list_by_uris<T: SparqlModel>(&self, uris: &[String], lang: Option<&str>) -> MappingResult<Vec<T>> {
        let wanted: IndexSet<String> = uris
            .iter()
            .map(|u| self.normalize(u).map(|n| n.as_str().to_string()))
            .collect::<MappingResult<_>>()?;
        if wanted.is_empty() {
            return Ok(Vec::new());
        }

        let descriptor = mapper::<T>()?.descriptor().clone();
        let wanted_list: Vec<&String> = wanted.iter().collect();
        let mut found: IndexMap<String, T> = IndexMap::new();
        for batch in wanted_list.chunks(self.config.batch_size) {
            let mut options = SelectOptions::new().filter(Filter::one_of(
                descriptor.identifier(),
                batch.iter().map(|u| Value::Uri((*u).clone())).collect(),
            ));
            options.lang = lang.map(str::to_string);
            for model in self.search::<T>(&options)? {
                if let Some(uri) = model.resource().uri() {
                    found.insert(uri.to_string(), model);
                }
            }
        }

        let missing: Vec<String> = wanted.iter().filter(|u| !found.contains_key(*u)).cloned().collect();
        if !missing.is_empty() {
            return Err(MappingError::InvalidUriList(missing));
        }
        Ok(wanted.iter().filter_map(|u| found.shift_remove(u)).collect())
    }

    /// [`get_list_by_uris`](Self::get_list_by_uris) with multi-valued fields
    /// loaded
    pub fn load_list_by_uris<T: SparqlModel>(&self, uris: &[String], lang: Option<&str>) -> MappingResult<Vec<T>> {
        let mut models = self.get_list_by_uris::<T>(uris, lang)?;
        if models.is_empty() {
            return Ok(models);
        }
        if let Some(fetcher) = ListFetcher::<T>::all_fields()? {
            fetcher
                .with_batch_size(self.config.batch_size)?
                .update_models(&self.store, &mut models)?;
        }
        Ok(models)
    }

    /// The instance whose `field` equals `value`, `None` when there is none.
    ///
    /// Fails with [`MappingError::NotUnique`] when several instances match.
    pub fn get_by_unique_property_value<T: SparqlModel>(
        &self,
        field: &str,
        value: impl Into<Value>,
        lang: Option<&str>,
    ) -> MappingResult<Option<T>> {
        let value = value.into();
        let mut options = SelectOptions::new().filter(Filter::equals(field, value.clone()));
        options.lang = lang.map(str::to_string);
        let mut found = self.search::<T>(&options)?;
        match found.len() {
            0 | 1 => Ok(found.pop()),
            count => Err(MappingError::NotUnique {
                field: field.to_string(),
                value: value.to_string(),
                count,
            }),
        }
    }

    /// Whether an instance has `field` equal to `value`
    pub fn exists_by_unique_property_value<T: SparqlModel>(
        &self,
        field: &str,
        value: impl Into<Value>,
    ) -> MappingResult<bool> {
        let mapper = mapper::<T>()?;
        let query = QuerySynthesizer::new(mapper.descriptor())
            .build_ask(&[Filter::equals(field, value)])?;
        Ok(self.store.ask(&query)?)
    }

    /// Matching instances, one per URI (first row wins)
    pub fn search<T: SparqlModel>(&self, options: &SelectOptions) -> MappingResult<Vec<T>> {
        let mapper = mapper::<T>()?;
        let options = self.with_default_lang(options);
        let query = QuerySynthesizer::new(mapper.descriptor()).build_select(&options)?;

        let mut seen = FxHashSet::default();
        let mut models = Vec::new();
        for row in self.store.select(&query)? {
            let model = mapper.from_solution(&row?)?;
            let uri = model.resource().uri().unwrap_or_default().to_string();
            if seen.insert(uri) {
                models.push(model);
            }
        }
        debug!(
            "Search on {} returned {} instances",
            mapper.descriptor().type_name(),
            models.len()
        );
        Ok(models)
    }

    /// One page of results plus the total count for the same filters
    pub fn search_with_pagination<T: SparqlModel>(
        &self,
        options: &SelectOptions,
    ) -> MappingResult<ListWithPagination<T>> {
        let lang = options
            .lang
            .as_deref()
            .or(self.config.default_lang.as_deref());
        let total = self.count_with_lang::<T>(&options.filters, lang)?;
        let items = self.search(options)?;
        Ok(ListWithPagination {
            items,
            total,
            page: options.page.max(0),
            page_size: options.page_size,
        })
    }

    /// Number of distinct instances matching `filters`, labels read in the
    /// default language
    pub fn count<T: SparqlModel>(&self, filters: &[Filter]) -> MappingResult<usize> {
        self.count_with_lang::<T>(filters, self.config.default_lang.as_deref())
    }

    /// Number of distinct instances matching `filters` with labels in `lang`
    pub fn count_with_lang<T: SparqlModel>(
        &self,
        filters: &[Filter],
        lang: Option<&str>,
    ) -> MappingResult<usize> {
        let mapper = mapper::<T>()?;
        let query = QuerySynthesizer::new(mapper.descriptor()).build_count(filters, lang)?;

        let Some(row) = self.store.select(&query)?.next() else {
            return Ok(0);
        };
        let row = row?;
        match row.get(COUNT_VARIABLE) {
            None => Ok(0),
            Some(term) => term.lexical().parse().map_err(|_| MappingError::Deserialization {
                field: COUNT_VARIABLE.to_string(),
                value: term.to_string(),
                datatype: "Integer".to_string(),
            }),
        }
    }

    /// Replace the stored description of an existing instance.
    ///
    /// The rdf:type cannot change; an unset type is taken from the store.
    pub fn update<T: SparqlModel>(&self, model: &mut T) -> MappingResult<()> {
        let mapper = mapper::<T>()?;
        let update = self.replacement(&mapper, model)?;
        self.transactional(|| Ok(self.store.update(&update)?))?;
        debug!(
            "Updated {} {}",
            mapper.descriptor().type_name(),
            model.resource().uri().unwrap_or_default()
        );
        Ok(())
    }

    /// Replace several instances with one update request
    pub fn update_all<T: SparqlModel>(&self, models: &mut [T]) -> MappingResult<()> {
        let mapper = mapper::<T>()?;
        self.transactional(|| {
            let mut seen = FxHashSet::default();
            let mut batch = Update {
                base_iri: None,
                operations: Vec::new(),
            };
            for model in models.iter_mut() {
                let update = self.replacement(&mapper, model)?;
                let uri = model.resource().uri().unwrap_or_default().to_string();
                if !seen.insert(uri.clone()) {
                    return Err(MappingError::IllegalArgument(format!(
                        "{} is updated twice",
                        uri
                    )));
                }
                batch.operations.extend(update.operations);
            }
            self.store.update(&batch)?;
            info!(
                "Updated {} instances of {}",
                models.len(),
                mapper.descriptor().type_name()
            );
            Ok(())
        })
    }

    /// Statements about `uri` that no declared property covers
    pub fn load_relations<T: SparqlModel>(&self, uri: &str) -> MappingResult<Vec<Relation>> {
        let mapper = mapper::<T>()?;
        let uri = self.normalize(uri)?;
        self.stored_relations::<T>(&mapper, &uri)
    }

    fn stored_relations<T: SparqlModel>(
        &self,
        mapper: &ModelMapper<T>,
        uri: &NamedNode,
    ) -> MappingResult<Vec<Relation>> {
        let rows = self
            .store
            .select(&QuerySynthesizer::build_relations(uri))?
            .collect::<StoreResult<Vec<_>>>()?;
        mapper.relations_from_rows(&rows, &DescriptorRegistry::global().descriptors())
    }

    /// `DELETE DATA` of the stored relations outside the model graph, which
    /// [`QuerySynthesizer::build_delete`] does not reach
    fn relation_cleanup<T: SparqlModel>(
        &self,
        mapper: &ModelMapper<T>,
        uri: &NamedNode,
    ) -> MappingResult<Update> {
        let quads = self
            .stored_relations(mapper, uri)?
            .iter()
            .filter(|relation| relation.graph.is_some())
            .map(|relation| mapper.relation_quad(uri, relation))
            .collect::<MappingResult<Vec<_>>>()?;
        QuerySynthesizer::new(mapper.descriptor()).build_delete_data(quads)
    }

    /// Delete-then-insert replacing the stored description of `model`
    fn replacement<T: SparqlModel>(&self, mapper: &ModelMapper<T>, model: &mut T) -> MappingResult<Update> {
        let uri = self.normalize(mapper.uri_of(model)?.as_str())?;
        model.resource_mut().set_uri(uri.as_str());

        let stored: T = self
            .get_by_uri(uri.as_str(), None)?
            .ok_or_else(|| MappingError::InvalidUriList(vec![uri.as_str().to_string()]))?;
        if let Some(stored_type) = stored.resource().rdf_type() {
            match model.resource().rdf_type() {
                Some(requested) if requested != stored_type => {
                    return Err(MappingError::ImmutableType {
                        uri: uri.as_str().to_string(),
                        stored: stored_type.to_string(),
                        requested: requested.to_string(),
                    });
                }
                _ => model.resource_mut().set_rdf_type(stored_type)?,
            }
        }

        let synthesizer = QuerySynthesizer::new(mapper.descriptor());
        let mut update = synthesizer.build_delete(&uri);
        update
            .operations
            .extend(self.relation_cleanup(mapper, &uri)?.operations);
        update
            .operations
            .extend(synthesizer.build_insert(mapper.to_quads(model)?)?.operations);
        Ok(update)
    }

    /// Remove an instance; fails when it does not exist
    pub fn delete<T: SparqlModel>(&self, uri: &str) -> MappingResult<()> {
        let mapper = mapper::<T>()?;
        let uri = self.normalize(uri)?;
        let synthesizer = QuerySynthesizer::new(mapper.descriptor());
        if !self.store.ask(&synthesizer.build_uri_exists(&uri))? {
            return Err(MappingError::InvalidUriList(vec![uri.as_str().to_string()]));
        }
        let mut update = synthesizer.build_delete(&uri);
        update
            .operations
            .extend(self.relation_cleanup::<T>(&mapper, &uri)?.operations);
        self.store.update(&update)?;
        debug!("Deleted {} {}", mapper.descriptor().type_name(), uri.as_str());
        Ok(())
    }

    /// Remove several instances in one transaction.
    ///
    /// A URI listed twice is rejected before anything is deleted: stores
    /// that buffer writes until commit would otherwise accept the second
    /// delete.
    pub fn delete_all<T: SparqlModel>(&self, uris: &[String]) -> MappingResult<()> {
        let mut seen = FxHashSet::default();
        for uri in uris {
            let uri = self.normalize(uri)?;
            if !seen.insert(uri.clone()) {
                return Err(MappingError::IllegalArgument(format!(
                    "{} is deleted twice",
                    uri.as_str()
                )));
            }
        }
        self.transactional(|| uris.iter().try_for_each(|uri| self.delete::<T>(uri)))
    }

    /// Whether `uri` is an instance of `T` or of a subclass
    pub fn uri_exists<T: SparqlModel>(&self, uri: &str) -> MappingResult<bool> {
        let mapper = mapper::<T>()?;
        let uri = self.normalize(uri)?;
        Ok(self
            .store
            .ask(&QuerySynthesizer::new(mapper.descriptor()).build_uri_exists(&uri))?)
    }

    /// Whether `uri` appears as subject or object in any graph, whatever its
    /// type
    pub fn uri_exists_any(&self, uri: &str) -> MappingResult<bool> {
        let uri = self.normalize(uri)?;
        self.exists_anywhere(&uri)
    }

    fn exists_anywhere(&self, uri: &NamedNode) -> MappingResult<bool> {
        Ok(self.store.ask(&QuerySynthesizer::build_uri_exists_any(uri))?)
    }

    /// Delete every instance whose `field` references `object_uri`; returns
    /// the deleted URIs
    pub fn delete_by_object_relation<T: SparqlModel>(
        &self,
        field: &str,
        object_uri: &str,
    ) -> MappingResult<Vec<String>> {
        let object = self.normalize(object_uri)?;
        let options = SelectOptions::new().filter(Filter::equals(
            field,
            Value::Uri(object.as_str().to_string()),
        ));
        let uris: Vec<String> = self
            .search::<T>(&options)?
            .iter()
            .filter_map(|model| model.resource().uri().map(str::to_string))
            .collect();
        self.delete_all::<T>(&uris)?;
        debug!(
            "Deleted {} instances referencing {} through {}",
            uris.len(),
            object.as_str(),
            field
        );
        Ok(uris)
    }

    /// Load multi-valued `fields` for a page of instances
    pub fn fetch_lists<T: SparqlModel>(&self, models: &mut [T], fields: &[&str]) -> MappingResult<()> {
        ListFetcher::<T>::new(fields.iter().copied())?
            .with_batch_size(self.config.batch_size)?
            .update_models(&self.store, models)
    }

    /// Check every object reference of `model` against the store
    pub fn validate_references<T: SparqlModel>(&self, model: &T) -> MappingResult<Vec<ReferenceViolation>> {
        let mapper = mapper::<T>()?;
        let mut violations = Vec::new();
        // (rdf:type, graph) of the target -> (field, uri)
        let mut targets: IndexMap<(String, String), Vec<(String, String)>> = IndexMap::new();

        for property in mapper.descriptor().properties() {
            let Some(nested) = &property.nested else {
                continue;
            };
            let values = if property.is_list() {
                mapper.get_list(model, &property.field)?
            } else {
                mapper.get_scalar(model, &property.field)?.into_iter().collect()
            };
            if values.is_empty() {
                if property.required {
                    violations.push(ReferenceViolation::new(
                        &property.field,
                        None,
                        ViolationReason::MissingRequiredValue,
                    ));
                }
                continue;
            }
            for value in values {
                let raw = value.as_uri().or_else(|| value.as_str()).unwrap_or_default();
                match self.normalize(raw) {
                    Ok(uri) => targets
                        .entry((nested.rdf_type.as_str().to_string(), nested.graph.as_str().to_string()))
                        .or_default()
                        .push((property.field.clone(), uri.as_str().to_string())),
                    Err(_) => violations.push(ReferenceViolation::new(
                        &property.field,
                        Some(raw.to_string()),
                        ViolationReason::InvalidUri,
                    )),
                }
            }
        }

        for ((rdf_type, graph), references) in targets {
            let uris = references.iter().map(|(_, uri)| uri.clone()).collect();
            let query = MultiGraphQuery::from_uris(
                IndexMap::from([(rdf_type, graph)]),
                uris,
                self.config.batch_size,
            )?;
            let unknown: FxHashSet<String> = query
                .get_unknown_stream(&self.store)?
                .collect::<MappingResult<_>>()?;
            violations.extend(
                references
                    .into_iter()
                    .filter(|(_, uri)| unknown.contains(uri))
                    .map(|(field, uri)| {
                        ReferenceViolation::new(&field, Some(uri), ViolationReason::UnknownReference)
                    }),
            );
        }

        if !violations.is_empty() {
            debug!("{} reference violations", violations.len());
        }
        Ok(violations)
    }

    /// Fail with [`MappingError::Validation`] when a reference is invalid
    pub fn check_references<T: SparqlModel>(&self, model: &T) -> MappingResult<()> {
        let violations = self.validate_references(model)?;
        if violations.is_empty() {
            Ok(())
        } else {
            Err(MappingError::Validation(violations))
        }
    }

    /// Existence query over `uris` with the engine batch size
    pub fn multi_graph_query(
        &self,
        types_and_graphs: IndexMap<String, String>,
        uris: Vec<String>,
    ) -> MappingResult<MultiGraphQuery<'static>> {
        MultiGraphQuery::from_uris(types_and_graphs, uris, self.config.batch_size)
    }
}
