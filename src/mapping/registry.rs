//! Process-wide descriptor cache
//!
//! Descriptors are computed on first access. Building happens outside the
//! lock; the first finished build wins and every caller gets the same `Arc`.
//! Types described while another type is being built are evicted again when
//! that outer build fails, since they may reference the failed type.

use super::builder::DescriptorBuilder;
use super::descriptor::ResourceDescriptor;
use super::mapper::ModelMapper;
use super::SparqlModel;
use crate::error::{MappingError, MappingResult};
use std::any::{Any, TypeId};
use std::cell::RefCell;
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, LazyLock, PoisonError, RwLock};
use tracing::{debug, info};

static REGISTRY: LazyLock<DescriptorRegistry> = LazyLock::new(DescriptorRegistry::new);

thread_local! {
    /// Types whose descriptor is being built on this thread
    static IN_PROGRESS: RefCell<HashSet<TypeId>> = RefCell::new(HashSet::new());

    /// Types registered on this thread while an outer build is running
    static PROVISIONAL: RefCell<Vec<(TypeId, Arc<ResourceDescriptor>)>> = RefCell::new(Vec::new());
}

fn building_any() -> bool {
    IN_PROGRESS.with(|set| !set.borrow().is_empty())
}

/// Removes a type from the in-progress set when the build ends
struct BuildGuard(TypeId);

impl Drop for BuildGuard {
    fn drop(&mut self) {
        IN_PROGRESS.with(|set| {
            set.borrow_mut().remove(&self.0);
        });
    }
}

type AnyMapper = Arc<dyn Any + Send + Sync>;

/// Registry of model mappers keyed by Rust type, with an rdf:type index
pub struct DescriptorRegistry {
    mappers: RwLock<HashMap<TypeId, AnyMapper>>,
    by_rdf_type: RwLock<HashMap<String, Arc<ResourceDescriptor>>>,
}

impl DescriptorRegistry {
    fn new() -> Self {
        Self {
            mappers: RwLock::new(HashMap::new()),
            by_rdf_type: RwLock::new(HashMap::new()),
        }
    }

    /// The process-wide registry
    pub fn global() -> &'static DescriptorRegistry {
        &REGISTRY
    }

    /// Mapper for `T`, building and caching it on first access
    pub fn mapper<T: SparqlModel>(&self) -> MappingResult<Arc<ModelMapper<T>>> {
        if let Some(mapper) = self.cached::<T>() {
            return Ok(mapper);
        }

        let mark = PROVISIONAL.with(|p| p.borrow().len());
        let built: AnyMapper = match Self::build::<T>() {
            Ok(mapper) => Arc::new(mapper),
            Err(e) => {
                self.evict_since(mark);
                return Err(e);
            }
        };
        let (winner, inserted) = {
            let mut mappers = self.mappers.write().unwrap_or_else(PoisonError::into_inner);
            match mappers.get(&TypeId::of::<T>()) {
                Some(existing) => (existing.clone(), false),
                None => {
                    mappers.insert(TypeId::of::<T>(), built.clone());
                    (built, true)
                }
            }
        };

        let mapper = downcast::<T>(winner)?;
        if inserted {
            let descriptor = mapper.descriptor();
            self.by_rdf_type
                .write()
                .unwrap_or_else(PoisonError::into_inner)
                .entry(descriptor.rdf_type().as_str().to_string())
                .or_insert_with(|| descriptor.clone());
            info!(
                "Registered descriptor for {} ({} properties)",
                descriptor.type_name(),
                descriptor.properties().count()
            );
            if building_any() {
                PROVISIONAL.with(|p| p.borrow_mut().push((TypeId::of::<T>(), descriptor.clone())));
            }
        }
        if !building_any() {
            PROVISIONAL.with(|p| p.borrow_mut().clear());
        }
        Ok(mapper)
    }

    /// Drop the types registered on this thread since `mark`
    fn evict_since(&self, mark: usize) {
        let evicted: Vec<_> = PROVISIONAL.with(|p| {
            let mut provisional = p.borrow_mut();
            let start = mark.min(provisional.len());
            provisional.drain(start..).collect()
        });
        if evicted.is_empty() {
            return;
        }
        let mut mappers = self.mappers.write().unwrap_or_else(PoisonError::into_inner);
        let mut by_rdf_type = self.by_rdf_type.write().unwrap_or_else(PoisonError::into_inner);
        for (type_id, descriptor) in evicted {
            mappers.remove(&type_id);
            let key = descriptor.rdf_type().as_str();
            if by_rdf_type.get(key).is_some_and(|d| Arc::ptr_eq(d, &descriptor)) {
                by_rdf_type.remove(key);
            }
            debug!("Evicted descriptor for {}", descriptor.type_name());
        }
    }

    /// Descriptor for `T`
    pub fn describe<T: SparqlModel>(&self) -> MappingResult<Arc<ResourceDescriptor>> {
        Ok(self.mapper::<T>()?.descriptor().clone())
    }

    /// Descriptor registered for an rdf:type IRI
    pub fn by_rdf_type(&self, rdf_type: &str) -> MappingResult<Arc<ResourceDescriptor>> {
        self.by_rdf_type
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(rdf_type)
            .cloned()
            .ok_or_else(|| MappingError::MapperNotFound(rdf_type.to_string()))
    }

    /// Every registered descriptor
    pub fn descriptors(&self) -> Vec<Arc<ResourceDescriptor>> {
        self.by_rdf_type
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .cloned()
            .collect()
    }

    /// Number of registered model types
    pub fn len(&self) -> usize {
        self.mappers.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn cached<T: SparqlModel>(&self) -> Option<Arc<ModelMapper<T>>> {
        let mappers = self.mappers.read().unwrap_or_else(PoisonError::into_inner);
        mappers
            .get(&TypeId::of::<T>())
            .cloned()
            .and_then(|m| m.downcast::<ModelMapper<T>>().ok())
    }

    fn build<T: SparqlModel>() -> MappingResult<ModelMapper<T>> {
        let type_name = std::any::type_name::<T>();
        IN_PROGRESS.with(|set| set.borrow_mut().insert(TypeId::of::<T>()));
        let _guard = BuildGuard(TypeId::of::<T>());

        debug!("Analyzing model type {}", type_name);
        let mut builder = DescriptorBuilder::<T>::new();
        T::describe(&mut builder);
        let (descriptor, accessors) = builder.build(type_name)?;
        Ok(ModelMapper::new(descriptor, accessors))
    }
}

fn downcast<T: SparqlModel>(mapper: AnyMapper) -> MappingResult<Arc<ModelMapper<T>>> {
    mapper
        .downcast::<ModelMapper<T>>()
        .map_err(|_| MappingError::MapperNotFound(std::any::type_name::<T>().to_string()))
}

/// Validate a referenced model type. Types already being built on this
/// thread are accepted so that mutually referencing models can be described.
pub(crate) fn validate_nested<T: SparqlModel>() -> MappingResult<()> {
    let building = IN_PROGRESS.with(|set| set.borrow().contains(&TypeId::of::<T>()));
    if building {
        return Ok(());
    }
    REGISTRY.mapper::<T>().map(|_| ())
}

/// Descriptor for `T` from the process-wide registry
pub fn describe<T: SparqlModel>() -> MappingResult<Arc<ResourceDescriptor>> {
    REGISTRY.describe::<T>()
}

/// Mapper for `T` from the process-wide registry
pub fn mapper<T: SparqlModel>() -> MappingResult<Arc<ModelMapper<T>>> {
    REGISTRY.mapper::<T>()
}
