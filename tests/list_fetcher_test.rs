mod common;

use common::*;
use std::sync::atomic::{AtomicUsize, Ordering};
use triplemap::store::SolutionStream;
use triplemap::{
    ListFetcher, MappingError, MemoryStore, Query, SparqlService, StoreResult, TripleStore, Update,
};

/// Store wrapper counting the selects it receives
struct CountingStore<'a> {
    inner: &'a MemoryStore,
    selects: AtomicUsize,
}

impl<'a> CountingStore<'a> {
    fn new(inner: &'a MemoryStore) -> Self {
        Self {
            inner,
            selects: AtomicUsize::new(0),
        }
    }

    fn selects(&self) -> usize {
        self.selects.load(Ordering::SeqCst)
    }
}

impl TripleStore for CountingStore<'_> {
    fn select(&self, query: &Query) -> StoreResult<SolutionStream<'_>> {
        self.selects.fetch_add(1, Ordering::SeqCst);
        self.inner.select(query)
    }

    fn ask(&self, query: &Query) -> StoreResult<bool> {
        self.inner.ask(query)
    }

    fn update(&self, update: &Update) -> StoreResult<()> {
        self.inner.update(update)
    }

    fn start_transaction(&self) -> StoreResult<()> {
        self.inner.start_transaction()
    }

    fn commit_transaction(&self) -> StoreResult<()> {
        self.inner.commit_transaction()
    }

    fn rollback_transaction(&self) -> StoreResult<()> {
        self.inner.rollback_transaction()
    }

    fn in_transaction(&self) -> bool {
        self.inner.in_transaction()
    }
}

fn device_uri(i: usize) -> String {
    format!("http://example.org/id/d{}", i)
}

/// Store with `n` devices; device `i` has tags `t0..t{i % 3}`
fn store_with_devices(n: usize) -> MemoryStore {
    init_tracing();
    let service = SparqlService::new(store_with_ontology());
    let mut devices: Vec<Device> = (0..n)
        .map(|i| {
            let mut device = Device::new(&device_uri(i), "Acme");
            device.tags = (0..i % 3).map(|t| format!("t{}", t)).collect();
            device
        })
        .collect();
    service.create_all(&mut devices).unwrap();
    MemoryStore::from_quads(service.store().quads().unwrap()).unwrap()
}

/// Page of devices as a select would return them: scalar fields only
fn page(n: usize) -> Vec<Device> {
    (0..n).map(|i| Device::new(&device_uri(i), "Acme")).collect()
}

fn sorted_tags(device: &Device) -> Vec<String> {
    let mut tags = device.tags.clone();
    tags.sort();
    tags
}

#[test]
fn test_fetches_every_collection() {
    let store = store_with_devices(5);
    let mut devices = page(5);

    ListFetcher::<Device>::new(["tags"])
        .unwrap()
        .update_models(&store, &mut devices)
        .unwrap();

    for (i, device) in devices.iter().enumerate() {
        let expected: Vec<String> = (0..i % 3).map(|t| format!("t{}", t)).collect();
        assert_eq!(sorted_tags(device), expected);
    }
}

#[test]
fn test_second_run_gives_same_collections() {
    let store = store_with_devices(4);
    let fetcher = ListFetcher::<Device>::new(["tags"]).unwrap();

    let mut devices = page(4);
    fetcher.update_models(&store, &mut devices).unwrap();
    let first: Vec<Vec<String>> = devices.iter().map(sorted_tags).collect();

    fetcher.update_models(&store, &mut devices).unwrap();
    let second: Vec<Vec<String>> = devices.iter().map(sorted_tags).collect();

    assert_eq!(first, second);
}

#[test]
fn test_stale_collection_is_replaced() {
    let store = store_with_devices(3);
    let mut devices = page(3);
    devices[0].tags = vec!["stale".to_string()];
    devices[2].tags = vec!["stale".to_string()];

    ListFetcher::<Device>::new(["tags"])
        .unwrap()
        .update_models(&store, &mut devices)
        .unwrap();

    assert!(devices[0].tags.is_empty());
    assert_eq!(sorted_tags(&devices[2]), vec!["t0", "t1"]);
}

#[test]
fn test_one_query_per_field_and_batch() {
    let memory = store_with_devices(7);
    let store = CountingStore::new(&memory);
    let mut devices = page(7);

    ListFetcher::<Device>::new(["tags"])
        .unwrap()
        .with_batch_size(3)
        .unwrap()
        .update_models(&store, &mut devices)
        .unwrap();
    assert_eq!(store.selects(), 3);

    let mut facilities: Vec<Facility> = Vec::new();
    ListFetcher::<Facility>::new(["hosts"])
        .unwrap()
        .update_models(&store, &mut facilities)
        .unwrap();
    assert_eq!(store.selects(), 3);
}

#[test]
fn test_rejects_bad_field_sets() {
    let empty: [&str; 0] = [];
    assert!(matches!(
        ListFetcher::<Device>::new(empty),
        Err(MappingError::IllegalArgument(_))
    ));
    assert!(matches!(
        ListFetcher::<Device>::new(["brand"]),
        Err(MappingError::IllegalArgument(_))
    ));
    assert!(matches!(
        ListFetcher::<Device>::new(["colours"]),
        Err(MappingError::IllegalArgument(_))
    ));
    assert!(matches!(
        ListFetcher::<Device>::new(["tags"]).unwrap().with_batch_size(0),
        Err(MappingError::InvalidConfiguration(_))
    ));
}

#[test]
fn test_all_fields() {
    let fetcher = ListFetcher::<Device>::all_fields().unwrap().unwrap();
    assert_eq!(fetcher.fields().to_vec(), vec!["tags"]);
    assert!(ListFetcher::<Area>::all_fields().unwrap().is_none());
}

#[test]
fn test_duplicate_uris_in_page() {
    let store = store_with_devices(2);
    let mut devices = vec![Device::new(&device_uri(0), "A"), Device::new(&device_uri(0), "B")];

    let result = ListFetcher::<Device>::new(["tags"])
        .unwrap()
        .update_models(&store, &mut devices);
    assert!(matches!(result, Err(MappingError::IllegalArgument(_))));
}

#[test]
fn test_service_fetch_lists() {
    let store = store_with_devices(3);
    let service = SparqlService::new(store);

    let mut devices: Vec<Device> = service.search(&Default::default()).unwrap();
    assert_eq!(devices.len(), 3);
    assert!(devices.iter().all(|d| d.tags.is_empty()));

    service.fetch_lists(&mut devices, &["tags"]).unwrap();
    let counts: Vec<usize> = devices.iter().map(|d| d.tags.len()).collect();
    assert_eq!(counts, vec![0, 1, 2]);
}
