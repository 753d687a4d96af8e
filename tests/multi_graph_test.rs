mod common;

use common::*;
use indexmap::IndexMap;
use std::collections::HashSet;
use triplemap::rdf::{vocab, Quad};
use triplemap::{MappingError, MemoryStore, MultiGraphQuery, SparqlService};

const A1: &str = "urn:a1";
const A2: &str = "urn:a2";
const ZONE: &str = "urn:zone";
const MISSING: &str = "urn:missing";

fn store() -> MemoryStore {
    init_tracing();
    let store = store_with_ontology();
    let rdf_type = node(vocab::RDF_TYPE);
    store.insert_quads([
        Quad::new(node(A1), rdf_type.clone(), node(DEVICE), Some(node(DEVICES_GRAPH))),
        Quad::new(node(A2), rdf_type.clone(), node(SENSOR), Some(node(DEVICES_GRAPH))),
        Quad::new(node(ZONE), rdf_type, node(AREA), Some(node(AREAS_GRAPH))),
    ])
    .unwrap();
    store
}

fn candidates(pairs: &[(&str, &str)]) -> IndexMap<String, String> {
    pairs
        .iter()
        .map(|(t, g)| (t.to_string(), g.to_string()))
        .collect()
}

fn devices_and_areas() -> IndexMap<String, String> {
    candidates(&[(DEVICE, DEVICES_GRAPH), (AREA, AREAS_GRAPH)])
}

fn strings(uris: &[&str]) -> Vec<String> {
    uris.iter().map(|u| u.to_string()).collect()
}

#[test]
fn test_check_unknowns_reports_exactly_the_missing_uris() {
    let store = store();
    let query = MultiGraphQuery::from_uris(
        candidates(&[(DEVICE, DEVICES_GRAPH)]),
        strings(&[A1, A2, MISSING]),
        1000,
    )
    .unwrap();

    match query.check_unknowns(&store) {
        Err(MappingError::InvalidUriList(missing)) => assert_eq!(missing, vec![MISSING]),
        other => panic!("expected InvalidUriList, got {:?}", other),
    }
    match query.get_results(&store) {
        Err(MappingError::InvalidUriList(missing)) => assert_eq!(missing, vec![MISSING]),
        other => panic!("expected InvalidUriList, got {:?}", other.map(|r| r.len())),
    }
}

#[test]
fn test_existing_and_unknown_partition_the_input() {
    let store = store();
    let input = strings(&[A1, MISSING, ZONE, A2, "urn:other"]);

    for batch_size in [1, 2, 1000] {
        let query = MultiGraphQuery::from_uris(devices_and_areas(), input.clone(), batch_size).unwrap();
        let existing: HashSet<String> = query
            .get_existing_stream(&store)
            .unwrap()
            .collect::<Result<_, _>>()
            .unwrap();
        let unknown: HashSet<String> = query
            .get_unknown_stream(&store)
            .unwrap()
            .collect::<Result<_, _>>()
            .unwrap();

        assert!(existing.is_disjoint(&unknown));
        let all: HashSet<String> = existing.union(&unknown).cloned().collect();
        assert_eq!(all, input.iter().cloned().collect::<HashSet<_>>());
        assert_eq!(unknown, HashSet::from([MISSING.to_string(), "urn:other".to_string()]));
    }
}

#[test]
fn test_results_carry_the_stored_type() {
    let store = store();
    let query = MultiGraphQuery::from_uris(devices_and_areas(), strings(&[ZONE, A2, A1]), 2).unwrap();

    let results = query.get_results(&store).unwrap();
    let mut found: Vec<(String, String)> = results
        .iter()
        .map(|r| (r.uri().unwrap().to_string(), r.rdf_type().unwrap().to_string()))
        .collect();
    found.sort();
    assert_eq!(
        found,
        vec![
            (A1.to_string(), DEVICE.to_string()),
            (A2.to_string(), SENSOR.to_string()),
            (ZONE.to_string(), AREA.to_string()),
        ]
    );
    query.check_unknowns(&store).unwrap();
}

#[test]
fn test_wrong_graph_matches_nothing() {
    let store = store();
    let query = MultiGraphQuery::from_uris(
        candidates(&[(DEVICE, AREAS_GRAPH)]),
        strings(&[A1, A2]),
        10,
    )
    .unwrap();

    assert_eq!(query.get_existing_stream(&store).unwrap().count(), 0);
    let unknown: Vec<String> = query
        .get_unknown_stream(&store)
        .unwrap()
        .collect::<Result<_, _>>()
        .unwrap();
    assert_eq!(unknown.len(), 2);
}

#[test]
fn test_no_candidates_matches_any_typed_resource() {
    let store = store();
    let query = MultiGraphQuery::from_uris(IndexMap::new(), strings(&[A1, ZONE, MISSING]), 10).unwrap();

    let unknown: Vec<String> = query
        .get_unknown_stream(&store)
        .unwrap()
        .collect::<Result<_, _>>()
        .unwrap();
    assert_eq!(unknown, vec![MISSING]);
}

#[test]
fn test_supplier_is_read_for_every_stream() {
    let store = store();
    let calls = std::cell::Cell::new(0);
    let query = MultiGraphQuery::new(
        devices_and_areas(),
        || {
            calls.set(calls.get() + 1);
            vec![A1.to_string(), A1.to_string(), MISSING.to_string()]
        },
        2,
        1,
    )
    .unwrap();
    assert_eq!(query.size(), 2);

    let before = calls.get();
    let _ = query.get_existing_stream(&store).unwrap().count();
    let _ = query.get_unknown_stream(&store).unwrap().count();
    assert_eq!(calls.get(), before + 2);
}

#[test]
fn test_invalid_configuration() {
    let mismatch = MultiGraphQuery::new(devices_and_areas(), || strings(&[A1, A2]), 3, 10);
    assert!(matches!(mismatch, Err(MappingError::InvalidConfiguration(_))));

    let empty = MultiGraphQuery::from_uris(devices_and_areas(), Vec::new(), 10);
    assert!(matches!(empty, Err(MappingError::InvalidConfiguration(_))));

    let no_batch = MultiGraphQuery::from_uris(devices_and_areas(), strings(&[A1]), 0);
    assert!(matches!(no_batch, Err(MappingError::InvalidConfiguration(_))));
}

#[test]
fn test_service_uses_configured_batch_size() {
    let service = SparqlService::new(store());
    let query = service
        .multi_graph_query(devices_and_areas(), strings(&[A1, ZONE]))
        .unwrap();
    assert_eq!(query.get_results(service.store()).unwrap().len(), 2);
}
