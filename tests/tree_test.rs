mod common;

use common::*;
use std::cell::{Cell, RefCell};
use triplemap::{MappingError, ParentRef, PartialTreeIndex, TreeIndex};

const A: &str = "http://example.org/id/a";
const B: &str = "http://example.org/id/b";
const C: &str = "http://example.org/id/c";

fn area_uris(areas: Vec<&Area>) -> Vec<&str> {
    areas.into_iter().map(Area::uri).collect()
}

/// Every node is either listed as a root or counted as a child
fn assert_counts_add_up(index: &TreeIndex<Area>) {
    let children: usize = index.nodes().map(|n| index.get_child_count(n.uri())).sum();
    assert_eq!(index.get_roots_count() + children, index.len());
}

fn chain_c() -> Area {
    Area::with_parent(C, Area::with_parent(B, Area::new(A)))
}

#[test]
fn test_loaded_ancestors_are_indexed_once() {
    let mut index = TreeIndex::new();
    assert!(index.add_tree(chain_c()).unwrap());
    assert!(!index.add_tree(chain_c()).unwrap());
    assert!(!index.add_tree(chain_c()).unwrap());

    assert_eq!(index.len(), 3);
    assert_eq!(index.get_roots_count(), 1);
    assert_eq!(area_uris(index.list_roots()), vec![A]);
    assert_eq!(area_uris(index.list_children(A)), vec![B]);
    assert_eq!(area_uris(index.list_children(B)), vec![C]);
    assert_eq!(index.get_child_count(C), 0);

    // loaded parents are replaced by their URI
    let c = index.get(C).unwrap();
    assert_eq!(c.tree.parent, Some(ParentRef::Uri(B.to_string())));
    assert_counts_add_up(&index);
}

#[test]
fn test_parents_added_after_children() {
    let mut index = TreeIndex::new();
    index.add_tree(Area::with_parent_uri(C, B)).unwrap();
    assert_eq!(area_uris(index.list_roots()), vec![C]);

    index.add_tree(Area::with_parent_uri(B, A)).unwrap();
    assert_eq!(area_uris(index.list_roots()), vec![B]);
    assert_counts_add_up(&index);

    index.add_tree(Area::new(A)).unwrap();
    assert_eq!(area_uris(index.list_roots()), vec![A]);
    assert_eq!(area_uris(index.list_children(B)), vec![C]);
    assert_eq!(index.get_parent(C).map(Area::uri), Some(B));
    assert_counts_add_up(&index);
}

#[test]
fn test_attaching_below_indexed_node() {
    let mut index = TreeIndex::new();
    index.add_tree(chain_c()).unwrap();

    let d = "http://example.org/id/d";
    let loaded_parent = Area::with_parent(B, Area::new(A));
    index.add_tree(Area::with_parent(d, loaded_parent)).unwrap();

    assert_eq!(index.len(), 4);
    assert_eq!(area_uris(index.list_children(B)), vec![C, d]);
    assert_counts_add_up(&index);
}

#[test]
fn test_uris_are_trimmed() {
    let mut index = TreeIndex::new();
    index.add_tree(Area::new(" http://example.org/id/a ")).unwrap();
    index.add_tree(Area::with_parent_uri(B, "http://example.org/id/a  ")).unwrap();

    assert!(index.contains(A));
    assert_eq!(index.get_child_count(A), 1);
}

#[test]
fn test_cycles_are_rejected() {
    let mut index = TreeIndex::new();
    let result = index.add_tree(Area::with_parent_uri(A, A));
    assert!(matches!(result, Err(MappingError::CyclicTree(uri)) if uri == A));
    assert!(index.is_empty());

    index.add_tree(Area::with_parent_uri(A, B)).unwrap();
    let result = index.add_tree(Area::with_parent_uri(B, A));
    assert!(matches!(result, Err(MappingError::CyclicTree(_))));
    assert_eq!(index.len(), 1);
    assert_counts_add_up(&index);
}

#[test]
fn test_node_without_uri() {
    let mut index = TreeIndex::<Area>::new();
    assert!(matches!(
        index.add_tree(Area::default()),
        Err(MappingError::IllegalArgument(_))
    ));
}

#[test]
fn test_configured_root() {
    let mut shown = TreeIndex::with_root(A, false);
    let mut hidden = TreeIndex::with_root(A, true);
    for index in [&mut shown, &mut hidden] {
        index.add_tree(Area::new(A)).unwrap();
        index.add_tree(Area::with_parent_uri(B, A)).unwrap();
        index.add_tree(Area::with_parent_uri(C, A)).unwrap();
    }

    assert_eq!(area_uris(shown.list_roots()), vec![A]);
    assert_eq!(area_uris(hidden.list_roots()), vec![B, C]);
    assert_eq!(hidden.get_roots_count(), 2);
    assert_eq!(hidden.get_parent(B).map(Area::uri), Some(A));
    assert!(hidden.exclude_root());
    assert_eq!(hidden.root(), Some(A));
}

#[test]
fn test_traverse_depths() {
    let mut index = TreeIndex::new();
    index.add_tree(chain_c()).unwrap();
    index.add_tree(Area::with_parent_uri("http://example.org/id/e", A)).unwrap();

    let mut visited = Vec::new();
    index.traverse(|node, depth| visited.push((node.uri().to_string(), depth)));
    assert_eq!(
        visited,
        vec![
            (A.to_string(), 0),
            (B.to_string(), 1),
            (C.to_string(), 2),
            ("http://example.org/id/e".to_string(), 1),
        ]
    );
}

#[test]
fn test_materialize_children() {
    let mut index = TreeIndex::new();
    index.add_tree(chain_c()).unwrap();
    index.add_tree(Area::with_parent_uri("http://example.org/id/e", A)).unwrap();
    index.materialize_children();

    assert_eq!(
        index.get(A).unwrap().tree.children,
        vec![B.to_string(), "http://example.org/id/e".to_string()]
    );
    assert!(index.get(C).unwrap().tree.children.is_empty());

    let nodes = index.into_nodes();
    assert_eq!(nodes.len(), 4);
}

/// r → (a → (a1 → a11, a2), b)
fn children_of(uri: &str) -> Vec<Area> {
    let names: &[&str] = match uri.rsplit('/').next() {
        Some("r") => &["a", "b"],
        Some("a") => &["a1", "a2"],
        Some("a1") => &["a11"],
        _ => &[],
    };
    names
        .iter()
        .map(|n| Area::new(&format!("http://example.org/id/{}", n)))
        .collect()
}

fn descendants_of(uri: &str) -> usize {
    children_of(uri)
        .iter()
        .map(|c| 1 + descendants_of(c.uri()))
        .sum()
}

fn id(name: &str) -> String {
    format!("http://example.org/id/{}", name)
}

#[test]
fn test_partial_tree_loads_by_depth() {
    init_tracing();
    let lookups = RefCell::new(Vec::new());
    let counts = Cell::new(0);

    let mut partial = PartialTreeIndex::new(
        TreeIndex::with_root(id("r"), false),
        |uri: &str| {
            lookups.borrow_mut().push(uri.to_string());
            Ok(children_of(uri))
        },
        |uri: &str| {
            counts.set(counts.get() + 1);
            Ok(descendants_of(uri))
        },
    );
    partial.add_tree(Area::new(&id("r"))).unwrap();

    assert_eq!(partial.load_children(&id("r"), 1).unwrap(), 2);
    assert_eq!(*lookups.borrow(), vec![id("r")]);
    assert_eq!(partial.index().get_child_count(&id("r")), 2);
    assert_eq!(partial.index().get_child_count(&id("a")), 0);

    assert_eq!(partial.load_children(&id("r"), 2).unwrap(), 2);
    assert_eq!(lookups.borrow().len(), 3);
    assert_eq!(
        partial.index().get_parent(&id("a1")).map(Area::uri),
        Some(id("a").as_str())
    );

    // nothing new at the same depth, and no parent is looked up twice
    assert_eq!(partial.load_children(&id("r"), 2).unwrap(), 0);
    assert_eq!(lookups.borrow().len(), 3);

    assert_eq!(partial.descendant_count(&id("a")).unwrap(), 3);
    assert_eq!(partial.descendant_count(&id("a")).unwrap(), 3);
    assert_eq!(counts.get(), 1);

    // a11 is two levels below a and not indexed yet
    assert!(partial.is_loaded(&id("a")));
    assert_eq!(partial.indexed_descendants(&id("a")), 2);
    assert!(partial.has_more(&id("a")).unwrap());
    assert!(partial.has_more(&id("r")).unwrap());
    assert!(partial.has_more(&id("a1")).unwrap());
    assert!(!partial.has_more(&id("a2")).unwrap());

    assert_eq!(partial.load_children(&id("a1"), 1).unwrap(), 1);
    assert!(!partial.has_more(&id("a")).unwrap());
    assert!(!partial.has_more(&id("r")).unwrap());
    assert!(!partial.has_more(&id("a1")).unwrap());

    let index = partial.into_index();
    assert_eq!(index.len(), 6);
    assert_eq!(area_uris(index.list_roots()), vec![id("r").as_str()]);
    assert_counts_add_up(&index);
}

#[test]
fn test_partial_tree_lookup_error() {
    let mut partial = PartialTreeIndex::new(
        TreeIndex::<Area>::new(),
        |uri: &str| Err(MappingError::InvalidUriList(vec![uri.to_string()])),
        |_: &str| Ok(0),
    );
    assert!(matches!(
        partial.load_children(A, 1),
        Err(MappingError::InvalidUriList(_))
    ));
}
