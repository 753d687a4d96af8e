//! Bidirectional parent/children index over tree models
//!
//! The index owns one instance per URI and keeps the hierarchy as
//! URI → URI relations only. Loaded ancestors handed to [`TreeIndex::add_tree`]
//! are flattened into the index and replaced by their URI.

use crate::error::{MappingError, MappingResult};
use crate::model::{ParentRef, TreeModel};
use indexmap::{IndexMap, IndexSet};
use rustc_hash::{FxHashMap, FxHashSet};

/// Index key of a URI
pub(crate) fn normalize(uri: &str) -> String {
    uri.trim().to_string()
}

fn uri_of<T: TreeModel>(model: &T) -> MappingResult<String> {
    model
        .resource()
        .uri()
        .map(normalize)
        .ok_or_else(|| MappingError::IllegalArgument("tree node has no URI".to_string()))
}

/// In-memory tree of models
pub struct TreeIndex<T: TreeModel> {
    root: Option<String>,
    exclude_root: bool,
    nodes: IndexMap<String, T>,
    models_by_parent: FxHashMap<Option<String>, IndexSet<String>>,
    parent_by_model: FxHashMap<String, Option<String>>,
}

impl<T: TreeModel> Default for TreeIndex<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: TreeModel> TreeIndex<T> {
    pub fn new() -> Self {
        Self {
            root: None,
            exclude_root: false,
            nodes: IndexMap::new(),
            models_by_parent: FxHashMap::default(),
            parent_by_model: FxHashMap::default(),
        }
    }

    /// Index listing `root` as its only root, or its children when `exclude_root`
    pub fn with_root(root: impl AsRef<str>, exclude_root: bool) -> Self {
        Self {
            root: Some(normalize(root.as_ref())),
            exclude_root,
            ..Self::new()
        }
    }

    pub fn root(&self) -> Option<&str> {
        self.root.as_deref()
    }

    pub fn exclude_root(&self) -> bool {
        self.exclude_root
    }

    /// Index `model` under its parent, indexing loaded ancestors first.
    ///
    /// Returns false when the URI was already indexed; the stored instance is
    /// kept. Fails with [`MappingError::CyclicTree`] when the model would
    /// become its own ancestor.
    pub fn add_tree(&mut self, model: T) -> MappingResult<bool> {
        // new nodes from the model upwards, each with its parent URI
        let mut chain: Vec<(String, Option<String>, T)> = Vec::new();
        let mut in_chain = FxHashSet::default();
        let mut current = Some(model);

        while let Some(mut node) = current.take() {
            let uri = uri_of(&node)?;
            if self.nodes.contains_key(&uri) {
                break;
            }
            if !in_chain.insert(uri.clone()) {
                return Err(MappingError::CyclicTree(uri));
            }

            let (parent_uri, next) = match node.tree_mut().parent.take() {
                None => (None, None),
                Some(ParentRef::Uri(parent)) => (Some(normalize(&parent)), None),
                Some(ParentRef::Loaded(parent)) => (Some(uri_of(parent.as_ref())?), Some(*parent)),
            };
            node.tree_mut().parent = parent_uri.clone().map(ParentRef::Uri);
            chain.push((uri, parent_uri, node));
            current = next;
        }

        if chain.is_empty() {
            return Ok(false);
        }

        // the topmost new node must not hang below one of the new nodes
        let mut cursor = chain.last().and_then(|(_, parent, _)| parent.clone());
        while let Some(uri) = cursor {
            if in_chain.contains(&uri) {
                return Err(MappingError::CyclicTree(uri));
            }
            cursor = self.parent_by_model.get(&uri).cloned().flatten();
        }

        for (uri, parent, node) in chain.into_iter().rev() {
            self.models_by_parent
                .entry(parent.clone())
                .or_default()
                .insert(uri.clone());
            self.parent_by_model.insert(uri.clone(), parent);
            self.nodes.insert(uri, node);
        }
        Ok(true)
    }

    pub fn get(&self, uri: &str) -> Option<&T> {
        self.nodes.get(&normalize(uri))
    }

    pub fn contains(&self, uri: &str) -> bool {
        self.nodes.contains_key(&normalize(uri))
    }

    /// Number of indexed nodes
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    fn child_uris(&self, uri: &str) -> impl Iterator<Item = &String> {
        self.models_by_parent
            .get(&Some(normalize(uri)))
            .into_iter()
            .flatten()
    }

    /// Indexed children of `uri` in insertion order
    pub fn list_children(&self, uri: &str) -> Vec<&T> {
        self.child_uris(uri).filter_map(|c| self.nodes.get(c)).collect()
    }

    pub fn get_child_count(&self, uri: &str) -> usize {
        self.child_uris(uri).filter(|c| self.nodes.contains_key(*c)).count()
    }

    /// Nodes listed at the top level.
    ///
    /// Without a configured root these are the nodes without parent plus the
    /// nodes whose parent is not indexed.
    pub fn list_roots(&self) -> Vec<&T> {
        match &self.root {
            Some(root) if self.exclude_root => self.list_children(root),
            Some(root) => self.nodes.get(root).into_iter().collect(),
            None => self
                .nodes
                .iter()
                .filter(|(uri, _)| match self.parent_by_model.get(*uri) {
                    Some(Some(parent)) => !self.nodes.contains_key(parent),
                    _ => true,
                })
                .map(|(_, node)| node)
                .collect(),
        }
    }

    pub fn get_roots_count(&self) -> usize {
        self.list_roots().len()
    }

    /// Indexed parent of `uri`, also when the root is excluded from listings
    pub fn get_parent(&self, uri: &str) -> Option<&T> {
        self.parent_by_model
            .get(&normalize(uri))?
            .as_ref()
            .and_then(|parent| self.nodes.get(parent))
    }

    /// Pre-order walk from the listed roots, with depth (roots are depth 0)
    pub fn traverse<F>(&self, mut visit: F)
    where
        F: FnMut(&T, usize),
    {
        let mut stack: Vec<(&T, usize)> = self.list_roots().into_iter().rev().map(|n| (n, 0)).collect();
        while let Some((node, depth)) = stack.pop() {
            visit(node, depth);
            if let Some(uri) = node.resource().uri() {
                let children = self.list_children(uri);
                stack.extend(children.into_iter().rev().map(|c| (c, depth + 1)));
            }
        }
    }

    /// Copy the indexed children URIs into each node's tree link
    pub fn materialize_children(&mut self) {
        for (uri, node) in self.nodes.iter_mut() {
            let children = self
                .models_by_parent
                .get(&Some(uri.clone()))
                .map(|c| c.iter().cloned().collect())
                .unwrap_or_default();
            node.tree_mut().children = children;
        }
    }

    /// All indexed nodes in insertion order
    pub fn nodes(&self) -> impl Iterator<Item = &T> {
        self.nodes.values()
    }

    /// Consume the index, returning the nodes in insertion order
    pub fn into_nodes(self) -> Vec<T> {
        self.nodes.into_values().collect()
    }
}
