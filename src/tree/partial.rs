//! Partially loaded trees
//!
//! Only a bounded frontier of a large hierarchy is indexed at a time.
//! Children are pulled through an injected lookup, and descendant counts
//! (used to tell whether a node can be expanded further) through an injected
//! count function. Both are called at most once per parent.

use super::index::{normalize, TreeIndex};
use crate::error::MappingResult;
use crate::model::{ParentRef, TreeModel};
use rustc_hash::{FxHashMap, FxHashSet};
use tracing::debug;

/// Children of a parent URI
pub type ChildrenLookup<'a, T> = Box<dyn FnMut(&str) -> MappingResult<Vec<T>> + 'a>;

/// Total number of descendants of a URI
pub type DescendantCount<'a> = Box<dyn FnMut(&str) -> MappingResult<usize> + 'a>;

pub struct PartialTreeIndex<'a, T: TreeModel> {
    index: TreeIndex<T>,
    lookup: ChildrenLookup<'a, T>,
    count: DescendantCount<'a>,
    counts: FxHashMap<String, usize>,
    loaded: FxHashSet<String>,
}

impl<'a, T: TreeModel> PartialTreeIndex<'a, T> {
    pub fn new<L, C>(index: TreeIndex<T>, lookup: L, count: C) -> Self
    where
        L: FnMut(&str) -> MappingResult<Vec<T>> + 'a,
        C: FnMut(&str) -> MappingResult<usize> + 'a,
    {
        Self {
            index,
            lookup: Box::new(lookup),
            count: Box::new(count),
            counts: FxHashMap::default(),
            loaded: FxHashSet::default(),
        }
    }

    pub fn add_tree(&mut self, model: T) -> MappingResult<bool> {
        self.index.add_tree(model)
    }

    /// Index the subtree below `uri` down to `max_depth` levels.
    ///
    /// Depth 1 loads the direct children. Returns the number of nodes added.
    pub fn load_children(&mut self, uri: &str, max_depth: usize) -> MappingResult<usize> {
        let mut added = 0;
        let mut frontier = vec![(normalize(uri), 0)];

        while let Some((parent, depth)) = frontier.pop() {
            if depth >= max_depth {
                continue;
            }
            if self.loaded.insert(parent.clone()) {
                let children = (self.lookup)(&parent)?;
                debug!("Loaded {} children of {} at depth {}", children.len(), parent, depth);

                for mut child in children {
                    if child.tree().parent.is_none() {
                        child.tree_mut().parent = Some(ParentRef::Uri(parent.clone()));
                    }
                    if self.index.add_tree(child)? {
                        added += 1;
                    }
                }
            }
            // already loaded parents are expanded from the index
            let children: Vec<String> = self
                .index
                .list_children(&parent)
                .into_iter()
                .filter_map(|c| c.resource().uri().map(normalize))
                .collect();
            frontier.extend(children.into_iter().map(|c| (c, depth + 1)));
        }
        Ok(added)
    }

    /// Whether the children of `uri` were already requested
    pub fn is_loaded(&self, uri: &str) -> bool {
        self.loaded.contains(&normalize(uri))
    }

    /// Descendant count of `uri`, cached after the first call
    pub fn descendant_count(&mut self, uri: &str) -> MappingResult<usize> {
        let key = normalize(uri);
        if let Some(count) = self.counts.get(&key) {
            return Ok(*count);
        }
        let count = (self.count)(&key)?;
        self.counts.insert(key, count);
        Ok(count)
    }

    /// Whether `uri` has descendants that are not indexed yet
    pub fn has_more(&mut self, uri: &str) -> MappingResult<bool> {
        let indexed = self.indexed_descendants(uri);
        Ok(self.descendant_count(uri)? > indexed)
    }

    /// Number of descendants of `uri` currently in the index
    pub fn indexed_descendants(&self, uri: &str) -> usize {
        let mut count = 0;
        let mut pending = vec![normalize(uri)];
        while let Some(parent) = pending.pop() {
            for child in self.index.list_children(&parent) {
                count += 1;
                if let Some(child_uri) = child.resource().uri() {
                    pending.push(normalize(child_uri));
                }
            }
        }
        count
    }

    pub fn index(&self) -> &TreeIndex<T> {
        &self.index
    }

    pub fn into_index(self) -> TreeIndex<T> {
        self.index
    }
}
