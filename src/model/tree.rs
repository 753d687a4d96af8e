//! Tree capability for hierarchical models

use crate::mapping::SparqlModel;

/// Parent of a tree node: either only its URI or a loaded ancestor
#[derive(Debug, Clone, PartialEq)]
pub enum ParentRef<T> {
    Uri(String),
    Loaded(Box<T>),
}

/// Parent and children links embedded in a tree model
#[derive(Debug, Clone, PartialEq)]
pub struct TreeLink<T> {
    pub parent: Option<ParentRef<T>>,
    /// Children URIs in insertion order
    pub children: Vec<String>,
}

impl<T> Default for TreeLink<T> {
    fn default() -> Self {
        Self {
            parent: None,
            children: Vec::new(),
        }
    }
}

impl<T: SparqlModel> TreeLink<T> {
    pub fn with_parent_uri(uri: impl Into<String>) -> Self {
        Self {
            parent: Some(ParentRef::Uri(uri.into())),
            children: Vec::new(),
        }
    }

    pub fn with_parent(parent: T) -> Self {
        Self {
            parent: Some(ParentRef::Loaded(Box::new(parent))),
            children: Vec::new(),
        }
    }

    /// URI of the parent, whether or not it is loaded
    pub fn parent_uri(&self) -> Option<&str> {
        match &self.parent {
            Some(ParentRef::Uri(uri)) => Some(uri),
            Some(ParentRef::Loaded(parent)) => parent.resource().uri(),
            None => None,
        }
    }
}

/// Model that takes part in a parent/child hierarchy
pub trait TreeModel: SparqlModel {
    fn tree(&self) -> &TreeLink<Self>;
    fn tree_mut(&mut self) -> &mut TreeLink<Self>;
}
