//! Tree indexing for hierarchical models
//!
//! - [`TreeIndex`]: full in-memory parent/children index
//! - [`PartialTreeIndex`]: depth-bounded lazy loading on top of it

mod index;
mod partial;

pub use index::TreeIndex;
pub use partial::{ChildrenLookup, DescendantCount, PartialTreeIndex};
