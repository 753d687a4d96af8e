//! Model-side building blocks
//!
//! Models are plain structs that embed a [`ResourceModel`] (and a
//! [`TreeLink`] when hierarchical) and store their fields as ordinary Rust
//! values. [`Value`] is the typed bridge between those fields and RDF terms.

mod resource;
mod tree;
mod value;

pub use resource::{Relation, ResourceModel};
pub use tree::{ParentRef, TreeLink, TreeModel};
pub use value::{Datatype, Value};
