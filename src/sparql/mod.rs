//! SPARQL query synthesis
//!
//! Queries and updates are built as spargebra algebra and rendered with its
//! `Display` implementation.
//!
//! - [`QuerySynthesizer`]: descriptor-driven select/ask/count/insert/delete
//! - [`MultiGraphQuery`]: batched existence checks with union semantics

mod algebra;
mod filter;
mod multi_graph;
mod results;
mod synthesizer;
mod text;

pub use filter::{Filter, OrderBy, SelectOptions};
pub use multi_graph::{MultiGraphQuery, ResourceStream, UriStream};
pub use results::QuerySolution;
pub use spargebra::{Query, Update};
pub use synthesizer::{QuerySynthesizer, COUNT_VARIABLE, RELATION_VARIABLES};
pub use text::{validate_query, validate_update};

pub(crate) use algebra::RESERVED_PREFIX;
pub(crate) use multi_graph::BatchStream;
