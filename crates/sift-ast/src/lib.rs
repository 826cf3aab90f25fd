//! Sift AST - Core types for search queries
//!
//! This crate defines spans, literal values, property references, the
//! arena-backed condition tree, the clause set, and the two canonical
//! encodings of a query: query text ([`ToQuery`]) and the JSON wire format.

mod span;
mod value;
mod condition;
mod query;
mod error;
mod printer;
mod json;

pub use span::*;
pub use value::*;
pub use condition::*;
pub use query::*;
pub use error::*;
pub use printer::*;
