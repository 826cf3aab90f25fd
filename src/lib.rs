//! Sift - A search query expression language
//!
//! This is the root workspace crate that provides integration tests.
//! The actual implementation is in the workspace member crates.

// Re-export main crates for convenience
pub use sift_ast as ast;
pub use sift_lexer as lexer;
pub use sift_parser as parser;
pub use sift_query as query;

pub use sift_query::{ConditionBuilder, CursorDetails, QueryError, SearchQuery};
