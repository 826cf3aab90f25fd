//! Sift Query - High-level query API
//!
//! - [`SearchQuery`]: parse, compare and serialize whole queries
//! - [`ConditionBuilder`]: build condition trees without writing text
//! - [`CursorDetails`]: what sits under the caret in a query editor

mod builder;
mod cursor;
mod error;
mod lookup;
mod search;

pub use builder::*;
pub use cursor::*;
pub use error::*;
pub use lookup::*;
pub use search::*;
