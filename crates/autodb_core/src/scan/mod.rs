//! Entity discovery for database contexts.

pub mod table_search;

pub use table_search::{ConventionTableSearch, ExplicitTableSearch, TableSearch};
