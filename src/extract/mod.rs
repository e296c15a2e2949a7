//! Readers that turn files into in-memory tables.

pub mod nested;
pub mod tabular;

pub use nested::{extract_nested, flatten};
pub use tabular::extract_tabular;
