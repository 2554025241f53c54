//! Configuration module
//!
//! Grid view settings loaded from TOML, with defaults for every field.

#[allow(clippy::module_inception)]
pub mod config;

pub use config::{ColumnConfig, GridConfig, InitialSort, PaginationConfig, RowConfig, SearchConfig};
