//! Data layer: records, filtering, sorting, column schema and the views
//!
//! The views never modify the rows they are given. Filter and sort produce
//! index lists over the source rows; pagination windows those lists.

pub mod column_schema;
pub mod compound_fields;
pub mod filter_evaluator;
pub mod filter_spec;
pub mod record;
pub mod sort_compare;

pub mod data_provider;
pub mod data_view;
pub mod server_view;
