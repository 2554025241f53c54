pub mod actions;
pub mod config;
pub mod data;
pub mod debouncer;
pub mod loaders;
pub mod logging;
pub mod pagination;
pub mod selection;
pub mod state;
pub mod table_display;

pub use config::GridConfig;
pub use data::column_schema::{Column, ColumnEdit, ColumnEditor, ColumnKind, ColumnSet};
pub use data::compound_fields::{CompoundField, CompoundFields};
pub use data::data_provider::{PageQuery, RemoteDataProvider, VecDataProvider};
pub use data::data_view::DataView;
pub use data::filter_spec::{FilterKind, FilterSpec, FilterState, FilterValue};
pub use data::record::Record;
pub use data::server_view::ServerView;
pub use data::sort_compare::{SortDirection, SortState};
pub use pagination::{ClientPaginator, PageRequest, PageResponse, Paginator, ServerPaginator};
pub use selection::{SelectAllState, SelectionTracker};
