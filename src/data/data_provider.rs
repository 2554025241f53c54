//! Remote data provider contract
//!
//! A server-paginated view never sees the whole dataset. It asks a provider
//! for one page at a time and learns the end of the data from a short page.

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::debug;

use crate::data::column_schema::Column;
use crate::data::compound_fields::CompoundFields;
use crate::data::filter_evaluator::FilterEvaluator;
use crate::data::filter_spec::{FilterState, FilterValue};
use crate::data::record::Record;
use crate::data::sort_compare::{sort_indices, SortDirection, SortState};
use crate::pagination::PageRequest;

/// Everything a provider needs to produce one page
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PageQuery {
    pub page_index: usize,
    pub page_size: usize,
    pub sort: SortState,
    pub filters: FilterState,
}

impl PageQuery {
    pub fn new(request: PageRequest, sort: &SortState, filters: &FilterState) -> Self {
        Self {
            page_index: request.page_index,
            page_size: request.page_size,
            sort: sort.clone(),
            filters: filters.clone(),
        }
    }

    pub fn sort_field(&self) -> Option<&str> {
        self.sort
            .is_active()
            .then_some(self.sort.active_field.as_str())
    }

    pub fn sort_direction(&self) -> Option<SortDirection> {
        self.sort.is_active().then_some(self.sort.direction)
    }

    pub fn global_filter(&self) -> Option<&str> {
        self.filters
            .has_global()
            .then_some(self.filters.global_text.as_str())
    }

    pub fn column_filters(&self) -> impl Iterator<Item = (&str, &FilterValue)> {
        self.filters.columns()
    }

    /// Column filters in their wire form
    pub fn column_filters_json(&self) -> BTreeMap<String, Value> {
        self.filters.columns_as_json()
    }

    /// Row range this page covers in the filtered, sorted data
    pub fn offset(&self) -> usize {
        self.page_index * self.page_size
    }
}

/// Source of pages for a server-paginated view.
///
/// Returning fewer than `page_size` rows signals the end of the data.
#[async_trait]
pub trait RemoteDataProvider<R>: Send + Sync {
    async fn fetch_page(&self, query: &PageQuery) -> Result<Vec<R>>;
}

#[async_trait]
impl<R, P> RemoteDataProvider<R> for Arc<P>
where
    R: Send + 'static,
    P: RemoteDataProvider<R> + ?Sized,
{
    async fn fetch_page(&self, query: &PageQuery) -> Result<Vec<R>> {
        self.as_ref().fetch_page(query).await
    }
}

/// In-memory provider: filters, sorts and slices a vector the way a
/// backend would. Useful for tests and demos.
pub struct VecDataProvider<R> {
    rows: Vec<R>,
    columns: Vec<Column<R>>,
    compounds: CompoundFields,
}

impl<R: Record> VecDataProvider<R> {
    pub fn new(rows: Vec<R>) -> Self {
        Self {
            rows,
            columns: Vec::new(),
            compounds: CompoundFields::new(),
        }
    }

    /// Columns whose filter specs decide how column filters are applied
    pub fn with_columns(mut self, columns: Vec<Column<R>>) -> Self {
        self.columns = columns;
        self
    }

    pub fn with_compound_fields(mut self, compounds: CompoundFields) -> Self {
        self.compounds = compounds;
        self
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn push(&mut self, row: R) {
        self.rows.push(row);
    }

    /// The page `query` asks for
    pub fn page(&self, query: &PageQuery) -> Vec<R> {
        let evaluator = FilterEvaluator::new(&query.filters, &self.columns, &self.compounds);
        let mut indices = evaluator.filter_indices(&self.rows);
        sort_indices(&self.rows, &mut indices, &query.sort, &self.compounds, None);

        let page: Vec<R> = indices
            .into_iter()
            .skip(query.offset())
            .take(query.page_size)
            .filter_map(|idx| self.rows.get(idx).cloned())
            .collect();
        debug!(
            target: "pagination",
            "Serving page {} ({} rows of size {})",
            query.page_index,
            page.len(),
            query.page_size
        );
        page
    }
}

#[async_trait]
impl<R> RemoteDataProvider<R> for VecDataProvider<R>
where
    R: Record + Send + Sync + 'static,
{
    async fn fetch_page(&self, query: &PageQuery) -> Result<Vec<R>> {
        Ok(self.page(query))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn provider() -> VecDataProvider<Value> {
        VecDataProvider::new((0..34).map(|i| json!({ "n": i, "even": i % 2 == 0 })).collect())
    }

    fn query(page_index: usize, page_size: usize) -> PageQuery {
        PageQuery {
            page_index,
            page_size,
            sort: SortState::none(),
            filters: FilterState::new(),
        }
    }

    #[test]
    fn test_last_page_is_short() {
        let provider = provider();
        assert_eq!(provider.page(&query(2, 10)).len(), 10);
        assert_eq!(provider.page(&query(3, 10)).len(), 4);
        assert!(provider.page(&query(4, 10)).is_empty());
    }

    #[test]
    fn test_sort_applied_before_slicing() {
        let provider = provider();
        let mut q = query(0, 3);
        q.sort = SortState::new("n", SortDirection::Desc);
        let ns: Vec<i64> = provider.page(&q).iter().filter_map(|r| r["n"].as_i64()).collect();
        assert_eq!(ns, vec![33, 32, 31]);
    }

    #[test]
    fn test_filters_applied_before_slicing() {
        let provider = provider();
        let mut q = query(1, 10);
        q.filters.set_column("even", FilterValue::options(vec![json!(true)]));
        // 17 even numbers: the second page holds 7
        assert_eq!(provider.page(&q).len(), 7);
        assert_eq!(q.column_filters().count(), 1);
        assert_eq!(q.sort_field(), None);
    }

    #[tokio::test]
    async fn test_fetch_page_through_shared_provider() {
        let shared = Arc::new(provider());
        let rows: Vec<Value> = shared.fetch_page(&query(3, 10)).await.unwrap();
        assert_eq!(rows.len(), 4);
    }
}
