//! Row selection partitioned by page index
//!
//! A row counts as selected only on the page it was selected on. Within a
//! page, rows are recognised by [`Record::row_key`], so an equal row value
//! fetched again for the same page is still selected.

use std::collections::BTreeMap;
use tracing::{debug, trace};

use crate::data::record::Record;

/// State of a "select all" checkbox over the rows of one page
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectAllState {
    None,
    Some,
    All,
}

#[derive(Debug, Clone)]
pub struct SelectionTracker<R> {
    /// page index -> selected rows in selection order, keyed by row key
    partitions: BTreeMap<usize, Vec<(String, R)>>,
}

impl<R: Record> SelectionTracker<R> {
    pub fn new() -> Self {
        Self {
            partitions: BTreeMap::new(),
        }
    }

    pub fn select(&mut self, row: &R, page_index: usize) {
        let key = row.row_key();
        let partition = self.partitions.entry(page_index).or_default();
        if partition.iter().any(|(k, _)| *k == key) {
            return;
        }
        trace!(target: "selection", "Selecting {} on page {}", key, page_index);
        partition.push((key, row.clone()));
    }

    /// Deselect a row; an emptied partition is removed
    pub fn deselect(&mut self, row: &R, page_index: usize) {
        let Some(partition) = self.partitions.get_mut(&page_index) else {
            return;
        };
        let key = row.row_key();
        partition.retain(|(k, _)| *k != key);
        if partition.is_empty() {
            debug!(target: "selection", "Page {} has no selection left", page_index);
            self.partitions.remove(&page_index);
        }
    }

    pub fn toggle(&mut self, row: &R, page_index: usize, checked: bool) {
        if checked {
            self.select(row, page_index);
        } else {
            self.deselect(row, page_index);
        }
    }

    pub fn is_selected(&self, row: &R, page_index: usize) -> bool {
        self.partitions.get(&page_index).is_some_and(|partition| {
            let key = row.row_key();
            partition.iter().any(|(k, _)| *k == key)
        })
    }

    pub fn select_all_on_page(&mut self, rows: &[R], page_index: usize) {
        for row in rows {
            self.select(row, page_index);
        }
    }

    pub fn deselect_all_on_page(&mut self, rows: &[R], page_index: usize) {
        for row in rows {
            self.deselect(row, page_index);
        }
    }

    /// Header checkbox toggle: select or deselect every visible row
    pub fn toggle_all_on_page(&mut self, rows: &[R], page_index: usize, checked: bool) {
        if checked {
            self.select_all_on_page(rows, page_index);
        } else {
            self.deselect_all_on_page(rows, page_index);
        }
    }

    pub fn clear_all(&mut self) {
        debug!(target: "selection", "Clearing {} selected rows", self.selected_count());
        self.partitions.clear();
    }

    /// Every visible row on the page is selected. An empty page is not.
    pub fn all_selected(&self, rows_on_page: &[R], page_index: usize) -> bool {
        !rows_on_page.is_empty() && rows_on_page.iter().all(|row| self.is_selected(row, page_index))
    }

    /// At least one but not every visible row is selected
    pub fn some_selected(&self, rows_on_page: &[R], page_index: usize) -> bool {
        rows_on_page.iter().any(|row| self.is_selected(row, page_index))
            && !self.all_selected(rows_on_page, page_index)
    }

    pub fn select_all_state(&self, rows_on_page: &[R], page_index: usize) -> SelectAllState {
        if self.all_selected(rows_on_page, page_index) {
            SelectAllState::All
        } else if self.some_selected(rows_on_page, page_index) {
            SelectAllState::Some
        } else {
            SelectAllState::None
        }
    }

    /// All selected rows, by page index then selection order
    pub fn get_all_selected(&self) -> Vec<R> {
        self.partitions
            .values()
            .flat_map(|partition| partition.iter().map(|(_, row)| row.clone()))
            .collect()
    }

    pub fn selected_on_page(&self, page_index: usize) -> usize {
        self.partitions.get(&page_index).map_or(0, Vec::len)
    }

    pub fn selected_count(&self) -> usize {
        self.partitions.values().map(Vec::len).sum()
    }

    /// Pages that currently hold at least one selected row
    pub fn pages(&self) -> impl Iterator<Item = usize> + '_ {
        self.partitions.keys().copied()
    }

    pub fn is_empty(&self) -> bool {
        self.partitions.is_empty()
    }
}

impl<R: Record> Default for SelectionTracker<R> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Value};

    fn rows(ids: &[i64]) -> Vec<Value> {
        ids.iter().map(|id| json!({ "id": id })).collect()
    }

    #[test]
    fn test_select_then_deselect_removes_partition() {
        let mut tracker = SelectionTracker::new();
        let row = json!({"id": 1});
        tracker.select(&row, 2);
        assert!(tracker.is_selected(&row, 2));
        assert_eq!(tracker.pages().collect::<Vec<_>>(), vec![2]);

        tracker.deselect(&row, 2);
        assert!(!tracker.is_selected(&row, 2));
        assert!(tracker.is_empty());
    }

    #[test]
    fn test_pages_are_independent() {
        let mut tracker = SelectionTracker::new();
        let page_a = rows(&[1, 2, 3]);
        let page_b = rows(&[4, 5]);
        tracker.select_all_on_page(&page_a, 0);

        for row in &page_b {
            assert!(!tracker.is_selected(row, 1));
        }
        // the same value on another page is tracked separately
        assert!(!tracker.is_selected(&page_a[0], 1));
        assert!(tracker.is_selected(&page_a[0], 0));
    }

    #[test]
    fn test_tri_state_over_visible_rows() {
        let mut tracker = SelectionTracker::new();
        let page = rows(&[1, 2, 3]);
        assert_eq!(tracker.select_all_state(&page, 0), SelectAllState::None);

        tracker.select(&page[1], 0);
        assert!(tracker.some_selected(&page, 0));
        assert!(!tracker.all_selected(&page, 0));
        assert_eq!(tracker.select_all_state(&page, 0), SelectAllState::Some);

        tracker.toggle_all_on_page(&page, 0, true);
        assert!(tracker.all_selected(&page, 0));
        assert!(!tracker.some_selected(&page, 0));

        assert!(!tracker.all_selected(&[], 0));
    }

    #[test]
    fn test_selecting_twice_keeps_one_entry() {
        let mut tracker = SelectionTracker::new();
        let row = json!({"id": 7});
        tracker.select(&row, 0);
        tracker.select(&json!({"id": 7}), 0);
        assert_eq!(tracker.selected_count(), 1);
    }

    #[test]
    fn test_all_selected_ordered_by_page() {
        let mut tracker = SelectionTracker::new();
        tracker.select(&json!({"id": 30}), 3);
        tracker.select(&json!({"id": 10}), 1);
        tracker.select(&json!({"id": 11}), 1);
        let ids: Vec<i64> = tracker
            .get_all_selected()
            .iter()
            .filter_map(|r| r["id"].as_i64())
            .collect();
        assert_eq!(ids, vec![10, 11, 30]);

        tracker.clear_all();
        assert!(tracker.get_all_selected().is_empty());
    }
}
