//! The keyed record set behind every table: unique keys, a maintained sort
//! order, and a non-destructive substring filter.

use std::{cmp::Ordering, collections::HashMap};

use ratatui::widgets::Row;
use serde::{de::DeserializeOwned, Serialize};

/// A record that can live in a [`ResultSet`]: it knows its own stable key,
/// the projection of itself into table cells, and how to order itself
/// against another record by column.
pub trait TableRecord: Clone + Send + Sync + Serialize + DeserializeOwned + 'static {
    /// One-to-one with the real-world identity of the record: an issue or PR
    /// number within a repository, a repository full name, a notification
    /// thread id.
    fn key(&self) -> String;

    fn header() -> Vec<&'static str>;

    /// The display fields; also the haystack for the search filter.
    fn cells(&self) -> Vec<String>;

    fn cmp_by_column(&self, other: &Self, column: usize) -> Ordering;

    fn row(&self) -> Row<'_> {
        Row::new(self.cells())
    }
}

/// Key → record map plus the keys in display order. A later upsert of an
/// existing key replaces the record; position is always decided by the
/// configured sort, never by insertion order.
#[derive(Debug, Clone)]
pub struct ResultSet<T: TableRecord> {
    records: HashMap<String, T>,
    order: Vec<String>,
    sort_column: usize,
    reverse: bool,
}

impl<T: TableRecord> ResultSet<T> {
    pub fn new(sort_column: usize, reverse: bool) -> Self {
        Self { records: HashMap::new(), order: Vec::new(), sort_column, reverse }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn get(&self, key: &str) -> Option<&T> {
        self.records.get(key)
    }

    pub fn upsert(&mut self, record: T) {
        let key = record.key();
        if self.records.insert(key.clone(), record).is_none() {
            self.order.push(key);
        }
        self.resort();
    }

    /// Like repeated [`ResultSet::upsert`] but with a single re-sort at the
    /// end.
    pub fn upsert_many(&mut self, records: impl IntoIterator<Item = T>) {
        for record in records {
            let key = record.key();
            if self.records.insert(key.clone(), record).is_none() {
                self.order.push(key);
            }
        }
        self.resort();
    }

    /// Removing an absent key is a no-op.
    pub fn remove(&mut self, key: &str) {
        if self.records.remove(key).is_some() {
            self.order.retain(|k| k != key);
        }
    }

    pub fn clear(&mut self) {
        self.records.clear();
        self.order.clear();
    }

    pub fn set_sort(&mut self, sort_column: usize, reverse: bool) {
        self.sort_column = sort_column;
        self.reverse = reverse;
        self.resort();
    }

    pub fn sort_column(&self) -> usize {
        self.sort_column
    }

    /// All records in display order.
    pub fn records(&self) -> impl Iterator<Item = &T> {
        self.order.iter().filter_map(|key| self.records.get(key))
    }

    /// Case-insensitive substring match over the concatenated cells. The
    /// empty query matches everything. Never mutates the set; clearing the
    /// query restores the full view.
    pub fn filter(&self, query: &str) -> Vec<&T> {
        let needle = query.trim().to_lowercase();
        self.records()
            .filter(|record| needle.is_empty() || record.cells().join(" ").to_lowercase().contains(&needle))
            .collect()
    }

    fn resort(&mut self) {
        let records = &self.records;
        let column = self.sort_column;
        self.order.sort_by(|a, b| {
            match (records.get(a), records.get(b)) {
                (Some(ra), Some(rb)) => ra.cmp_by_column(rb, column),
                _ => Ordering::Equal,
            }
        });
        if self.reverse {
            self.order.reverse();
        }
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use serde::Deserialize;

    use super::*;

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Item {
        key: String,
        value: i64,
        label: String,
    }

    fn item(key: &str, value: i64, label: &str) -> Item {
        Item { key: key.into(), value, label: label.into() }
    }

    impl TableRecord for Item {
        fn key(&self) -> String {
            self.key.clone()
        }

        fn header() -> Vec<&'static str> {
            vec!["Key", "Value", "Label"]
        }

        fn cells(&self) -> Vec<String> {
            vec![self.key.clone(), self.value.to_string(), self.label.clone()]
        }

        fn cmp_by_column(&self, other: &Self, column: usize) -> Ordering {
            match column {
                1 => self.value.cmp(&other.value),
                2 => self.label.cmp(&other.label),
                _ => self.key.cmp(&other.key),
            }
        }
    }

    #[test]
    fn test_distinct_keys_grow_the_set() {
        let mut set = ResultSet::new(0, false);
        set.upsert(item("1", 5, "alpha"));
        set.upsert(item("2", 3, "beta"));
        set.upsert(item("3", 4, "gamma"));
        assert_eq!(set.len(), 3);
    }

    #[test]
    fn test_upsert_same_key_replaces_in_place() {
        let mut set = ResultSet::new(0, false);
        set.upsert(item("1", 5, "alpha"));
        set.upsert(item("1", 9, "replaced"));
        assert_eq!(set.len(), 1);
        assert_eq!(set.get("1").unwrap().value, 9);
        assert_eq!(set.get("1").unwrap().label, "replaced");
    }

    #[test]
    fn test_sorted_ascending_by_numeric_column() {
        let mut set = ResultSet::new(1, false);
        set.upsert(item("1", 5, "alpha"));
        set.upsert(item("2", 3, "beta"));
        let keys: Vec<&str> = set.records().map(|r| r.key.as_str()).collect();
        assert_eq!(keys, vec!["2", "1"]);
    }

    #[test]
    fn test_sorted_descending_when_reversed() {
        let mut set = ResultSet::new(1, true);
        set.upsert_many(vec![item("1", 5, "alpha"), item("2", 3, "beta"), item("3", 8, "gamma")]);
        let keys: Vec<&str> = set.records().map(|r| r.key.as_str()).collect();
        assert_eq!(keys, vec!["3", "1", "2"]);
    }

    #[test]
    fn test_remove_missing_key_is_a_noop() {
        let mut set = ResultSet::new(0, false);
        set.upsert(item("1", 5, "alpha"));
        set.remove("does-not-exist");
        assert_eq!(set.len(), 1);
        set.remove("1");
        assert!(set.is_empty());
    }

    #[test]
    fn test_empty_filter_returns_everything_in_order() {
        let mut set = ResultSet::new(1, false);
        set.upsert_many(vec![item("1", 5, "alpha"), item("2", 3, "beta")]);
        let all: Vec<&str> = set.filter("").iter().map(|r| r.key.as_str()).collect();
        let unfiltered: Vec<&str> = set.records().map(|r| r.key.as_str()).collect();
        assert_eq!(all, unfiltered);
    }

    #[test]
    fn test_filter_is_case_insensitive_and_idempotent() {
        let mut set = ResultSet::new(0, false);
        set.upsert_many(vec![item("1", 5, "Alpha"), item("2", 3, "beta"), item("3", 4, "alphabet")]);
        let first: Vec<String> = set.filter("ALPHA").iter().map(|r| r.key.clone()).collect();
        let second: Vec<String> = set.filter("ALPHA").iter().map(|r| r.key.clone()).collect();
        assert_eq!(first, vec!["1", "3"]);
        assert_eq!(first, second);
    }

    #[test]
    fn test_filter_does_not_mutate_the_set() {
        let mut set = ResultSet::new(0, false);
        set.upsert_many(vec![item("1", 5, "alpha"), item("2", 3, "beta")]);
        assert_eq!(set.filter("beta").len(), 1);
        assert_eq!(set.len(), 2);
        assert_eq!(set.filter("").len(), 2);
    }

    #[test]
    fn test_upsert_resorts_replaced_records() {
        let mut set = ResultSet::new(1, false);
        set.upsert_many(vec![item("1", 1, "alpha"), item("2", 2, "beta")]);
        set.upsert(item("1", 10, "alpha"));
        let keys: Vec<&str> = set.records().map(|r| r.key.as_str()).collect();
        assert_eq!(keys, vec!["2", "1"]);
    }
}
