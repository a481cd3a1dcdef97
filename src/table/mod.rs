//! The lazily paginated, searchable, cache backed table behind every list
//! pane: a [`ResultSet`] for the records, a [`Pager`] for when to fetch, the
//! last applied search query, and the cache file the records snapshot to.

pub mod loader;
pub mod result_set;

use std::sync::Arc;

use futures::future::BoxFuture;
use tracing::{debug, warn};

use crate::{
    cache::{CacheScope, TableCache},
    github::client::ApiError,
    table::{
        loader::Pager,
        result_set::{ResultSet, TableRecord},
    },
};

/// An async page fetch: (batch_size, batch_number) -> records.
pub type LoadFn<T> = Arc<dyn Fn(usize, usize) -> BoxFuture<'static, Result<Vec<T>, ApiError>> + Send + Sync>;

/// A fetch the pager has approved. The single-flight guard is already armed;
/// whoever holds this must eventually report back via
/// [`LazyTable::finish_load`] or [`LazyTable::abort_load`].
pub struct PendingFetch<T> {
    pub batch: usize,
    fut: BoxFuture<'static, Result<Vec<T>, ApiError>>,
}

impl<T> PendingFetch<T> {
    pub async fn run(self) -> Result<Vec<T>, ApiError> {
        self.fut.await
    }
}

pub struct LazyTable<T: TableRecord> {
    records: ResultSet<T>,
    pager: Pager,
    query: String,
    cache: TableCache,
    scope: CacheScope,
    category: &'static str,
    load_fn: Option<LoadFn<T>>,
    selected_row: usize,
}

impl<T: TableRecord> LazyTable<T> {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        cache: TableCache,
        scope: CacheScope,
        category: &'static str,
        sort_column: usize,
        reverse: bool,
        batch_size: usize,
        buffer: usize,
    ) -> Self {
        Self {
            records: ResultSet::new(sort_column, reverse),
            pager: Pager::new(batch_size, buffer),
            query: String::new(),
            cache,
            scope,
            category,
            load_fn: None,
            selected_row: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn current_batch(&self) -> usize {
        self.pager.current_batch()
    }

    pub fn is_exhausted(&self) -> bool {
        self.pager.is_exhausted()
    }

    pub fn selected_row(&self) -> usize {
        self.selected_row
    }

    /// Shows whatever the cache has for the current (scope, category) so the
    /// user sees stale rows instantly; the pager is untouched, so the first
    /// network page still fetches and overwrites them. Read errors degrade
    /// to an empty table.
    pub fn hydrate_from_cache(&mut self) {
        let cached: Vec<T> = self.cache.load(&self.scope, self.category);
        if !cached.is_empty() {
            debug!("Hydrated {} {} rows from cache", cached.len(), self.category);
            self.records.upsert_many(cached);
        }
    }

    /// Swaps the table to a new parent context: new cache scope, empty
    /// record set, pager back to batch 0.
    pub fn set_scope(&mut self, scope: CacheScope) {
        self.scope = scope;
        self.clear();
    }

    pub fn set_load_fn(&mut self, load_fn: LoadFn<T>) {
        self.load_fn = Some(load_fn);
    }

    pub fn clear_load_fn(&mut self) {
        self.load_fn = None;
    }

    /// Removes all rows and resets pagination. The search query survives, as
    /// does the load function.
    pub fn clear(&mut self) {
        self.records.clear();
        self.pager.reset();
        self.selected_row = 0;
    }

    /// Merges records into the set (deduplicating by key, overwriting stale
    /// entries) and snapshots the full set to the cache file. One disk write
    /// per batch, not per record.
    pub fn add_items(&mut self, items: Vec<T>) {
        if items.is_empty() {
            return;
        }
        self.records.upsert_many(items);
        self.save_cache();
    }

    pub fn add_item(&mut self, item: T) {
        self.records.upsert(item);
        self.save_cache();
    }

    pub fn remove(&mut self, key: &str) {
        self.records.remove(key);
        self.save_cache();
        self.clamp_cursor();
    }

    pub fn get(&self, key: &str) -> Option<&T> {
        self.records.get(key)
    }

    fn save_cache(&self) {
        if let Err(err) = self.cache.save(&self.scope, self.category, &self.records.records().cloned().collect::<Vec<_>>()) {
            // A failed snapshot only costs freshness on the next launch.
            warn!("Failed to write {} cache: {err}", self.category);
        }
    }

    pub fn apply_search(&mut self, query: &str) {
        self.query = query.to_string();
        self.clamp_cursor();
    }

    pub fn search_query(&self) -> &str {
        &self.query
    }

    /// The records currently visible under the active search query, in
    /// display order.
    pub fn visible(&self) -> Vec<&T> {
        self.records.filter(&self.query)
    }

    pub fn selected(&self) -> Option<&T> {
        self.visible().get(self.selected_row).copied()
    }

    pub fn set_sort(&mut self, column: usize, reverse: bool) {
        self.records.set_sort(column, reverse);
    }

    pub fn sort_column(&self) -> usize {
        self.records.sort_column()
    }

    pub fn cursor_up(&mut self, rows: usize) {
        self.selected_row = self.selected_row.saturating_sub(rows);
    }

    pub fn cursor_down(&mut self, rows: usize) {
        let visible = self.visible().len();
        self.selected_row = std::cmp::min(self.selected_row + rows, visible.saturating_sub(1));
    }

    fn clamp_cursor(&mut self) {
        let visible = self.visible().len();
        self.selected_row = std::cmp::min(self.selected_row, visible.saturating_sub(1));
    }

    /// Asks the pager whether the cursor has scrolled close enough to the
    /// end of the loaded rows for the next page. Returns the approved fetch
    /// for the caller to spawn or await.
    pub fn start_load(&mut self) -> Option<PendingFetch<T>> {
        self.start_load_at(self.selected_row)
    }

    /// Pager-only variants for tables whose fetch cannot be a [`LoadFn`]
    /// returning `T` (the issues endpoint yields a mixed page that is split
    /// after the fetch). The caller owns the request and must report back via
    /// [`LazyTable::finish_load_counted`] or [`LazyTable::abort_load`].
    pub fn request_batch(&mut self) -> Option<usize> {
        self.pager.poll(self.selected_row, self.records.len())
    }

    pub fn request_refresh(&mut self) -> Option<usize> {
        self.pager.reset();
        self.pager.force_poll()
    }

    pub fn batch_size(&self) -> usize {
        self.pager.batch_size()
    }

    pub fn start_load_at(&mut self, cursor_row: usize) -> Option<PendingFetch<T>> {
        let load_fn = self.load_fn.clone()?;
        let batch = self.pager.poll(cursor_row, self.records.len())?;
        let fut = load_fn(self.pager.batch_size(), batch);
        Some(PendingFetch { batch, fut })
    }

    /// An unconditional page-1 fetch for refresh and initial load, where the
    /// prefetch buffer check does not apply. Still subject to the
    /// single-flight guard.
    pub fn start_refresh(&mut self) -> Option<PendingFetch<T>> {
        let load_fn = self.load_fn.clone()?;
        self.pager.reset();
        let batch = self.pager.force_poll()?;
        let fut = load_fn(self.pager.batch_size(), batch);
        Some(PendingFetch { batch, fut })
    }

    pub fn finish_load(&mut self, items: Vec<T>) {
        let fetched = items.len();
        self.finish_load_counted(fetched, items);
    }

    /// For endpoints where the page length and the kept records differ: the
    /// issues endpoint returns issues and pull requests interleaved, so the
    /// exhaustion check must count the raw page, not the records this table
    /// keeps from it.
    pub fn finish_load_counted(&mut self, fetched: usize, items: Vec<T>) {
        self.pager.complete(fetched);
        self.add_items(items);
    }

    pub fn abort_load(&mut self) {
        self.pager.fail();
    }

    /// poll → fetch → merge → cache write, in one awaited step. The UI
    /// spawns fetches instead; this is the direct-drive path.
    pub async fn maybe_load_more(&mut self, cursor_row: usize) -> Result<bool, ApiError> {
        let Some(fetch) = self.start_load_at(cursor_row) else {
            return Ok(false);
        };
        match fetch.run().await {
            Ok(items) => {
                self.finish_load(items);
                Ok(true)
            },
            Err(err) => {
                self.abort_load();
                Err(err)
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering as AtomicOrdering};

    use pretty_assertions::assert_eq;
    use serde::{Deserialize, Serialize};

    use super::*;

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Item {
        number: u64,
        title: String,
    }

    fn item(number: u64) -> Item {
        Item { number, title: format!("item {number}") }
    }

    impl TableRecord for Item {
        fn key(&self) -> String {
            self.number.to_string()
        }

        fn header() -> Vec<&'static str> {
            vec!["#", "Title"]
        }

        fn cells(&self) -> Vec<String> {
            vec![self.number.to_string(), self.title.clone()]
        }

        fn cmp_by_column(&self, other: &Self, column: usize) -> std::cmp::Ordering {
            match column {
                1 => self.title.cmp(&other.title),
                _ => self.number.cmp(&other.number),
            }
        }
    }

    fn table(dir: &std::path::Path, batch_size: usize) -> LazyTable<Item> {
        LazyTable::new(TableCache::new(dir), CacheScope::repo("octo/repo"), "issues", 0, false, batch_size, 5)
    }

    /// A load function serving 30, 30, then 10 records, counting every call.
    fn paged_load_fn(calls: Arc<AtomicUsize>) -> LoadFn<Item> {
        Arc::new(move |batch_size, batch| {
            calls.fetch_add(1, AtomicOrdering::SeqCst);
            Box::pin(async move {
                let count = match batch {
                    1 | 2 => batch_size,
                    3 => 10,
                    _ => 0,
                };
                let start = (batch - 1) as u64 * batch_size as u64;
                Ok((0..count as u64).map(|i| item(start + i)).collect())
            })
        })
    }

    #[tokio::test]
    async fn test_three_pages_then_exhausted() {
        let dir = tempfile::tempdir().unwrap();
        let calls = Arc::new(AtomicUsize::new(0));
        let mut table = table(dir.path(), 30);
        table.set_load_fn(paged_load_fn(calls.clone()));

        assert!(table.maybe_load_more(0).await.unwrap());
        assert_eq!(table.len(), 30);
        assert!(table.maybe_load_more(28).await.unwrap());
        assert_eq!(table.len(), 60);
        assert!(table.maybe_load_more(57).await.unwrap());

        assert_eq!(table.len(), 70);
        assert_eq!(table.current_batch(), 3);
        assert!(table.is_exhausted());

        // A fourth trigger makes no fetch call and changes nothing.
        assert!(!table.maybe_load_more(69).await.unwrap());
        assert_eq!(table.len(), 70);
        assert_eq!(calls.load(AtomicOrdering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_no_fetch_while_cursor_is_far_from_the_end() {
        let dir = tempfile::tempdir().unwrap();
        let calls = Arc::new(AtomicUsize::new(0));
        let mut table = table(dir.path(), 30);
        table.set_load_fn(paged_load_fn(calls.clone()));

        table.maybe_load_more(0).await.unwrap();
        assert!(!table.maybe_load_more(0).await.unwrap());
        assert_eq!(calls.load(AtomicOrdering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_failed_fetch_leaves_state_unchanged() {
        let dir = tempfile::tempdir().unwrap();
        let mut table = table(dir.path(), 30);
        let attempts = Arc::new(AtomicUsize::new(0));
        let attempts_in_fn = attempts.clone();
        table.set_load_fn(Arc::new(move |batch_size, batch| {
            let attempt = attempts_in_fn.fetch_add(1, AtomicOrdering::SeqCst);
            Box::pin(async move {
                if attempt == 0 {
                    Err(ApiError::Invalid("connection reset".into()))
                } else {
                    Ok((0..batch_size as u64).map(|i| item((batch - 1) as u64 * 100 + i)).collect())
                }
            })
        }));

        assert!(table.maybe_load_more(0).await.is_err());
        assert_eq!(table.len(), 0);
        assert_eq!(table.current_batch(), 0);
        assert!(!table.is_exhausted());

        // The retry requests the same batch again.
        assert!(table.maybe_load_more(0).await.unwrap());
        assert_eq!(table.current_batch(), 1);
        assert_eq!(table.len(), 30);
    }

    #[tokio::test]
    async fn test_network_page_overwrites_hydrated_cache_rows() {
        let dir = tempfile::tempdir().unwrap();
        let cache = TableCache::new(dir.path());
        let scope = CacheScope::repo("octo/repo");
        cache
            .save(&scope, "issues", &[Item { number: 0, title: "stale title".into() }, item(1)])
            .unwrap();

        let mut table = table(dir.path(), 30);
        table.hydrate_from_cache();
        assert_eq!(table.len(), 2);
        assert_eq!(table.get("0").unwrap().title, "stale title");

        table.set_load_fn(paged_load_fn(Arc::new(AtomicUsize::new(0))));
        let fetch = table.start_refresh().expect("refresh fetch should be approved");
        let items = fetch.run().await.unwrap();
        table.finish_load(items);

        // Key 0 was overwritten by the fresh record, not duplicated.
        assert_eq!(table.len(), 30);
        assert_eq!(table.get("0").unwrap().title, "item 0");

        // And the merged set was snapshotted back to disk.
        let reloaded: Vec<Item> = cache.load(&scope, "issues");
        assert_eq!(reloaded.len(), 30);
    }

    #[test]
    fn test_clear_resets_pagination() {
        let dir = tempfile::tempdir().unwrap();
        let mut table = table(dir.path(), 30);
        table.add_items((0..40).map(item).collect());
        table.clear();
        assert!(table.is_empty());
        assert_eq!(table.current_batch(), 0);
        assert!(!table.is_exhausted());
    }

    #[test]
    fn test_search_narrows_and_restores() {
        let dir = tempfile::tempdir().unwrap();
        let mut table = table(dir.path(), 30);
        table.add_items(vec![item(1), item(12), item(2)]);
        table.apply_search("item 1");
        assert_eq!(table.visible().len(), 2);
        table.apply_search("");
        assert_eq!(table.visible().len(), 3);
    }

    #[test]
    fn test_selected_follows_the_filtered_view() {
        let dir = tempfile::tempdir().unwrap();
        let mut table = table(dir.path(), 30);
        table.add_items(vec![item(1), item(2), item(3)]);
        table.cursor_down(2);
        assert_eq!(table.selected().unwrap().number, 3);
        table.apply_search("item 2");
        assert_eq!(table.selected().unwrap().number, 2);
    }
}
