//! Pagination state for a lazily loaded table. The pager only decides when a
//! fetch should happen and tracks the outcome; issuing the request is up to
//! the owner (a spawned task in the UI, an awaited future in tests).

/// {current batch, exhausted flag, single-flight guard}. Batch numbers are
/// 1-based on the wire; `current_batch` is 0 until the first page lands.
#[derive(Debug, Clone)]
pub struct Pager {
    batch_size: usize,
    /// How many loaded-but-unseen rows may remain below the cursor before
    /// the next page is requested.
    buffer: usize,
    current_batch: usize,
    exhausted: bool,
    in_flight: bool,
}

impl Pager {
    pub fn new(batch_size: usize, buffer: usize) -> Self {
        Self { batch_size, buffer, current_batch: 0, exhausted: false, in_flight: false }
    }

    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    pub fn current_batch(&self) -> usize {
        self.current_batch
    }

    pub fn is_exhausted(&self) -> bool {
        self.exhausted
    }

    pub fn is_in_flight(&self) -> bool {
        self.in_flight
    }

    /// Decides whether a fetch is due for the given cursor position. Returns
    /// the batch number to request and arms the single-flight guard, or None
    /// when the pager is exhausted, a fetch is already in flight, or the
    /// cursor is still more than `buffer` rows away from the end of the
    /// loaded data. Overlapping triggers from rapid cursor movement are
    /// suppressed here rather than serialized downstream.
    pub fn poll(&mut self, cursor_row: usize, loaded_rows: usize) -> Option<usize> {
        if self.exhausted || self.in_flight {
            return None;
        }
        if loaded_rows.saturating_sub(cursor_row) > self.buffer {
            return None;
        }
        self.in_flight = true;
        Some(self.current_batch + 1)
    }

    /// Like [`Pager::poll`] without the buffer check, for refreshes and the
    /// initial page where the cursor position is irrelevant.
    pub fn force_poll(&mut self) -> Option<usize> {
        if self.exhausted || self.in_flight {
            return None;
        }
        self.in_flight = true;
        Some(self.current_batch + 1)
    }

    /// Records a successful fetch of `fetched` records. A short page means
    /// the server has no more data; no further polls will fire until reset.
    pub fn complete(&mut self, fetched: usize) {
        self.current_batch += 1;
        self.in_flight = false;
        if fetched < self.batch_size {
            self.exhausted = true;
        }
    }

    /// A failed fetch releases the guard but does not advance the batch or
    /// mark the pager exhausted, so the next poll retries the same page.
    pub fn fail(&mut self) {
        self.in_flight = false;
    }

    /// Back to a fresh pager, for when the parent context (repository,
    /// filter) changes.
    pub fn reset(&mut self) {
        self.current_batch = 0;
        self.exhausted = false;
        self.in_flight = false;
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn test_first_poll_requests_batch_one() {
        let mut pager = Pager::new(30, 5);
        assert_eq!(pager.poll(0, 0), Some(1));
    }

    #[test]
    fn test_no_poll_while_enough_rows_remain() {
        let mut pager = Pager::new(30, 5);
        pager.complete(30);
        // 30 rows loaded, cursor at the top: plenty of data ahead.
        assert_eq!(pager.poll(0, 30), None);
        // Within the buffer of the end: fetch.
        assert_eq!(pager.poll(25, 30), Some(2));
    }

    #[test]
    fn test_single_flight_guard_suppresses_overlap() {
        let mut pager = Pager::new(30, 5);
        assert_eq!(pager.poll(0, 0), Some(1));
        // A second trigger before the first completes must not fetch.
        assert_eq!(pager.poll(0, 0), None);
        pager.complete(30);
        assert_eq!(pager.poll(28, 30), Some(2));
    }

    #[test]
    fn test_short_page_exhausts_the_pager() {
        let mut pager = Pager::new(30, 5);
        pager.poll(0, 0);
        pager.complete(30);
        pager.poll(28, 30);
        pager.complete(10);
        assert!(pager.is_exhausted());
        assert_eq!(pager.current_batch(), 2);
        assert_eq!(pager.poll(39, 40), None);
    }

    #[test]
    fn test_failure_releases_guard_without_advancing() {
        let mut pager = Pager::new(30, 5);
        assert_eq!(pager.poll(0, 0), Some(1));
        pager.fail();
        assert!(!pager.is_exhausted());
        assert_eq!(pager.current_batch(), 0);
        // Same page is retried.
        assert_eq!(pager.poll(0, 0), Some(1));
    }

    #[test]
    fn test_reset_clears_exhaustion() {
        let mut pager = Pager::new(30, 5);
        pager.poll(0, 0);
        pager.complete(3);
        assert!(pager.is_exhausted());
        pager.reset();
        assert_eq!(pager.current_batch(), 0);
        assert_eq!(pager.poll(0, 0), Some(1));
    }
}
