use serde::Deserialize;
use serde::Serialize;
use std::ops::Range;

/// Who turns page state into a row subset.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PaginationMode {
    /// The engine slices the materialized collection itself.
    #[default]
    Client,
    /// Page number/size/total are pure state; the row subset for a page
    /// is supplied externally per page change. The engine never slices.
    Server,
    /// Page-change events are informational only; the host fully owns
    /// which rows are shown.
    Standalone,
}

/// Page state with clamping: `page_size >= 1`,
/// `page_number >= 1` (1-based), past-the-last requests clamp to the last
/// page instead of erroring.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Paginator {
    mode: PaginationMode,
    page: usize,
    page_size: usize,
    total: usize,
    enabled: bool,
}

impl Default for Paginator {
    fn default() -> Self {
        Self {
            mode: PaginationMode::Client,
            page: 1,
            page_size: 10,
            total: 0,
            enabled: false,
        }
    }
}

impl Paginator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn mode(&self) -> PaginationMode {
        self.mode
    }

    pub fn set_mode(&mut self, mode: PaginationMode) {
        self.mode = mode;
        self.enabled = true;
        self.clamp();
    }

    pub fn enabled(&self) -> bool {
        self.enabled
    }

    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    pub fn page(&self) -> usize {
        self.page
    }

    pub fn page_size(&self) -> usize {
        self.page_size
    }

    pub fn total(&self) -> usize {
        self.total
    }

    pub fn page_count(&self) -> usize {
        self.total.div_ceil(self.page_size).max(1)
    }

    /// Updates the collection size (downstream of filtering/grouping) and
    /// re-clamps the current page.
    pub fn set_total(&mut self, total: usize) {
        self.total = total;
        self.clamp();
    }

    /// Returns true when the visible page changed.
    pub fn set_page(&mut self, page: usize) -> bool {
        let before = self.page;
        self.page = page.max(1).min(self.page_count());
        self.page != before
    }

    pub fn set_page_size(&mut self, page_size: usize) -> bool {
        let before = (self.page, self.page_size);
        self.page_size = page_size.max(1);
        self.clamp();
        (self.page, self.page_size) != before
    }

    pub fn next_page(&mut self) -> bool {
        self.set_page(self.page.saturating_add(1))
    }

    pub fn prev_page(&mut self) -> bool {
        self.set_page(self.page.saturating_sub(1).max(1))
    }

    /// Index range of the current page within a `len`-row collection.
    /// Only the `Client` mode slices; the other modes show everything the
    /// host supplied.
    pub fn slice(&self, len: usize) -> Range<usize> {
        if !self.enabled || self.mode != PaginationMode::Client {
            return 0..len;
        }
        let start = (self.page - 1).saturating_mul(self.page_size).min(len);
        let end = start.saturating_add(self.page_size).min(len);
        start..end
    }

    fn clamp(&mut self) {
        self.page = self.page.max(1).min(self.page_count());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pager(total: usize, size: usize) -> Paginator {
        let mut p = Paginator::new();
        p.set_mode(PaginationMode::Client);
        p.set_page_size(size);
        p.set_total(total);
        p
    }

    #[test]
    fn nine_rows_at_size_two_is_five_pages() {
        let mut p = pager(9, 2);
        assert_eq!(p.page_count(), 5);
        for _ in 0..4 {
            p.next_page();
        }
        assert_eq!(p.page(), 5);
        assert_eq!(p.slice(9), 8..9);
        // A further next is a no-op on the last page.
        assert!(!p.next_page());
        assert_eq!(p.page(), 5);
    }

    #[test]
    fn past_last_page_clamps() {
        let mut p = pager(9, 2);
        assert!(p.set_page(99));
        assert_eq!(p.page(), 5);
    }

    #[test]
    fn page_size_and_number_minimums() {
        let mut p = pager(9, 2);
        p.set_page_size(0);
        assert_eq!(p.page_size(), 1);
        p.set_page(0);
        assert_eq!(p.page(), 1);
    }

    #[test]
    fn shrinking_total_reclamps_page() {
        let mut p = pager(100, 10);
        p.set_page(10);
        p.set_total(15);
        assert_eq!(p.page(), 2);
    }

    #[test]
    fn server_and_standalone_modes_do_not_slice() {
        let mut p = pager(9, 2);
        p.set_mode(PaginationMode::Server);
        p.set_page(3);
        assert_eq!(p.slice(9), 0..9);
        p.set_mode(PaginationMode::Standalone);
        assert_eq!(p.slice(9), 0..9);
    }

    #[test]
    fn empty_collection_is_one_page() {
        let p = pager(0, 5);
        assert_eq!(p.page_count(), 1);
        assert_eq!(p.slice(0), 0..0);
    }
}
