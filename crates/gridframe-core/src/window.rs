use serde::Deserialize;
use serde::Serialize;
use std::ops::Range;

/// Fixed per-row pixel height tiers. Heights are per tier, not measured
/// per row, which keeps the window math O(1).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RowHeightTier {
    Compact,
    #[default]
    Standard,
    Comfortable,
}

impl RowHeightTier {
    pub fn px(self) -> u32 {
        match self {
            RowHeightTier::Compact => 24,
            RowHeightTier::Standard => 32,
            RowHeightTier::Comfortable => 48,
        }
    }
}

/// Boundary notifications for infinite-scroll consumers. Each fires once
/// per traversal of its edge, not once per scroll tick.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EdgeEvent {
    ScrollStart,
    ScrollEnd,
}

/// Maps a scroll offset + viewport size to the minimal contiguous index
/// slice that must be materialized, plus over-scan rows on both sides.
#[derive(Clone, Debug)]
pub struct VirtualWindow {
    tier: RowHeightTier,
    viewport_h: u32,
    overscan: usize,
    scroll_y: u64,
    count: usize,
    at_start: bool,
    at_end: bool,
}

impl Default for VirtualWindow {
    fn default() -> Self {
        Self {
            tier: RowHeightTier::Standard,
            viewport_h: 0,
            overscan: 2,
            scroll_y: 0,
            count: 0,
            at_start: true,
            at_end: false,
        }
    }
}

impl VirtualWindow {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn tier(&self) -> RowHeightTier {
        self.tier
    }

    pub fn set_tier(&mut self, tier: RowHeightTier) {
        self.tier = tier;
        self.clamp();
    }

    pub fn row_height(&self) -> u32 {
        self.tier.px()
    }

    pub fn set_viewport_height(&mut self, px: u32) {
        self.viewport_h = px;
        self.clamp();
    }

    pub fn viewport_height(&self) -> u32 {
        self.viewport_h
    }

    pub fn set_overscan(&mut self, rows: usize) {
        self.overscan = rows;
    }

    pub fn scroll_offset(&self) -> u64 {
        self.scroll_y
    }

    pub fn count(&self) -> usize {
        self.count
    }

    /// Updates the row count (pipeline output length). Resets the edge
    /// latches when the count changes the edge geometry.
    pub fn set_count(&mut self, count: usize) {
        self.count = count;
        self.clamp();
        // Shrinking may put us on the end edge without a scroll; don't
        // fire for that, just latch.
        self.at_start = self.scroll_y == 0;
        self.at_end = self.scroll_y >= self.max_scroll() && self.max_scroll() > 0;
    }

    /// Total scrollable extent in pixels.
    pub fn total_extent(&self) -> u64 {
        self.count as u64 * self.row_height() as u64
    }

    /// Scrolls to `offset` (clamped) and reports edge traversals. Each
    /// edge fires exactly once until the window leaves it again.
    pub fn set_scroll_offset(&mut self, offset: u64) -> Vec<EdgeEvent> {
        self.scroll_y = offset.min(self.max_scroll());
        let mut events = Vec::new();
        let on_start = self.scroll_y == 0;
        let on_end = self.max_scroll() > 0 && self.scroll_y >= self.max_scroll();
        if on_start && !self.at_start {
            events.push(EdgeEvent::ScrollStart);
        }
        if on_end && !self.at_end {
            events.push(EdgeEvent::ScrollEnd);
        }
        self.at_start = on_start;
        self.at_end = on_end;
        events
    }

    pub fn scroll_by(&mut self, delta_px: i64) -> Vec<EdgeEvent> {
        let next = (self.scroll_y as i64).saturating_add(delta_px).max(0) as u64;
        self.set_scroll_offset(next)
    }

    /// The materialized slice: visible rows plus the over-scan margin.
    pub fn range(&self) -> Range<usize> {
        if self.count == 0 || self.viewport_h == 0 {
            return 0..0;
        }
        let row_h = self.row_height() as u64;
        let first_visible = (self.scroll_y / row_h) as usize;
        let last_visible = ((self.scroll_y + self.viewport_h as u64).div_ceil(row_h)) as usize;
        let start = first_visible.saturating_sub(self.overscan);
        let end = last_visible.saturating_add(self.overscan).min(self.count);
        start..end
    }

    /// Registers `added` appended rows and returns just the slice of the
    /// new rows that falls inside the current window, so the caller
    /// materializes only the delta.
    pub fn append(&mut self, added: usize) -> Option<Range<usize>> {
        let old_count = self.count;
        self.count += added;
        // Appending below the viewport re-arms the end edge.
        if self.scroll_y < self.max_scroll() {
            self.at_end = false;
        }
        self.delta_since(old_count)
    }

    /// The slice of rows at index `old_count..` that falls inside the
    /// current window, if any. Lets append paths materialize only the
    /// rows that just became visible.
    pub fn delta_since(&self, old_count: usize) -> Option<Range<usize>> {
        let window = self.range();
        if window.end <= old_count {
            return None;
        }
        Some(window.start.max(old_count)..window.end)
    }

    fn max_scroll(&self) -> u64 {
        self.total_extent().saturating_sub(self.viewport_h as u64)
    }

    fn clamp(&mut self) {
        self.scroll_y = self.scroll_y.min(self.max_scroll());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn window(count: usize, viewport_h: u32) -> VirtualWindow {
        let mut w = VirtualWindow::new();
        w.set_viewport_height(viewport_h);
        w.set_count(count);
        w
    }

    #[test]
    fn range_covers_viewport_plus_overscan() {
        // Standard tier: 32px rows, 320px viewport = 10 visible rows.
        let mut w = window(100, 320);
        assert_eq!(w.range(), 0..12);
        w.set_scroll_offset(32 * 20);
        assert_eq!(w.range(), 18..32);
    }

    #[test]
    fn range_clamps_at_the_tail() {
        let mut w = window(100, 320);
        w.set_scroll_offset(u64::MAX);
        let r = w.range();
        assert_eq!(r.end, 100);
        assert!(r.start <= 90);
    }

    #[test]
    fn tier_changes_row_height() {
        let mut w = window(10, 240);
        assert_eq!(w.total_extent(), 320);
        w.set_tier(RowHeightTier::Comfortable);
        assert_eq!(w.total_extent(), 480);
        assert_eq!(w.range().end.min(10), w.range().end);
    }

    #[test]
    fn scroll_end_fires_once_per_traversal() {
        let mut w = window(20, 320);
        let max = w.total_extent() - 320;
        assert_eq!(w.set_scroll_offset(max), vec![EdgeEvent::ScrollEnd]);
        // Still on the edge: no duplicate.
        assert_eq!(w.set_scroll_offset(max), Vec::new());
        assert_eq!(w.set_scroll_offset(max - 64), Vec::new());
        assert_eq!(w.set_scroll_offset(max), vec![EdgeEvent::ScrollEnd]);
    }

    #[test]
    fn scroll_start_fires_on_return_to_top() {
        let mut w = window(20, 320);
        assert_eq!(w.set_scroll_offset(100), Vec::new());
        assert_eq!(w.set_scroll_offset(0), vec![EdgeEvent::ScrollStart]);
        assert_eq!(w.set_scroll_offset(0), Vec::new());
    }

    #[test]
    fn append_returns_only_the_delta() {
        let mut w = window(10, 320);
        // Window covers the whole collection; appended rows 10..12 are
        // inside it.
        assert_eq!(w.append(5), Some(10..12));
        assert_eq!(w.count(), 15);
        // Far below the window: nothing new to materialize.
        assert_eq!(w.append(100), None);
    }

    #[test]
    fn append_rearms_end_edge() {
        let mut w = window(20, 320);
        let max = w.total_extent() - 320;
        assert_eq!(w.set_scroll_offset(max), vec![EdgeEvent::ScrollEnd]);
        w.append(20);
        let max = w.total_extent() - 320;
        assert_eq!(w.set_scroll_offset(max), vec![EdgeEvent::ScrollEnd]);
    }

    #[test]
    fn empty_collection_has_empty_range() {
        let w = window(0, 320);
        assert_eq!(w.range(), 0..0);
        assert_eq!(w.total_extent(), 0);
    }
}
