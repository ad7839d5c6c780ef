//! WindowedMessageFeed - bounded visible window with backward pagination.
//!
//! The feed exposes a contiguous slice over the full ordered message list,
//! anchored at the tail. "Load more" grows the window backward by a fixed
//! increment; appends at the tail are tracked automatically because the end
//! bound is always `total`.

use tracing::debug;

/// The contiguous slice of the ordered message list currently mounted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ViewportWindow {
    pub start_index: usize,
    pub count: usize,
    pub total: usize,
}

impl ViewportWindow {
    /// Half-open index range `[start, start + count)`.
    pub fn range(&self) -> std::ops::Range<usize> {
        self.start_index..self.start_index + self.count
    }
}

/// Window bookkeeping over the ordered message list.
#[derive(Debug)]
pub struct WindowedMessageFeed {
    /// Effective window size; grows by `increment` per completed load-more.
    window_size: usize,
    increment: usize,
    total: usize,
    /// A backward expansion is in flight; duplicate triggers are ignored.
    expanding: bool,
}

impl WindowedMessageFeed {
    pub fn new(display_count: usize, increment: usize) -> Self {
        Self {
            window_size: display_count.max(1),
            increment: increment.max(1),
            total: 0,
            expanding: false,
        }
    }

    /// Track the current total. Appends move the end bound automatically;
    /// removals shrink it. Identity-based removal happens at the store - the
    /// feed only ever sees the resulting total.
    pub fn set_total(&mut self, total: usize) {
        self.total = total;
    }

    pub fn total(&self) -> usize {
        self.total
    }

    /// The mounted window: `[max(0, total - window_size), total)`.
    pub fn window(&self) -> ViewportWindow {
        let start_index = self.total.saturating_sub(self.window_size);
        ViewportWindow {
            start_index,
            count: self.total - start_index,
            total: self.total,
        }
    }

    /// Whether older messages exist beyond the window. O(1).
    pub fn has_more(&self) -> bool {
        self.total > self.window_size
    }

    /// Grow the window backward by one increment. Returns `false` when there
    /// is nothing more to load or an expansion is already in flight -
    /// concurrent duplicate triggers collapse to a single expansion.
    pub fn load_more(&mut self) -> bool {
        if self.expanding || !self.has_more() {
            return false;
        }
        self.expanding = true;
        self.window_size += self.increment;
        debug!(
            target: "core.feed",
            window_size = self.window_size,
            total = self.total,
            "window expanded"
        );
        true
    }

    /// Re-arm load-more once the expanded window has been mounted.
    pub fn expansion_complete(&mut self) {
        self.expanding = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn initial_window_anchors_at_tail() {
        let mut feed = WindowedMessageFeed::new(20, 20);
        feed.set_total(50);
        let w = feed.window();
        assert_eq!(w.start_index, 30);
        assert_eq!(w.count, 20);
        assert_eq!(w.total, 50);
        assert_eq!(w.range(), 30..50);
    }

    #[test]
    fn window_smaller_than_display_count() {
        let mut feed = WindowedMessageFeed::new(20, 20);
        feed.set_total(5);
        let w = feed.window();
        assert_eq!(w.start_index, 0);
        assert_eq!(w.count, 5);
        assert!(!feed.has_more());
    }

    #[test]
    fn load_more_expands_window_backward() {
        // 50 messages, display 20: window is messages 31-50 (indices 30..50).
        let mut feed = WindowedMessageFeed::new(20, 20);
        feed.set_total(50);
        assert_eq!(feed.window().range(), 30..50);
        assert!(feed.has_more());

        // One load-more with increment 20: window is messages 11-50.
        assert!(feed.load_more());
        feed.expansion_complete();
        let w = feed.window();
        assert_eq!(w.range(), 10..50);
        assert_eq!(w.count, 40);
    }

    #[test]
    fn duplicate_load_more_is_idempotent() {
        let mut feed = WindowedMessageFeed::new(10, 10);
        feed.set_total(100);

        assert!(feed.load_more());
        // Duplicate triggers while the expansion is in flight are ignored.
        assert!(!feed.load_more());
        assert!(!feed.load_more());
        assert_eq!(feed.window().range(), 80..100);

        feed.expansion_complete();
        assert!(feed.load_more());
        feed.expansion_complete();
        assert_eq!(feed.window().range(), 70..100);
    }

    #[test]
    fn load_more_without_more_is_a_noop() {
        let mut feed = WindowedMessageFeed::new(20, 20);
        feed.set_total(10);
        assert!(!feed.load_more());
        assert_eq!(feed.window().range(), 0..10);
    }

    #[test]
    fn appends_track_the_tail() {
        let mut feed = WindowedMessageFeed::new(20, 20);
        feed.set_total(50);
        assert_eq!(feed.window().range(), 30..50);

        // Tail append: the end bound follows without an explicit re-fetch.
        feed.set_total(51);
        assert_eq!(feed.window().range(), 31..51);
    }

    #[test]
    fn removal_shrinks_without_skipping() {
        let mut feed = WindowedMessageFeed::new(20, 20);
        feed.set_total(50);
        feed.set_total(49);
        let w = feed.window();
        assert_eq!(w.range(), 29..49);
        assert_eq!(w.count, 20);
    }

    #[test]
    fn expansion_never_exceeds_total() {
        let mut feed = WindowedMessageFeed::new(20, 40);
        feed.set_total(30);
        assert!(feed.load_more());
        feed.expansion_complete();
        let w = feed.window();
        assert_eq!(w.range(), 0..30);
        assert!(!feed.has_more());
        assert!(!feed.load_more());
    }
}
