//! ScrollCoordinator - sole owner of the feed viewport's scroll position.
//!
//! Every other component expresses scroll intent as a named request; only
//! the coordinator mutates the offset, which is what keeps same-frame
//! listeners from racing each other. Requests arriving within the debounce
//! window coalesce into one scroll executed on the next tick. The offset is
//! persisted per container key on a debounce and restored once on mount.

use colloquy_core::{ScrollPositionStore, Settings};
use std::collections::HashSet;
use std::time::{Duration, Instant};
use strum::Display;
use tracing::{debug, trace};

/// Named origins of scroll requests. Coalesced per debounce window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
#[strum(serialize_all = "snake_case")]
pub enum ScrollSource {
    StreamingCheck,
    TextDelta,
    MessageLengthChange,
    ForceScroll,
}

/// Coalescing window for scroll requests.
const SCROLL_DEBOUNCE: Duration = Duration::from_millis(40);
/// Offset writes settle this long before hitting the store.
const PERSIST_DEBOUNCE: Duration = Duration::from_millis(500);

pub struct ScrollCoordinator {
    container_key: String,
    store: Box<dyn ScrollPositionStore>,

    offset: usize,
    total_content_height: usize,
    viewport_height: u16,
    user_scrolled_up: bool,

    auto_scroll_enabled: bool,
    restore_enabled: bool,
    restored: bool,

    pending: HashSet<ScrollSource>,
    first_request: Option<Instant>,
    dirty_since: Option<Instant>,
    torn_down: bool,
}

impl ScrollCoordinator {
    pub fn new(
        container_key: impl Into<String>,
        store: Box<dyn ScrollPositionStore>,
        settings: &Settings,
    ) -> Self {
        Self {
            container_key: container_key.into(),
            store,
            offset: 0,
            total_content_height: 0,
            viewport_height: 0,
            user_scrolled_up: false,
            auto_scroll_enabled: settings.auto_scroll_enabled,
            restore_enabled: settings.restore_scroll_position,
            restored: false,
            pending: HashSet::new(),
            first_request: None,
            dirty_since: None,
            torn_down: false,
        }
    }

    pub fn offset(&self) -> usize {
        self.offset
    }

    pub fn user_scrolled_up(&self) -> bool {
        self.user_scrolled_up
    }

    /// Restore the persisted offset, once per mount. A restored non-bottom
    /// position counts as user intent so streaming does not yank the view.
    pub fn restore_on_mount(&mut self) {
        if self.restored {
            return;
        }
        self.restored = true;
        if !self.restore_enabled {
            return;
        }
        if let Some(offset) = self.store.get(&self.container_key) {
            self.offset = usize::try_from(offset).unwrap_or(usize::MAX);
            self.user_scrolled_up = self.offset > 0;
            debug!(target: "tui.scroll", key = %self.container_key, offset, "scroll offset restored");
        }
    }

    /// Update the content/viewport extents. The offset is clamped; growth
    /// while following the tail keeps following via pending requests, not
    /// here.
    pub fn set_extent(&mut self, total_content_height: usize, viewport_height: u16) {
        self.total_content_height = total_content_height;
        self.viewport_height = viewport_height;
        self.offset = self.offset.min(self.max_offset());
    }

    fn max_offset(&self) -> usize {
        self.total_content_height
            .saturating_sub(usize::from(self.viewport_height))
    }

    /// Bottom means the viewport shows the tail, or the user never left it.
    pub fn is_at_bottom(&self) -> bool {
        if self.total_content_height == 0 || self.viewport_height == 0 {
            return true;
        }
        !self.user_scrolled_up || self.offset >= self.max_offset()
    }

    /// Submit a scroll intention. Non-forced requests are suppressed by the
    /// auto-scroll setting and by user intent; within a debounce window all
    /// requests collapse into one operation on the next tick.
    pub fn request(&mut self, source: ScrollSource, now: Instant) {
        if self.torn_down {
            return;
        }
        if source != ScrollSource::ForceScroll {
            if !self.auto_scroll_enabled {
                trace!(target: "tui.scroll", %source, "auto-scroll disabled, request suppressed");
                return;
            }
            if !(self.is_at_bottom() && !self.user_scrolled_up) {
                trace!(target: "tui.scroll", %source, "user scrolled up, request suppressed");
                return;
            }
        }
        self.pending.insert(source);
        self.first_request.get_or_insert(now);
    }

    /// Run pending work on the frame tick: execute a coalesced scroll once
    /// its debounce window passed, and flush a settled offset write. Returns
    /// whether a scroll executed.
    pub fn on_tick(&mut self, now: Instant) -> bool {
        if self.torn_down {
            return false;
        }

        if let Some(since) = self.dirty_since {
            if now.duration_since(since) >= PERSIST_DEBOUNCE {
                self.persist_now();
            }
        }

        let Some(first) = self.first_request else {
            return false;
        };
        if now.duration_since(first) < SCROLL_DEBOUNCE {
            return false;
        }

        let sources = std::mem::take(&mut self.pending);
        self.first_request = None;
        if sources.is_empty() {
            return false;
        }
        if self.viewport_height == 0 {
            // Target viewport is gone; swallow as a no-op.
            let err = crate::error::Error::ScrollTargetMissing(self.container_key.clone());
            debug!(target: "tui.scroll", "{err}; dropping {} request(s)", sources.len());
            return false;
        }

        self.offset = self.max_offset();
        self.user_scrolled_up = false;
        self.dirty_since.get_or_insert(now);
        trace!(target: "tui.scroll", offset = self.offset, sources = sources.len(), "coalesced scroll executed");
        true
    }

    /// User input: scroll up by `amount` rows.
    pub fn scroll_up(&mut self, amount: usize, now: Instant) {
        let previous = self.offset;
        self.offset = self.offset.saturating_sub(amount);
        if self.offset != previous {
            self.user_scrolled_up = true;
            // User intent overrides queued auto-scrolls.
            self.pending.clear();
            self.first_request = None;
            self.dirty_since.get_or_insert(now);
        }
    }

    /// User input: scroll down by `amount` rows. Reaching the bottom hands
    /// control back to auto-scroll.
    pub fn scroll_down(&mut self, amount: usize, now: Instant) {
        let previous = self.offset;
        self.offset = self.offset.saturating_add(amount).min(self.max_offset());
        if self.offset != previous {
            self.dirty_since.get_or_insert(now);
        }
        if self.offset >= self.max_offset() {
            self.user_scrolled_up = false;
        }
    }

    /// Cancel pending operations and flush state. Further requests are
    /// refused; a scheduled scroll can no longer land in a disposed view.
    pub fn teardown(&mut self) {
        if self.torn_down {
            return;
        }
        self.pending.clear();
        self.first_request = None;
        if self.dirty_since.take().is_some() {
            self.persist_now_inner();
        }
        self.torn_down = true;
    }

    fn persist_now(&mut self) {
        self.dirty_since = None;
        self.persist_now_inner();
    }

    fn persist_now_inner(&mut self) {
        self.store
            .set(&self.container_key, self.offset as u64);
        self.store.flush();
        trace!(target: "tui.scroll", key = %self.container_key, offset = self.offset, "scroll offset persisted");
    }
}

impl Drop for ScrollCoordinator {
    fn drop(&mut self) {
        self.teardown();
    }
}
