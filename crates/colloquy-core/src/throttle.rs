//! StreamThrottler - per-block commit-rate limiter for streaming text.
//!
//! A throttler owns the accumulation buffer for one block (single writer)
//! and commits display snapshots at a bounded cadence. Renderers only ever
//! see committed snapshots. Throttling delays visibility; it never drops a
//! delta: the snapshot visible after completion is the exact concatenation
//! of every delta in arrival order.
//!
//! The machine is poll-driven rather than timer-owning: the UI loop calls
//! [`StreamThrottler::poll`] on its tick with the current `Instant`, which
//! keeps timing deterministic under test and leaves no timer to leak when
//! the owning view is torn down.

use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// Commit phase of a throttler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ThrottlePhase {
    /// Nothing awaiting commit.
    Idle,
    /// Uncommitted content exists; a commit is due once the interval allows.
    Scheduled,
    /// Terminal: the completion flush ran (or the throttler was cancelled).
    Flushed,
}

/// Rate limiter and accumulator for one streaming block.
#[derive(Debug)]
pub struct StreamThrottler {
    buffer: String,
    committed_len: usize,
    phase: ThrottlePhase,
    interval: Duration,
    last_commit: Option<Instant>,
}

impl StreamThrottler {
    pub fn new(interval: Duration) -> Self {
        Self {
            buffer: String::new(),
            committed_len: 0,
            phase: ThrottlePhase::Idle,
            interval,
            last_commit: None,
        }
    }

    pub fn phase(&self) -> ThrottlePhase {
        self.phase
    }

    /// The last committed display snapshot.
    pub fn committed(&self) -> &str {
        &self.buffer[..self.committed_len]
    }

    /// Total accumulated content, committed or not.
    pub fn accumulated(&self) -> &str {
        &self.buffer
    }

    /// Append one delta. Always accumulates, regardless of whether a commit
    /// happens this interval. Deltas arriving after the terminal flush are
    /// dropped with a warning; the owning stream already settled.
    pub fn push(&mut self, delta: &str) {
        if self.phase == ThrottlePhase::Flushed {
            warn!(target: "core.throttle", "delta after flush dropped ({} bytes)", delta.len());
            return;
        }
        self.buffer.push_str(delta);
        self.phase = ThrottlePhase::Scheduled;
    }

    /// Replace the accumulated content wholesale, e.g. after a stream
    /// restart. If `full` extends the current accumulation as a prefix the
    /// remainder is treated as an ordinary delta; otherwise the accumulator
    /// resets rather than attempting a diff.
    pub fn sync(&mut self, full: &str) {
        if self.phase == ThrottlePhase::Flushed {
            warn!(target: "core.throttle", "sync after flush ignored");
            return;
        }
        if let Some(rest) = full.strip_prefix(self.buffer.as_str()) {
            if !rest.is_empty() {
                self.push(rest);
            }
            return;
        }
        debug!(
            target: "core.throttle",
            "discontinuous content ({} -> {} bytes), resetting accumulator",
            self.buffer.len(),
            full.len()
        );
        self.buffer.clear();
        self.buffer.push_str(full);
        self.committed_len = 0;
        self.phase = ThrottlePhase::Scheduled;
    }

    /// Commit a snapshot if one is due. Returns the snapshot when a commit
    /// happened, `None` while idle, flushed, or still inside the interval.
    pub fn poll(&mut self, now: Instant) -> Option<&str> {
        if self.phase != ThrottlePhase::Scheduled {
            return None;
        }
        if let Some(last) = self.last_commit {
            if now.duration_since(last) < self.interval {
                return None;
            }
        }
        self.commit(now);
        Some(self.committed())
    }

    /// Unconditional final commit, even inside the throttle window. The
    /// first call flushes; later calls return the settled snapshot without
    /// further effect.
    pub fn complete(&mut self, now: Instant) -> &str {
        if self.phase != ThrottlePhase::Flushed {
            self.commit(now);
            self.phase = ThrottlePhase::Flushed;
        }
        self.committed()
    }

    /// Drop any scheduled commit. Used when the owning view is torn down so
    /// no write can land in a disposed renderer. Accumulated content is kept
    /// so the caller may persist the partial text.
    pub fn cancel(&mut self) {
        self.phase = ThrottlePhase::Flushed;
    }

    /// Whether content is accumulated beyond the committed snapshot.
    pub fn has_uncommitted(&self) -> bool {
        self.committed_len < self.buffer.len()
    }

    fn commit(&mut self, now: Instant) {
        self.committed_len = self.buffer.len();
        self.last_commit = Some(now);
        if self.phase == ThrottlePhase::Scheduled {
            self.phase = ThrottlePhase::Idle;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const INTERVAL: Duration = Duration::from_millis(100);

    #[test]
    fn first_commit_is_immediate() {
        let mut th = StreamThrottler::new(INTERVAL);
        let t0 = Instant::now();
        th.push("Hel");
        assert_eq!(th.poll(t0), Some("Hel"));
        assert_eq!(th.phase(), ThrottlePhase::Idle);
    }

    #[test]
    fn commits_are_rate_limited() {
        let mut th = StreamThrottler::new(INTERVAL);
        let t0 = Instant::now();
        th.push("a");
        assert!(th.poll(t0).is_some());

        th.push("b");
        assert_eq!(th.poll(t0 + Duration::from_millis(50)), None);
        assert_eq!(th.committed(), "a");
        assert_eq!(th.accumulated(), "ab");

        assert_eq!(th.poll(t0 + INTERVAL), Some("ab"));
    }

    #[test]
    fn lossless_concatenation_across_throttle_windows() {
        // Deltas at 50ms gaps against a 100ms throttle: intermediate
        // visibility lags, the completion flush restores everything.
        let mut th = StreamThrottler::new(INTERVAL);
        let t0 = Instant::now();

        th.push("Hel");
        th.poll(t0);
        th.push("lo wor");
        th.poll(t0 + Duration::from_millis(50));
        th.push("ld!");
        th.poll(t0 + Duration::from_millis(100));

        let settled = th.complete(t0 + Duration::from_millis(120));
        assert_eq!(settled, "Hello world!");
    }

    #[test]
    fn completion_flush_bypasses_window() {
        let mut th = StreamThrottler::new(INTERVAL);
        let t0 = Instant::now();
        th.push("a");
        assert!(th.poll(t0).is_some());
        th.push("b");
        // Still inside the window, but completion commits anyway.
        assert_eq!(th.complete(t0 + Duration::from_millis(1)), "ab");
        assert_eq!(th.phase(), ThrottlePhase::Flushed);
    }

    #[test]
    fn complete_is_idempotent() {
        let mut th = StreamThrottler::new(INTERVAL);
        let t0 = Instant::now();
        th.push("x");
        assert_eq!(th.complete(t0), "x");
        th.push("ignored");
        assert_eq!(th.complete(t0 + INTERVAL), "x");
    }

    #[test]
    fn discontinuity_resets_accumulator() {
        let mut th = StreamThrottler::new(INTERVAL);
        let t0 = Instant::now();
        th.push("hello");
        th.poll(t0);

        // Restarted stream with unrelated content.
        th.sync("goodbye");
        assert_eq!(th.committed(), "");
        assert_eq!(th.accumulated(), "goodbye");
        assert_eq!(th.poll(t0 + INTERVAL), Some("goodbye"));
    }

    #[test]
    fn prefix_extension_is_a_delta() {
        let mut th = StreamThrottler::new(INTERVAL);
        th.push("hel");
        th.sync("hello");
        assert_eq!(th.accumulated(), "hello");
    }

    #[test]
    fn cancel_suppresses_pending_commit() {
        let mut th = StreamThrottler::new(INTERVAL);
        let t0 = Instant::now();
        th.push("partial");
        th.cancel();
        assert_eq!(th.poll(t0 + INTERVAL), None);
        // Partial accumulation survives for persistence.
        assert_eq!(th.accumulated(), "partial");
    }

    #[test]
    fn jittered_arrival_is_still_lossless() {
        let mut th = StreamThrottler::new(Duration::from_millis(33));
        let t0 = Instant::now();
        let deltas = ["a", "", "bc", "def", "g", "hijkl"];
        let mut expected = String::new();
        for (i, d) in deltas.iter().enumerate() {
            th.push(d);
            expected.push_str(d);
            // Irregular polling cadence, some polls inside the window.
            th.poll(t0 + Duration::from_millis(7 * i as u64));
        }
        assert_eq!(th.complete(t0 + Duration::from_millis(500)), expected);
    }
}
