//! StreamSession - wires bus events into the store, throttlers, and scroll.
//!
//! One session owns the conversation under display: it applies delta events
//! through per-block throttlers, drives each message's stream lifecycle, and
//! translates content changes into scroll requests. The scroll coordinator
//! is passed in per call - the session expresses intent, it never moves the
//! viewport itself.

use crate::scroll::{ScrollCoordinator, ScrollSource};
use colloquy_core::{
    BlockId, BlockKind, ChatStore, DeviceTier, MessageId, Settings, StreamEvent, StreamEventBus,
    StreamPayload, StreamPhase, StreamThrottler, StreamTopic, Subscription, WindowedMessageFeed,
};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::mpsc;
use tracing::{debug, warn};

pub struct StreamSession {
    store: ChatStore,
    feed: WindowedMessageFeed,
    tier: DeviceTier,
    throttlers: HashMap<BlockId, StreamThrottler>,
    phases: HashMap<MessageId, StreamPhase>,
}

impl StreamSession {
    pub fn new(settings: &Settings) -> Self {
        let tier = DeviceTier::detect(settings.device_tier_override);
        Self {
            store: ChatStore::new(),
            feed: WindowedMessageFeed::new(settings.display_count, settings.load_more_increment),
            tier,
            throttlers: HashMap::new(),
            phases: HashMap::new(),
        }
    }

    pub fn store(&self) -> &ChatStore {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut ChatStore {
        &mut self.store
    }

    pub fn feed(&self) -> &WindowedMessageFeed {
        &self.feed
    }

    pub fn feed_mut(&mut self) -> &mut WindowedMessageFeed {
        &mut self.feed
    }

    pub fn tier(&self) -> DeviceTier {
        self.tier
    }

    pub fn phase(&self, message_id: &MessageId) -> StreamPhase {
        self.phases
            .get(message_id)
            .copied()
            .unwrap_or(StreamPhase::Idle)
    }

    /// Apply one stream event. `now` drives throttle and scroll timing so
    /// the call is deterministic under test.
    pub fn handle_event(
        &mut self,
        event: &StreamEvent,
        scroll: &mut ScrollCoordinator,
        now: Instant,
    ) {
        match &event.payload {
            StreamPayload::TextDelta {
                message_id,
                block_id,
                delta,
            } => {
                self.apply_delta(message_id, block_id, BlockKind::Text, delta, scroll, now);
            }
            StreamPayload::ThinkingDelta {
                message_id,
                block_id,
                delta,
            } => {
                self.apply_delta(message_id, block_id, BlockKind::Thinking, delta, scroll, now);
            }
            StreamPayload::TextComplete {
                message_id,
                block_id,
            } => {
                self.finalize(message_id, block_id, scroll, now);
            }
            StreamPayload::StreamError {
                message_id,
                block_id,
                error,
            } => {
                self.fail(message_id, block_id, error);
            }
            StreamPayload::ForceScrollToBottom => {
                scroll.request(ScrollSource::ForceScroll, now);
            }
        }
    }

    /// Frame tick: commit due throttle snapshots into the store.
    pub fn on_tick(&mut self, now: Instant, scroll: &mut ScrollCoordinator) {
        let mut committed = false;
        for (block_id, throttler) in &mut self.throttlers {
            if let Some(snapshot) = throttler.poll(now) {
                self.store.set_block_content(block_id, snapshot);
                committed = true;
            }
        }
        if committed {
            scroll.request(ScrollSource::StreamingCheck, now);
        }
    }

    fn apply_delta(
        &mut self,
        message_id: &MessageId,
        block_id: &BlockId,
        kind: BlockKind,
        delta: &str,
        scroll: &mut ScrollCoordinator,
        now: Instant,
    ) {
        let phase = self.phase(message_id);
        match phase.on_delta() {
            Ok(next) => {
                self.phases.insert(message_id.clone(), next);
            }
            Err(err) => {
                // Error and Complete are terminal: late deltas are refused.
                warn!(target: "tui.session", %message_id, "delta refused: {err}");
                return;
            }
        }

        self.store.ensure_streaming_block(message_id, block_id, kind);
        let interval = self.tier.text_commit_interval();
        self.throttlers
            .entry(block_id.clone())
            .or_insert_with(|| StreamThrottler::new(interval))
            .push(delta);

        self.feed.set_total(self.store.len());
        scroll.request(ScrollSource::TextDelta, now);
    }

    /// Completion: mandatory throttle flush, then the message settles. The
    /// store revision bump makes the feed re-render the block once with the
    /// full-fidelity strategy.
    fn finalize(
        &mut self,
        message_id: &MessageId,
        block_id: &BlockId,
        scroll: &mut ScrollCoordinator,
        now: Instant,
    ) {
        let phase = self.phase(message_id);
        let finalizing = match phase.on_complete_signal() {
            Ok(next) => next,
            Err(err) => {
                warn!(target: "tui.session", %message_id, "completion refused: {err}");
                return;
            }
        };
        self.phases.insert(message_id.clone(), finalizing);

        if let Some(mut throttler) = self.throttlers.remove(block_id) {
            let settled = throttler.complete(now);
            self.store.complete_block(block_id, settled);
        } else if let Some(block) = self.store.block(block_id) {
            // Completion without any delta (e.g. hydrated block).
            let content = block.content.clone();
            self.store.complete_block(block_id, &content);
        }

        match finalizing.on_finalized() {
            Ok(done) => {
                self.phases.insert(message_id.clone(), done);
            }
            Err(err) => {
                warn!(target: "tui.session", %message_id, "finalize failed: {err}");
            }
        }
        self.store.complete_message(message_id);
        self.feed.set_total(self.store.len());
        scroll.request(ScrollSource::MessageLengthChange, now);
        debug!(target: "tui.session", %message_id, %block_id, "stream settled");
    }

    /// Upstream failure: halt delta application, keep partial content, and
    /// surface a terminal error block. Other messages are unaffected.
    fn fail(&mut self, message_id: &MessageId, block_id: &BlockId, error: &str) {
        let phase = self.phase(message_id);
        match phase.on_error() {
            Ok(next) => {
                self.phases.insert(message_id.clone(), next);
            }
            Err(err) => {
                warn!(target: "tui.session", %message_id, "error event refused: {err}");
                return;
            }
        }

        if let Some(mut throttler) = self.throttlers.remove(block_id) {
            // Preserve everything accumulated so far, then stop the timers.
            let partial = throttler.accumulated().to_string();
            throttler.cancel();
            self.store.set_block_content(block_id, &partial);
        }
        self.store.fail_message(message_id, error);
        self.feed.set_total(self.store.len());
        let delivery = colloquy_core::Error::StreamDelivery {
            message_id: message_id.clone(),
            reason: error.to_string(),
        };
        warn!(target: "tui.session", "{delivery}");
    }

    /// Explicit user deletion: message, blocks, throttlers, and scroll
    /// bookkeeping go immediately.
    pub fn delete_message(&mut self, message_id: &MessageId) -> bool {
        let block_ids: Vec<BlockId> = self
            .store
            .message(message_id)
            .map(|m| m.block_ids.clone())
            .unwrap_or_default();
        if !self.store.remove_message(message_id) {
            return false;
        }
        for block_id in &block_ids {
            if let Some(mut throttler) = self.throttlers.remove(block_id) {
                throttler.cancel();
            }
        }
        self.phases.remove(message_id);
        self.feed.set_total(self.store.len());
        true
    }

    /// Abort every in-flight stream, preserving partial content. Called on
    /// view teardown; bus subscriptions are dropped by their owner.
    pub fn teardown(&mut self) {
        for (block_id, throttler) in &mut self.throttlers {
            let partial = throttler.accumulated().to_string();
            throttler.cancel();
            self.store.set_block_content(block_id, &partial);
        }
        self.throttlers.clear();
        for phase in self.phases.values_mut() {
            if !phase.is_terminal() {
                if let Ok(next) = phase.on_error() {
                    *phase = next;
                }
            }
        }
    }
}

/// Subscribe the session's topics on the bus, forwarding every event into a
/// channel the UI loop drains. Dropping the subscriptions detaches the
/// session from the bus.
pub fn forward_events(
    bus: &Arc<StreamEventBus>,
) -> (Vec<Subscription>, mpsc::UnboundedReceiver<StreamEvent>) {
    let (tx, rx) = mpsc::unbounded_channel();
    let topics = [
        StreamTopic::TextDelta,
        StreamTopic::ThinkingDelta,
        StreamTopic::TextComplete,
        StreamTopic::StreamError,
        StreamTopic::ForceScrollToBottom,
    ];
    let subscriptions = topics
        .into_iter()
        .map(|topic| {
            let tx = tx.clone();
            bus.subscribe(topic, move |event| {
                tx.send(event.clone())
                    .map_err(|e| colloquy_core::Error::Subscriber(e.to_string()))
            })
        })
        .collect();
    (subscriptions, rx)
}
