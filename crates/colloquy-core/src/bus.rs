//! StreamEventBus - synchronous fan-out of stream lifecycle events.
//!
//! One broker instance lives for the application and is injected wherever
//! events are produced or consumed; there is no ambient global bus. Emission
//! fans out synchronously to the subscribers registered at emit time, in
//! subscription order. Events are never buffered or replayed: a subscriber
//! added after an emission misses that event.

use crate::error::Result;
use crate::model::{StreamEvent, StreamTopic};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, Weak};
use tracing::{debug, warn};

type Handler = Arc<dyn Fn(&StreamEvent) -> Result<()> + Send + Sync>;

struct Entry {
    id: u64,
    handler: Handler,
}

#[derive(Default)]
struct BusState {
    subscribers: HashMap<StreamTopic, Vec<Entry>>,
    next_id: u64,
}

/// Publish/subscribe hub for granular stream lifecycle events.
#[derive(Default)]
pub struct StreamEventBus {
    state: Mutex<BusState>,
}

impl StreamEventBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a handler for one topic. Dropping the returned
    /// [`Subscription`] (or calling [`Subscription::close`]) unsubscribes.
    pub fn subscribe<F>(self: &Arc<Self>, topic: StreamTopic, handler: F) -> Subscription
    where
        F: Fn(&StreamEvent) -> Result<()> + Send + Sync + 'static,
    {
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        let id = state.next_id;
        state.next_id += 1;
        state.subscribers.entry(topic).or_default().push(Entry {
            id,
            handler: Arc::new(handler),
        });
        debug!(target: "core.bus", %topic, subscriber = id, "subscribed");
        Subscription {
            bus: Arc::downgrade(self),
            topic,
            id,
            active: true,
        }
    }

    /// Fan an event out to every current subscriber of its topic, in
    /// subscription order. A failing handler is logged and skipped; it never
    /// prevents later handlers from running or propagates to the emitter.
    pub fn emit(&self, event: &StreamEvent) {
        let topic = event.topic();
        // Snapshot under the lock so handlers are free to subscribe or
        // unsubscribe while the fan-out runs.
        let handlers: Vec<(u64, Handler)> = {
            let state = self.state.lock().unwrap_or_else(|e| e.into_inner());
            state
                .subscribers
                .get(&topic)
                .map(|entries| {
                    entries
                        .iter()
                        .map(|e| (e.id, Arc::clone(&e.handler)))
                        .collect()
                })
                .unwrap_or_default()
        };

        for (id, handler) in handlers {
            if let Err(err) = handler(event) {
                warn!(target: "core.bus", %topic, subscriber = id, "handler failed: {err}");
            }
        }
    }

    /// Number of live subscribers for a topic.
    pub fn subscriber_count(&self, topic: StreamTopic) -> usize {
        let state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        state.subscribers.get(&topic).map_or(0, Vec::len)
    }

    fn unsubscribe(&self, topic: StreamTopic, id: u64) {
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(entries) = state.subscribers.get_mut(&topic) {
            entries.retain(|e| e.id != id);
        }
        debug!(target: "core.bus", %topic, subscriber = id, "unsubscribed");
    }
}

impl std::fmt::Debug for StreamEventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        let total: usize = state.subscribers.values().map(Vec::len).sum();
        f.debug_struct("StreamEventBus")
            .field("subscribers", &total)
            .finish()
    }
}

/// Guard tying a handler's registration to a scope. Unsubscribes on drop so
/// torn-down views cannot receive further events.
pub struct Subscription {
    bus: Weak<StreamEventBus>,
    topic: StreamTopic,
    id: u64,
    active: bool,
}

impl Subscription {
    /// Unsubscribe immediately instead of waiting for drop.
    pub fn close(&mut self) {
        if !self.active {
            return;
        }
        self.active = false;
        if let Some(bus) = self.bus.upgrade() {
            bus.unsubscribe(self.topic, self.id);
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.close();
    }
}
