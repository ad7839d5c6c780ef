//! colloquy-core - the streaming message engine behind the Colloquy chat UI.
//!
//! Everything here is UI-framework independent: the event bus fanning out
//! stream lifecycle facts, the per-block throttler that keeps high-frequency
//! deltas lossless while bounding visible update cadence, the windowed feed
//! over the ordered conversation, the per-message stream state machine, and
//! the configuration/persistence seams the rendering layer plugs into.

pub mod bus;
pub mod config;
pub mod device;
pub mod error;
pub mod feed;
pub mod model;
pub mod persist;
pub mod store;
pub mod stream;
pub mod throttle;

pub use bus::{StreamEventBus, Subscription};
pub use config::{MessageGrouping, Settings};
pub use device::DeviceTier;
pub use error::{Error, Result};
pub use feed::{ViewportWindow, WindowedMessageFeed};
pub use model::{
    Block, BlockId, BlockKind, ContentStatus, Message, MessageId, Role, StreamEvent,
    StreamPayload, StreamTopic,
};
pub use persist::{FileScrollStore, MemoryScrollStore, ScrollPositionStore};
pub use store::{BlockStore, ChatStore};
pub use stream::StreamPhase;
pub use throttle::{StreamThrottler, ThrottlePhase};
