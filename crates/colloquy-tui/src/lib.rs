//! colloquy-tui - terminal rendering layer for the Colloquy chat client.
//!
//! Renders the streaming conversation maintained by `colloquy-core` with
//! ratatui: an adaptive per-stream render strategy (full markdown fidelity
//! down to a flat trailing-characters fallback, picked by device tier), a
//! windowed feed widget with per-message line caching, and a scroll
//! coordinator that is the single owner of the viewport position.

pub mod error;
pub mod feed_widget;
pub mod markdown;
pub mod render;
pub mod scroll;
pub mod session;
pub mod theme;

pub use error::{Error, Result};
pub use feed_widget::{FeedWidget, RenderPass};
pub use render::{AdaptiveRenderer, RenderRequest, RenderStrategy, StrategyKind, select_strategy};
pub use scroll::{ScrollCoordinator, ScrollSource};
pub use session::{StreamSession, forward_events};
pub use theme::{Component, Theme};
