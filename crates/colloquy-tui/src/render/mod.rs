//! AdaptiveRenderer - strategy selection for streaming content.
//!
//! While a block streams, its render strategy is chosen once from the device
//! tier and content size and held for the stream's duration. Once the stream
//! ends the block is rendered exactly once more with the full-fidelity
//! strategy (markdown, highlighting); per-cell caching in the feed widget
//! keeps it at one.

mod blit;
mod full;
mod minimal;
mod virtualized;

pub use blit::BlitStrategy;
pub use full::FullStrategy;
pub use minimal::{MINIMAL_TAIL_CHARS, MinimalStrategy};
pub use virtualized::VirtualizedStrategy;

use crate::error::Result;
use crate::theme::Theme;
use colloquy_core::{BlockId, BlockKind, DeviceTier};
use ratatui::text::Line;
use std::collections::HashMap;
use strum::Display;
use tracing::warn;

/// Streaming content at or below this size renders full-fidelity even while
/// the stream is live; parsing cost is negligible at this scale.
pub const FULL_STREAMING_LIMIT: usize = 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
#[strum(serialize_all = "kebab-case")]
pub enum StrategyKind {
    Full,
    VirtualizedText,
    CanvasBlit,
    Minimal,
}

/// One render job: a block's committed snapshot plus surface constraints.
#[derive(Debug, Clone, Copy)]
pub struct RenderRequest<'a> {
    pub content: &'a str,
    pub kind: BlockKind,
    pub width: u16,
    pub viewport_height: u16,
    pub theme: &'a Theme,
}

/// A render strategy turns a committed snapshot into styled lines.
pub trait RenderStrategy {
    fn render(&self, req: &RenderRequest<'_>) -> Result<Vec<Line<'static>>>;
}

static FULL: FullStrategy = FullStrategy;
static VIRTUALIZED: VirtualizedStrategy = VirtualizedStrategy;
static BLIT: BlitStrategy = BlitStrategy;
static MINIMAL: MinimalStrategy = MinimalStrategy;

fn strategy_impl(kind: StrategyKind) -> &'static dyn RenderStrategy {
    match kind {
        StrategyKind::Full => &FULL,
        StrategyKind::VirtualizedText => &VIRTUALIZED,
        StrategyKind::CanvasBlit => &BLIT,
        StrategyKind::Minimal => &MINIMAL,
    }
}

/// Pick a strategy for in-progress content. Full fidelity always applies
/// once streaming is over.
pub fn select_strategy(
    is_streaming: bool,
    tier: DeviceTier,
    content_len: usize,
) -> StrategyKind {
    if !is_streaming {
        return StrategyKind::Full;
    }
    match tier {
        DeviceTier::Low => StrategyKind::Minimal,
        _ if content_len <= FULL_STREAMING_LIMIT => StrategyKind::Full,
        DeviceTier::High => StrategyKind::VirtualizedText,
        DeviceTier::Medium => StrategyKind::CanvasBlit,
    }
}

/// Per-block strategy holder. The strategy chosen at stream start is held
/// until the stream ends; mid-stream switching is never forced.
pub struct AdaptiveRenderer {
    tier: DeviceTier,
    held: HashMap<BlockId, StrategyKind>,
}

impl AdaptiveRenderer {
    pub fn new(tier: DeviceTier) -> Self {
        Self {
            tier,
            held: HashMap::new(),
        }
    }

    pub fn tier(&self) -> DeviceTier {
        self.tier
    }

    /// Render a block's committed snapshot. Streaming blocks keep their
    /// initially chosen strategy; completed blocks always render full. A
    /// failing strategy falls back silently to minimal.
    pub fn render_block(
        &mut self,
        block_id: &BlockId,
        is_streaming: bool,
        req: &RenderRequest<'_>,
    ) -> (StrategyKind, Vec<Line<'static>>) {
        let kind = if is_streaming {
            *self
                .held
                .entry(block_id.clone())
                .or_insert_with(|| select_strategy(true, self.tier, req.content.len()))
        } else {
            self.held.remove(block_id);
            StrategyKind::Full
        };

        match strategy_impl(kind).render(req) {
            Ok(lines) => (kind, lines),
            Err(err) => {
                warn!(target: "tui.render", %block_id, strategy = %kind, "strategy failed, falling back to minimal: {err}");
                (StrategyKind::Minimal, minimal::tail_lines(req))
            }
        }
    }

    /// Forget a block's held strategy, e.g. on message deletion.
    pub fn forget(&mut self, block_id: &BlockId) {
        self.held.remove(block_id);
    }
}
