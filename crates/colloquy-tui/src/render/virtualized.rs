//! Virtualized-text strategy: trailing lines only.
//!
//! Wraps the accumulated content as plain text and keeps just the lines that
//! fit the visible viewport height, so the number of produced nodes is
//! bounded regardless of total content length. Recomputed per sync, which
//! covers resize and content growth.

use super::{RenderRequest, RenderStrategy};
use crate::error::Result;
use crate::theme::Component;
use ratatui::text::{Line, Span};

pub struct VirtualizedStrategy;

impl RenderStrategy for VirtualizedStrategy {
    fn render(&self, req: &RenderRequest<'_>) -> Result<Vec<Line<'static>>> {
        let style = req.theme.style(Component::AssistantMessage);
        let width = usize::from(req.width).max(1);
        let bound = usize::from(req.viewport_height).max(1);

        // Only the tail can be visible; wrapping the whole buffer would make
        // per-frame cost grow with content length. Take a generous tail in
        // raw lines first, then wrap just those.
        let raw_tail: Vec<&str> = tail_raw_lines(req.content, bound);

        let mut wrapped: Vec<Line<'static>> = Vec::new();
        for raw in raw_tail {
            if raw.is_empty() {
                wrapped.push(Line::from(String::new()));
                continue;
            }
            for piece in textwrap::wrap(raw, width) {
                wrapped.push(Line::from(Span::styled(piece.into_owned(), style)));
            }
        }

        if wrapped.len() > bound {
            Ok(wrapped.split_off(wrapped.len() - bound))
        } else {
            Ok(wrapped)
        }
    }
}

/// Last `bound` raw (unwrapped) lines of the content. Each raw line wraps to
/// at least one display line, so this is always enough to fill the viewport.
fn tail_raw_lines(content: &str, bound: usize) -> Vec<&str> {
    let mut tail: Vec<&str> = Vec::with_capacity(bound);
    for line in content.lines().rev().take(bound) {
        tail.push(line);
    }
    tail.reverse();
    tail
}
