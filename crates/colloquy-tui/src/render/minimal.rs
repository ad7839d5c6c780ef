//! Minimal strategy: the cheapest possible streaming view.
//!
//! Renders only the trailing characters of the accumulated content as flat,
//! unstyled-beyond-theme lines. The bound caps per-frame work on the lowest
//! device tier; the completion flush always restores the full content
//! through the full-fidelity strategy, so nothing is lost at rest.

use super::{RenderRequest, RenderStrategy};
use crate::error::Result;
use crate::theme::Component;
use ratatui::text::{Line, Span};
use unicode_width::UnicodeWidthChar;

/// Trailing-character cap during active streaming on the minimal path.
/// Product-confirmable tradeoff: in-flight visibility is bounded, the final
/// render is not.
pub const MINIMAL_TAIL_CHARS: usize = 1000;

pub struct MinimalStrategy;

impl RenderStrategy for MinimalStrategy {
    fn render(&self, req: &RenderRequest<'_>) -> Result<Vec<Line<'static>>> {
        Ok(tail_lines(req))
    }
}

/// Shared with the fallback path: infallible by construction.
pub(super) fn tail_lines(req: &RenderRequest<'_>) -> Vec<Line<'static>> {
    let style = req.theme.style(Component::AssistantMessage);
    let width = usize::from(req.width).max(1);
    let bound = usize::from(req.viewport_height).max(1);

    let tail = char_tail(req.content, MINIMAL_TAIL_CHARS);

    // Flat width-sized chunks; newlines in the tail still break lines.
    let mut lines: Vec<Line<'static>> = Vec::new();
    let mut current = String::new();
    let mut current_width = 0usize;
    for ch in tail.chars() {
        if ch == '\n' {
            lines.push(Line::from(Span::styled(std::mem::take(&mut current), style)));
            current_width = 0;
            continue;
        }
        let w = ch.width().unwrap_or(0);
        if current_width + w > width && !current.is_empty() {
            lines.push(Line::from(Span::styled(std::mem::take(&mut current), style)));
            current_width = 0;
        }
        current.push(ch);
        current_width += w;
    }
    if !current.is_empty() || lines.is_empty() {
        lines.push(Line::from(Span::styled(current, style)));
    }

    if lines.len() > bound {
        lines.split_off(lines.len() - bound)
    } else {
        lines
    }
}

/// Last `n` characters of `content`, on a char boundary.
fn char_tail(content: &str, n: usize) -> &str {
    if n == 0 {
        return "";
    }
    match content.char_indices().rev().nth(n - 1) {
        Some((idx, _)) => &content[idx..],
        None => content,
    }
}
