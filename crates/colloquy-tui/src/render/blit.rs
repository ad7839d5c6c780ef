//! Canvas-blit strategy: off-screen rasterization of the trailing lines.
//!
//! Streaming updates are drawn into an off-screen cell buffer sized to the
//! visible tail, then read back as lines for the frame blit. The retained
//! widget tree is never touched during high-frequency updates; only raw
//! cells move.

use super::{RenderRequest, RenderStrategy};
use crate::error::{Error, Result};
use crate::theme::Component;
use ratatui::buffer::Buffer;
use ratatui::layout::Rect;
use ratatui::style::Style;
use ratatui::text::{Line, Span};

pub struct BlitStrategy;

impl RenderStrategy for BlitStrategy {
    fn render(&self, req: &RenderRequest<'_>) -> Result<Vec<Line<'static>>> {
        if req.width == 0 || req.viewport_height == 0 {
            return Err(Error::RenderStrategy(
                "zero-area blit surface".to_string(),
            ));
        }
        let style = req.theme.style(Component::AssistantMessage);
        let width = usize::from(req.width);
        let bound = usize::from(req.viewport_height);

        // Trailing wrapped lines, same windowing as the virtualized path.
        let mut tail: Vec<String> = Vec::new();
        for raw in req.content.lines().rev().take(bound) {
            let mut wrapped: Vec<String> = textwrap::wrap(raw, width)
                .into_iter()
                .map(std::borrow::Cow::into_owned)
                .collect();
            if wrapped.is_empty() {
                wrapped.push(String::new());
            }
            wrapped.reverse();
            for piece in wrapped {
                tail.push(piece);
                if tail.len() == bound {
                    break;
                }
            }
            if tail.len() == bound {
                break;
            }
        }
        tail.reverse();

        let rows = u16::try_from(tail.len().max(1))
            .map_err(|_| Error::RenderStrategy("blit surface too tall".to_string()))?;
        let surface = Rect::new(0, 0, req.width, rows);
        let mut buffer = Buffer::empty(surface);

        for (y, text) in tail.iter().enumerate() {
            let line = Line::from(Span::styled(text.clone(), style));
            buffer.set_line(0, y as u16, &line, req.width);
        }

        Ok(read_back(&buffer, surface))
    }
}

/// Convert buffer rows back into lines, batching consecutive same-style
/// cells into single spans.
fn read_back(buffer: &Buffer, area: Rect) -> Vec<Line<'static>> {
    let mut lines = Vec::with_capacity(usize::from(area.height));
    for y in 0..area.height {
        let mut spans: Vec<Span<'static>> = Vec::new();
        let mut run = String::new();
        let mut run_style = Style::default();
        for x in 0..area.width {
            let Some(cell) = buffer.cell((x, y)) else {
                continue;
            };
            let style = cell.style();
            if style != run_style && !run.is_empty() {
                spans.push(Span::styled(std::mem::take(&mut run), run_style));
            }
            run_style = style;
            run.push_str(cell.symbol());
        }
        if !run.is_empty() {
            // Trailing pad cells carry no content worth keeping.
            let trimmed = run.trim_end();
            if !trimmed.is_empty() {
                spans.push(Span::styled(trimmed.to_string(), run_style));
            }
        }
        lines.push(Line::from(spans));
    }
    lines
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::theme::Theme;
    use colloquy_core::BlockKind;

    fn req<'a>(content: &'a str, theme: &'a Theme, width: u16, height: u16) -> RenderRequest<'a> {
        RenderRequest {
            content,
            kind: BlockKind::Text,
            width,
            viewport_height: height,
            theme,
        }
    }

    #[test]
    fn zero_area_surface_is_an_error() {
        let theme = Theme::default();
        assert!(BlitStrategy.render(&req("text", &theme, 0, 5)).is_err());
        assert!(BlitStrategy.render(&req("text", &theme, 40, 0)).is_err());
    }

    #[test]
    fn round_trips_trailing_text() {
        let theme = Theme::default();
        let content = "alpha\nbravo\ncharlie\ndelta";
        let lines = BlitStrategy.render(&req(content, &theme, 20, 2)).unwrap();
        let text: Vec<String> = lines
            .iter()
            .map(|l| l.spans.iter().map(|s| s.content.as_ref()).collect())
            .collect();
        assert_eq!(text, vec!["charlie".to_string(), "delta".to_string()]);
    }

    #[test]
    fn output_is_bounded_by_viewport() {
        let theme = Theme::default();
        let content = (0..500)
            .map(|i| format!("row {i}"))
            .collect::<Vec<_>>()
            .join("\n");
        let lines = BlitStrategy.render(&req(&content, &theme, 30, 6)).unwrap();
        assert!(lines.len() <= 6);
    }

    #[test]
    fn wrapped_tail_fills_from_the_end() {
        let theme = Theme::default();
        let content = "tail words that wrap over lines";
        let lines = BlitStrategy.render(&req(content, &theme, 10, 2)).unwrap();
        let text: String = lines
            .iter()
            .flat_map(|l| l.spans.iter())
            .map(|s| s.content.as_ref())
            .collect::<Vec<_>>()
            .join(" ");
        assert!(text.contains("lines"));
    }
}
