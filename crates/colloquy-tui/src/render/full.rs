//! Full-fidelity strategy: markdown, code highlighting, wrapping.
//!
//! The only strategy allowed to parse. Used for all settled content and for
//! small in-progress content on capable tiers; every stream reconciles
//! through it exactly once after completion.

use super::{RenderRequest, RenderStrategy};
use crate::error::Result;
use crate::markdown::{self, MarkdownStyles};
use crate::theme::Component;
use colloquy_core::BlockKind;
use ratatui::text::{Line, Span};

pub struct FullStrategy;

impl RenderStrategy for FullStrategy {
    fn render(&self, req: &RenderRequest<'_>) -> Result<Vec<Line<'static>>> {
        match req.kind {
            BlockKind::Text => Ok(render_markdown(req, req.theme.style(Component::AssistantMessage))),
            BlockKind::Thinking => {
                // Thought content keeps its structure but reads dimmed.
                let style = req.theme.style(Component::ThinkingText);
                let mut lines = render_markdown(req, style);
                for line in &mut lines {
                    for span in &mut line.spans {
                        span.style = style;
                    }
                }
                Ok(lines)
            }
            BlockKind::Tool | BlockKind::Citation => {
                let style = req.theme.style(Component::AssistantMessage);
                let width = req.width.max(1);
                let mut lines = Vec::new();
                for raw in req.content.lines() {
                    for piece in textwrap::wrap(raw, usize::from(width)) {
                        lines.push(Line::from(Span::styled(piece.into_owned(), style)));
                    }
                }
                if lines.is_empty() {
                    lines.push(Line::from(""));
                }
                Ok(lines)
            }
        }
    }
}

fn render_markdown(req: &RenderRequest<'_>, base: ratatui::style::Style) -> Vec<Line<'static>> {
    let styles = MarkdownStyles::from_theme(req.theme);
    let marked = markdown::from_str(req.content, &styles, base);

    let mut lines = Vec::with_capacity(marked.lines.len());
    for marked_line in marked.lines {
        if marked_line.no_wrap {
            // Code block lines render unwrapped.
            lines.push(marked_line.line);
        } else {
            lines.extend(markdown::style_wrap_with_indent(
                marked_line.line,
                req.width.max(1),
                marked_line.indent_level,
            ));
        }
    }
    if lines.is_empty() {
        lines.push(Line::from(""));
    }
    lines
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::theme::Theme;

    fn text_req<'a>(content: &'a str, theme: &'a Theme) -> RenderRequest<'a> {
        RenderRequest {
            content,
            kind: BlockKind::Text,
            width: 30,
            viewport_height: 10,
            theme,
        }
    }

    #[test]
    fn renders_markdown_headings() {
        let theme = Theme::default();
        let lines = FullStrategy
            .render(&text_req("# Heading\n\nbody text", &theme))
            .unwrap();
        let all: Vec<String> = lines
            .iter()
            .map(|l| l.spans.iter().map(|s| s.content.as_ref()).collect())
            .collect();
        assert!(all.iter().any(|l| l.contains("Heading")));
        assert!(all.iter().any(|l| l.contains("body text")));
    }

    #[test]
    fn thinking_blocks_are_uniformly_dimmed() {
        let theme = Theme::default();
        let req = RenderRequest {
            content: "pondering **hard**",
            kind: BlockKind::Thinking,
            width: 30,
            viewport_height: 10,
            theme: &theme,
        };
        let lines = FullStrategy.render(&req).unwrap();
        let style = theme.style(crate::theme::Component::ThinkingText);
        assert!(lines
            .iter()
            .flat_map(|l| l.spans.iter())
            .all(|s| s.style == style));
    }

    #[test]
    fn long_paragraphs_wrap_to_width() {
        let theme = Theme::default();
        let content = "word ".repeat(40);
        let lines = FullStrategy.render(&text_req(&content, &theme)).unwrap();
        assert!(lines.len() > 1);
    }

    #[test]
    fn tool_output_renders_plain() {
        let theme = Theme::default();
        let req = RenderRequest {
            content: "exit code 0\nstdout: ok",
            kind: BlockKind::Tool,
            width: 30,
            viewport_height: 10,
            theme: &theme,
        };
        let lines = FullStrategy.render(&req).unwrap();
        assert_eq!(lines.len(), 2);
    }
}
