//! Theme-aware markdown renderer for the full-fidelity strategy.
//!
//! Converts markdown into styled ratatui lines, with syntect highlighting
//! for fenced code blocks. Code block lines are marked no-wrap; everything
//! else is wrapped by the caller via [`style_wrap_with_indent`].

use once_cell::sync::Lazy;
use pulldown_cmark::{CodeBlockKind, Event, HeadingLevel, Options, Parser, Tag};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use syntect::easy::HighlightLines;
use syntect::highlighting::ThemeSet;
use syntect::parsing::SyntaxSet;
use syntect::util::LinesWithEndings;
use tracing::debug;
use unicode_width::UnicodeWidthStr;

use crate::theme::{Component, Theme};

/// Lazy-loaded syntax set for highlighting
static SYNTAX_SET: Lazy<SyntaxSet> = Lazy::new(SyntaxSet::load_defaults_newlines);
static THEME_SET: Lazy<ThemeSet> = Lazy::new(ThemeSet::load_defaults);
const HIGHLIGHT_THEME: &str = "base16-ocean.dark";

/// Convert a syntect style to ratatui style
fn syntect_style_to_ratatui(s: syntect::highlighting::Style) -> Style {
    Style::default().fg(Color::Rgb(s.foreground.r, s.foreground.g, s.foreground.b))
}

/// A line with metadata about how it should be rendered
#[derive(Debug, Clone)]
pub struct MarkedLine {
    pub line: Line<'static>,
    pub no_wrap: bool,
    pub indent_level: usize,
}

impl MarkedLine {
    pub fn new(line: Line<'static>) -> Self {
        Self {
            line,
            no_wrap: false,
            indent_level: 0,
        }
    }

    pub fn new_no_wrap(line: Line<'static>) -> Self {
        Self {
            line,
            no_wrap: true,
            indent_level: 0,
        }
    }

    pub fn with_indent(mut self, indent: usize) -> Self {
        self.indent_level = indent;
        self
    }
}

/// Markdown text with metadata
#[derive(Debug, Default)]
pub struct MarkedText {
    pub lines: Vec<MarkedLine>,
}

impl MarkedText {
    pub fn height(&self) -> usize {
        self.lines.len()
    }
}

/// Markdown styles resolved from the theme once per render.
#[derive(Debug, Clone)]
pub struct MarkdownStyles {
    pub headings: [Style; 6],
    pub emphasis: Style,
    pub strong: Style,
    pub strikethrough: Style,
    pub blockquote: Style,
    pub code: Style,
    pub code_block: Style,
    pub link: Style,
    pub list_marker: Style,
    pub list_number: Style,
    pub rule: Style,
}

impl MarkdownStyles {
    pub fn from_theme(theme: &Theme) -> Self {
        Self {
            headings: [
                theme.style(Component::MarkdownH1),
                theme.style(Component::MarkdownH2),
                theme.style(Component::MarkdownH3),
                theme.style(Component::MarkdownH4),
                theme.style(Component::MarkdownH5),
                theme.style(Component::MarkdownH6),
            ],
            emphasis: Style::default().add_modifier(Modifier::ITALIC),
            strong: Style::default().add_modifier(Modifier::BOLD),
            strikethrough: Style::default().add_modifier(Modifier::CROSSED_OUT),
            blockquote: theme.style(Component::MarkdownBlockquote),
            code: theme.style(Component::MarkdownCode),
            code_block: theme.style(Component::MarkdownCodeBlock),
            link: theme.style(Component::MarkdownLink),
            list_marker: theme.style(Component::MarkdownListBullet),
            list_number: theme.style(Component::MarkdownListNumber),
            rule: theme.style(Component::MarkdownRule),
        }
    }
}

struct Writer<'s> {
    styles: &'s MarkdownStyles,
    base: Style,
    out: Vec<MarkedLine>,
    spans: Vec<Span<'static>>,
    style_stack: Vec<Style>,
    /// Ordinal counters per open list; `None` for bullet lists.
    list_stack: Vec<Option<u64>>,
    quote_depth: usize,
    code_lang: Option<String>,
    code_buf: String,
}

impl<'s> Writer<'s> {
    fn new(styles: &'s MarkdownStyles, base: Style) -> Self {
        Self {
            styles,
            base,
            out: Vec::new(),
            spans: Vec::new(),
            style_stack: Vec::new(),
            list_stack: Vec::new(),
            quote_depth: 0,
            code_lang: None,
            code_buf: String::new(),
        }
    }

    fn current_style(&self) -> Style {
        self.style_stack.last().copied().unwrap_or(self.base)
    }

    fn indent(&self) -> usize {
        self.list_stack.len().saturating_mul(2) + self.quote_depth * 2
    }

    fn flush_line(&mut self) {
        if self.spans.is_empty() {
            return;
        }
        let mut spans = Vec::new();
        if self.quote_depth > 0 {
            spans.push(Span::styled(
                "> ".repeat(self.quote_depth),
                self.styles.blockquote,
            ));
        }
        spans.append(&mut self.spans);
        let indent = self.indent();
        self.out
            .push(MarkedLine::new(Line::from(spans)).with_indent(indent));
    }

    fn blank_line(&mut self) {
        if matches!(self.out.last(), Some(last) if !last.line.spans.is_empty()) {
            self.out.push(MarkedLine::new(Line::from("")));
        }
    }

    fn push_text(&mut self, text: &str, style: Style) {
        // Normalize embedded newlines into separate lines.
        let mut first = true;
        for part in text.split('\n') {
            if !first {
                self.flush_line();
            }
            first = false;
            if !part.is_empty() {
                self.spans.push(Span::styled(part.to_string(), style));
            }
        }
    }

    fn flush_code_block(&mut self) {
        let lang = self.code_lang.take().unwrap_or_default();
        let code = std::mem::take(&mut self.code_buf);

        let syntax = SYNTAX_SET
            .find_syntax_by_token(&lang)
            .unwrap_or_else(|| SYNTAX_SET.find_syntax_plain_text());
        let theme = &THEME_SET.themes[HIGHLIGHT_THEME];
        let mut highlighter = HighlightLines::new(syntax, theme);

        for raw_line in LinesWithEndings::from(&code) {
            let line = match highlighter.highlight_line(raw_line, &SYNTAX_SET) {
                Ok(regions) => Line::from(
                    regions
                        .into_iter()
                        .map(|(style, text)| {
                            Span::styled(
                                text.trim_end_matches('\n').to_string(),
                                syntect_style_to_ratatui(style),
                            )
                        })
                        .collect::<Vec<_>>(),
                ),
                Err(err) => {
                    debug!(target: "tui.markdown", "highlight failed: {err}");
                    Line::from(Span::styled(
                        raw_line.trim_end_matches('\n').to_string(),
                        self.styles.code_block,
                    ))
                }
            };
            self.out.push(MarkedLine::new_no_wrap(line));
        }
    }

    fn start_tag(&mut self, tag: &Tag<'_>) {
        match tag {
            Tag::Paragraph => self.blank_line(),
            Tag::Heading(level, _, _) => {
                self.blank_line();
                self.style_stack.push(self.heading_style(*level));
            }
            Tag::BlockQuote => {
                self.blank_line();
                self.quote_depth += 1;
                self.style_stack.push(self.styles.blockquote);
            }
            Tag::CodeBlock(kind) => {
                self.flush_line();
                self.blank_line();
                self.code_lang = Some(match kind {
                    CodeBlockKind::Fenced(lang) => lang.to_string(),
                    CodeBlockKind::Indented => String::new(),
                });
            }
            Tag::List(start) => {
                if self.list_stack.is_empty() {
                    self.blank_line();
                }
                self.list_stack.push(*start);
            }
            Tag::Item => {
                self.flush_line();
                let marker = match self.list_stack.last_mut() {
                    Some(Some(n)) => {
                        let marker = Span::styled(format!("{n}. "), self.styles.list_number);
                        *n += 1;
                        marker
                    }
                    _ => Span::styled("- ".to_string(), self.styles.list_marker),
                };
                let depth = self.list_stack.len().saturating_sub(1);
                if depth > 0 {
                    self.spans
                        .push(Span::raw(" ".repeat(depth * 2)));
                }
                self.spans.push(marker);
            }
            Tag::Emphasis => self
                .style_stack
                .push(self.current_style().patch(self.styles.emphasis)),
            Tag::Strong => self
                .style_stack
                .push(self.current_style().patch(self.styles.strong)),
            Tag::Strikethrough => self
                .style_stack
                .push(self.current_style().patch(self.styles.strikethrough)),
            Tag::Link(_, _, _) => self.style_stack.push(self.styles.link),
            _ => {}
        }
    }

    fn end_tag(&mut self, tag: &Tag<'_>) {
        match tag {
            Tag::Paragraph => self.flush_line(),
            Tag::Heading(_, _, _) => {
                self.flush_line();
                self.style_stack.pop();
            }
            Tag::BlockQuote => {
                self.flush_line();
                self.quote_depth = self.quote_depth.saturating_sub(1);
                self.style_stack.pop();
            }
            Tag::CodeBlock(_) => self.flush_code_block(),
            Tag::List(_) => {
                self.flush_line();
                self.list_stack.pop();
            }
            Tag::Item => self.flush_line(),
            Tag::Emphasis | Tag::Strong | Tag::Strikethrough => {
                self.style_stack.pop();
            }
            Tag::Link(_, dest, _) => {
                self.style_stack.pop();
                if !dest.is_empty() {
                    self.spans.push(Span::styled(
                        format!(" ({dest})"),
                        self.styles.link,
                    ));
                }
            }
            _ => {}
        }
    }

    fn heading_style(&self, level: HeadingLevel) -> Style {
        let idx = match level {
            HeadingLevel::H1 => 0,
            HeadingLevel::H2 => 1,
            HeadingLevel::H3 => 2,
            HeadingLevel::H4 => 3,
            HeadingLevel::H5 => 4,
            HeadingLevel::H6 => 5,
        };
        self.styles.headings[idx]
    }
}

/// Render markdown into styled lines with a base text style.
pub fn from_str(text: &str, styles: &MarkdownStyles, base: Style) -> MarkedText {
    let mut options = Options::empty();
    options.insert(Options::ENABLE_STRIKETHROUGH);
    let parser = Parser::new_ext(text, options);

    let mut writer = Writer::new(styles, base);
    for event in parser {
        match event {
            Event::Start(tag) => writer.start_tag(&tag),
            Event::End(tag) => writer.end_tag(&tag),
            Event::Text(text) => {
                if writer.code_lang.is_some() {
                    writer.code_buf.push_str(&text);
                } else {
                    let style = writer.current_style();
                    writer.push_text(&text, style);
                }
            }
            Event::Code(code) => {
                let style = writer.styles.code;
                writer.spans.push(Span::styled(code.to_string(), style));
            }
            // Chat text keeps its newlines: soft breaks are line breaks here.
            Event::SoftBreak | Event::HardBreak => writer.flush_line(),
            Event::Rule => {
                writer.flush_line();
                writer
                    .out
                    .push(MarkedLine::new(Line::from(Span::styled(
                        "─".repeat(24),
                        styles.rule,
                    ))));
            }
            _ => {}
        }
    }
    writer.flush_line();

    MarkedText { lines: writer.out }
}

/// Wrap a styled line to `width` columns, preserving span styles. Wrapped
/// continuation lines are indented by `indent` spaces.
pub fn style_wrap_with_indent(
    line: Line<'static>,
    width: u16,
    indent: usize,
) -> Vec<Line<'static>> {
    let width = (width as usize).max(1);
    let indent = indent.min(width.saturating_sub(1));

    // Tokenize spans into word/whitespace pieces that keep their style.
    let mut pieces: Vec<(String, Style)> = Vec::new();
    for span in line.spans {
        let style = span.style;
        let mut word = String::new();
        for ch in span.content.chars() {
            if ch == ' ' {
                if !word.is_empty() {
                    pieces.push((std::mem::take(&mut word), style));
                }
                pieces.push((" ".to_string(), style));
            } else {
                word.push(ch);
            }
        }
        if !word.is_empty() {
            pieces.push((word, style));
        }
    }

    let mut out = Vec::new();
    let mut current: Vec<Span<'static>> = Vec::new();
    let mut current_width = 0usize;

    let flush =
        |current: &mut Vec<Span<'static>>, current_width: &mut usize, out: &mut Vec<Line<'static>>| {
            if !current.is_empty() {
                out.push(Line::from(std::mem::take(current)));
            }
            *current_width = 0;
        };

    for (text, style) in pieces {
        let mut text = text.as_str();
        loop {
            let avail = width.saturating_sub(current_width).max(1);
            let text_width = text.width();
            if text_width <= avail {
                if !(text == " " && current.is_empty() && !out.is_empty()) {
                    if current.is_empty() && !out.is_empty() && indent > 0 {
                        current.push(Span::raw(" ".repeat(indent)));
                        current_width = indent;
                    }
                    current.push(Span::styled(text.to_string(), style));
                    current_width += text_width;
                }
                break;
            }
            // Piece does not fit. Break the line first; hard-split pieces
            // wider than a whole line.
            if !current.is_empty() {
                flush(&mut current, &mut current_width, &mut out);
                continue;
            }
            let max = width.saturating_sub(indent).max(1);
            let mut taken = 0usize;
            let mut split = text.len();
            for (byte_idx, ch) in text.char_indices() {
                let w = unicode_width::UnicodeWidthChar::width(ch).unwrap_or(0);
                if taken + w > max {
                    split = byte_idx;
                    break;
                }
                taken += w;
            }
            if split == 0 {
                // A single glyph wider than the line still has to go somewhere.
                split = text.chars().next().map_or(text.len(), char::len_utf8);
            }
            let (head, rest) = text.split_at(split);
            if indent > 0 && !out.is_empty() {
                current.push(Span::raw(" ".repeat(indent)));
                current_width = indent;
            }
            current.push(Span::styled(head.to_string(), style));
            current_width += head.width();
            flush(&mut current, &mut current_width, &mut out);
            if rest.is_empty() {
                break;
            }
            text = rest;
        }
    }
    flush(&mut current, &mut current_width, &mut out);

    if out.is_empty() {
        out.push(Line::from(""));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn styles() -> MarkdownStyles {
        MarkdownStyles::from_theme(&Theme::default())
    }

    #[test]
    fn plain_paragraph() {
        let text = from_str("hello world", &styles(), Style::default());
        assert_eq!(text.height(), 1);
        let rendered: String = text.lines[0]
            .line
            .spans
            .iter()
            .map(|s| s.content.as_ref())
            .collect();
        assert_eq!(rendered, "hello world");
    }

    #[test]
    fn heading_gets_heading_style() {
        let md = styles();
        let text = from_str("# Title", &md, Style::default());
        let line = text.lines.last().unwrap();
        assert_eq!(line.line.spans[0].style, md.headings[0]);
    }

    #[test]
    fn code_blocks_are_no_wrap() {
        let text = from_str("```rust\nfn main() {}\n```", &styles(), Style::default());
        assert!(text.lines.iter().any(|l| l.no_wrap));
        let code_line: String = text
            .lines
            .iter()
            .filter(|l| l.no_wrap)
            .flat_map(|l| l.line.spans.iter())
            .map(|s| s.content.as_ref())
            .collect();
        assert!(code_line.contains("fn main"));
    }

    #[test]
    fn list_items_get_markers() {
        let text = from_str("- one\n- two", &styles(), Style::default());
        let all: Vec<String> = text
            .lines
            .iter()
            .map(|l| {
                l.line
                    .spans
                    .iter()
                    .map(|s| s.content.as_ref())
                    .collect::<String>()
            })
            .collect();
        assert!(all.iter().any(|l| l.starts_with("- one")));
        assert!(all.iter().any(|l| l.starts_with("- two")));
    }

    #[test]
    fn wrap_preserves_styles() {
        let style = Style::default().fg(Color::Red);
        let line = Line::from(Span::styled("aaa bbb ccc ddd".to_string(), style));
        let wrapped = style_wrap_with_indent(line, 7, 0);
        assert!(wrapped.len() >= 2);
        assert!(wrapped.iter().all(|l| {
            l.spans
                .iter()
                .all(|s| s.style == style || s.content.chars().all(|c| c == ' '))
        }));
    }

    #[test]
    fn wrap_hard_splits_long_words() {
        let line = Line::from("abcdefghijklmnop");
        let wrapped = style_wrap_with_indent(line, 5, 0);
        assert!(wrapped.len() >= 3);
        for l in &wrapped {
            let w: usize = l.spans.iter().map(|s| s.content.as_ref().width()).sum();
            assert!(w <= 5);
        }
    }

    #[test]
    fn wrap_indents_continuations() {
        let line = Line::from("one two three four five");
        let wrapped = style_wrap_with_indent(line, 10, 2);
        assert!(wrapped.len() >= 2);
        assert!(wrapped[1].spans[0].content.starts_with("  "));
    }
}
