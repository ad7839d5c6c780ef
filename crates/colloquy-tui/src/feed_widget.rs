//! FeedWidget - renders the windowed message feed into a frame buffer.
//!
//! Only the messages inside the feed window are materialized. Each message
//! owns a cell with its rendered lines, invalidated by content hash, so a
//! frame re-renders just the cells whose content actually changed - during
//! a stream that is the one streaming message. Completion changes the hash
//! once more, which is what makes the post-stream full-fidelity re-render
//! happen exactly once.

use crate::render::{AdaptiveRenderer, RenderRequest, StrategyKind};
use crate::theme::{Component, Theme};
use colloquy_core::{
    ChatStore, ContentStatus, Message, MessageGrouping, MessageId, Role, ViewportWindow,
};
use ratatui::buffer::Buffer;
use ratatui::layout::Rect;
use ratatui::text::{Line, Span};
use std::collections::HashMap;
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

/// Left gutter: accent bar for user rows, blank for the rest.
const GUTTER_WIDTH: u16 = 2;

/// What one sync pass did; used for render accounting.
#[derive(Debug, Default)]
pub struct RenderPass {
    /// Strategy of every block render performed this pass.
    pub rendered: Vec<StrategyKind>,
    /// Cells served from cache.
    pub reused: usize,
}

struct MessageCell {
    id: MessageId,
    content_hash: u64,
    lines: Vec<Line<'static>>,
}

pub struct FeedWidget {
    grouping: MessageGrouping,
    cells: Vec<MessageCell>,
    /// Top row of each cell in content coordinates.
    starts: Vec<usize>,
    total_height: usize,
}

impl FeedWidget {
    pub fn new(grouping: MessageGrouping) -> Self {
        Self {
            grouping,
            cells: Vec::new(),
            starts: Vec::new(),
            total_height: 0,
        }
    }

    fn spacing(&self) -> usize {
        match self.grouping {
            MessageGrouping::Spacious => 1,
            MessageGrouping::Compact => 0,
        }
    }

    /// Total content height including inter-message gaps. Feeds the scroll
    /// coordinator's extent.
    pub fn total_height(&self) -> usize {
        self.total_height
    }

    /// Rebuild cells for the current window, reusing every cell whose
    /// content hash is unchanged.
    pub fn sync(
        &mut self,
        store: &ChatStore,
        window: ViewportWindow,
        renderer: &mut AdaptiveRenderer,
        theme: &Theme,
        width: u16,
        viewport_height: u16,
    ) -> RenderPass {
        let mut pass = RenderPass::default();
        let mut existing: HashMap<MessageId, MessageCell> = self
            .cells
            .drain(..)
            .map(|cell| (cell.id.clone(), cell))
            .collect();

        let mut cells = Vec::with_capacity(window.count);
        for idx in window.range() {
            let Some(message) = store.message_at(idx) else {
                continue;
            };
            let content_hash = cell_hash(store, message, width, viewport_height);
            if let Some(cell) = existing.remove(&message.id) {
                if cell.content_hash == content_hash {
                    pass.reused += 1;
                    cells.push(cell);
                    continue;
                }
            }
            let lines = build_cell_lines(
                store,
                message,
                renderer,
                theme,
                width,
                viewport_height,
                &mut pass,
            );
            cells.push(MessageCell {
                id: message.id.clone(),
                content_hash,
                lines,
            });
        }
        self.cells = cells;

        self.starts.clear();
        let spacing = self.spacing();
        let mut cursor = 0usize;
        for (idx, cell) in self.cells.iter().enumerate() {
            self.starts.push(cursor);
            cursor += cell.lines.len();
            if idx + 1 < self.cells.len() {
                cursor += spacing;
            }
        }
        self.total_height = cursor;
        pass
    }

    /// Draw the slice `[offset, offset + area.height)` of the content.
    pub fn render(&self, buf: &mut Buffer, area: Rect, offset: usize) {
        if area.width == 0 || area.height == 0 || self.cells.is_empty() {
            return;
        }
        let viewport_bottom = offset + usize::from(area.height);

        // Cells before this index end at or before the offset.
        let first = self
            .starts
            .partition_point(|&start| start <= offset)
            .saturating_sub(1);

        for idx in first..self.cells.len() {
            let start = self.starts[idx];
            if start >= viewport_bottom {
                break;
            }
            let cell = &self.cells[idx];
            let first_visible_line = offset.saturating_sub(start);
            for (line_idx, line) in cell.lines.iter().enumerate().skip(first_visible_line) {
                let content_y = start + line_idx;
                if content_y < offset {
                    continue;
                }
                if content_y >= viewport_bottom {
                    break;
                }
                let y = area.y + (content_y - offset) as u16;
                buf.set_line(area.x, y, line, area.width);
            }
        }
    }
}

fn cell_hash(store: &ChatStore, message: &Message, width: u16, viewport_height: u16) -> u64 {
    let mut hasher = DefaultHasher::new();
    message.status.hash(&mut hasher);
    message.error.hash(&mut hasher);
    width.hash(&mut hasher);
    viewport_height.hash(&mut hasher);
    for block_id in &message.block_ids {
        block_id.hash(&mut hasher);
        match store.block(block_id) {
            Some(block) => {
                block.status.hash(&mut hasher);
                block.content.hash(&mut hasher);
            }
            None => store.block_load_failed(block_id).hash(&mut hasher),
        }
    }
    hasher.finish()
}

fn build_cell_lines(
    store: &ChatStore,
    message: &Message,
    renderer: &mut AdaptiveRenderer,
    theme: &Theme,
    width: u16,
    viewport_height: u16,
    pass: &mut RenderPass,
) -> Vec<Line<'static>> {
    let inner_width = width.saturating_sub(GUTTER_WIDTH).max(1);
    let mut body: Vec<Line<'static>> = Vec::new();

    for block_id in &message.block_ids {
        match store.block(block_id) {
            Some(block) => {
                let is_streaming = block.status == ContentStatus::Streaming;
                let req = RenderRequest {
                    content: &block.content,
                    kind: block.kind,
                    width: inner_width,
                    viewport_height,
                    theme,
                };
                let (kind, lines) = renderer.render_block(block_id, is_streaming, &req);
                pass.rendered.push(kind);
                body.extend(lines);
            }
            None if store.block_load_failed(block_id) => {
                body.push(Line::from(Span::styled(
                    "! block unavailable, retrying".to_string(),
                    theme.style(Component::ErrorBanner),
                )));
            }
            None => {
                body.push(Line::from(Span::styled(
                    "… loading".to_string(),
                    theme.style(Component::LoadingBlock),
                )));
            }
        }
    }

    if message.status == ContentStatus::Streaming {
        body.push(Line::from(Span::styled(
            "●".to_string(),
            theme.style(Component::StreamingIndicator),
        )));
    }
    if message.status == ContentStatus::Error {
        // Dismissing clears `error`; the banner goes, the content stays.
        if let Some(reason) = message.error.as_deref() {
            body.push(Line::from(Span::styled(
                format!("✗ {reason} (press x to dismiss)"),
                theme.style(Component::ErrorBanner),
            )));
        }
    }
    if body.is_empty() {
        body.push(Line::from(""));
    }

    // Prepend the gutter to every line.
    let gutter_style = match message.role {
        Role::User => theme.style(Component::UserMessageAccent),
        _ => theme.style(Component::GapRow),
    };
    let gutter_text = match message.role {
        Role::User => "▌ ",
        _ => "  ",
    };
    body.into_iter()
        .map(|line| {
            let mut spans = vec![Span::styled(gutter_text.to_string(), gutter_style)];
            spans.extend(line.spans);
            Line::from(spans)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use colloquy_core::{
        BlockId, DeviceTier, MessageId, Settings, StreamEvent, StreamPayload, WindowedMessageFeed,
    };
    use ratatui::Terminal;
    use ratatui::backend::TestBackend;
    use std::time::Instant;

    fn buffer_text(buf: &Buffer, area: Rect) -> String {
        let mut out = String::new();
        for y in area.y..area.y + area.height {
            for x in area.x..area.x + area.width {
                if let Some(cell) = buf.cell((x, y)) {
                    out.push_str(cell.symbol());
                }
            }
            out.push('\n');
        }
        out
    }

    fn populated_store(count: usize) -> ChatStore {
        let mut store = ChatStore::new();
        for i in 1..=count {
            store.add_user_message(&format!("message number {i}"));
        }
        store
    }

    #[test]
    fn renders_window_bottom_anchored() {
        let store = populated_store(30);
        let mut feed = WindowedMessageFeed::new(20, 20);
        feed.set_total(store.len());
        let mut renderer = AdaptiveRenderer::new(DeviceTier::High);
        let mut widget = FeedWidget::new(MessageGrouping::Compact);
        let theme = Theme::default();

        let backend = TestBackend::new(40, 10);
        let mut terminal = Terminal::new(backend).unwrap();
        terminal
            .draw(|f| {
                let area = f.area();
                widget.sync(&store, feed.window(), &mut renderer, &theme, area.width, area.height);
                let offset = widget.total_height().saturating_sub(area.height as usize);
                widget.render(f.buffer_mut(), area, offset);
            })
            .unwrap();

        let text = buffer_text(terminal.backend().buffer(), Rect::new(0, 0, 40, 10));
        assert!(text.contains("message number 30"), "tail visible: {text}");
        assert!(!text.contains("message number 11"), "window start offscreen");
    }

    #[test]
    fn partial_first_cell_renders_from_offset() {
        let mut store = ChatStore::new();
        let long: String = (0..12)
            .map(|i| format!("line {i}"))
            .collect::<Vec<_>>()
            .join("\n");
        store.add_user_message(&long);
        store.add_user_message("second message");

        let mut feed = WindowedMessageFeed::new(20, 20);
        feed.set_total(store.len());
        let mut renderer = AdaptiveRenderer::new(DeviceTier::High);
        let mut widget = FeedWidget::new(MessageGrouping::Compact);
        let theme = Theme::default();

        let area = Rect::new(0, 0, 40, 5);
        let mut buf = Buffer::empty(area);
        widget.sync(&store, feed.window(), &mut renderer, &theme, area.width, area.height);

        // Offset inside the first (12-line) message.
        widget.render(&mut buf, area, 10);
        let text = buffer_text(&buf, area);
        assert!(text.contains("line 10"), "partial first cell: {text}");
        assert!(text.contains("second message"), "next cell follows: {text}");
        assert!(!text.contains("line 3"), "lines above offset clipped");
    }

    #[test]
    fn spacious_grouping_adds_gap_rows() {
        let store = populated_store(3);
        let mut feed = WindowedMessageFeed::new(20, 20);
        feed.set_total(store.len());
        let theme = Theme::default();

        let mut renderer = AdaptiveRenderer::new(DeviceTier::High);
        let mut compact = FeedWidget::new(MessageGrouping::Compact);
        compact.sync(&store, feed.window(), &mut renderer, &theme, 40, 10);
        let mut spacious = FeedWidget::new(MessageGrouping::Spacious);
        spacious.sync(&store, feed.window(), &mut renderer, &theme, 40, 10);

        assert_eq!(compact.total_height(), 3);
        assert_eq!(spacious.total_height(), 5);
    }

    #[test]
    fn unchanged_cells_are_reused() {
        let store = populated_store(5);
        let mut feed = WindowedMessageFeed::new(20, 20);
        feed.set_total(store.len());
        let mut renderer = AdaptiveRenderer::new(DeviceTier::High);
        let mut widget = FeedWidget::new(MessageGrouping::Compact);
        let theme = Theme::default();

        let pass = widget.sync(&store, feed.window(), &mut renderer, &theme, 40, 10);
        assert_eq!(pass.rendered.len(), 5);
        assert_eq!(pass.reused, 0);

        let pass = widget.sync(&store, feed.window(), &mut renderer, &theme, 40, 10);
        assert!(pass.rendered.is_empty());
        assert_eq!(pass.reused, 5);

        // Width change invalidates everything.
        let pass = widget.sync(&store, feed.window(), &mut renderer, &theme, 30, 10);
        assert_eq!(pass.rendered.len(), 5);
    }

    #[test]
    fn one_full_render_after_completion() {
        use crate::scroll::ScrollCoordinator;
        use crate::session::StreamSession;
        use colloquy_core::MemoryScrollStore;

        let settings = Settings {
            device_tier_override: Some(DeviceTier::Low),
            ..Settings::default()
        };
        let mut session = StreamSession::new(&settings);
        let mut scroll =
            ScrollCoordinator::new("chat", Box::new(MemoryScrollStore::new()), &settings);
        scroll.set_extent(100, 10);
        let mut renderer = AdaptiveRenderer::new(session.tier());
        let mut widget = FeedWidget::new(MessageGrouping::Compact);
        let theme = Theme::default();
        let t0 = Instant::now();

        let delta = StreamEvent::new(StreamPayload::TextDelta {
            message_id: MessageId::from("m1"),
            block_id: BlockId::from("b1"),
            delta: "streaming body ".repeat(100),
        });
        session.handle_event(&delta, &mut scroll, t0);
        session.on_tick(t0, &mut scroll);

        let pass = widget.sync(
            session.store(),
            session.feed().window(),
            &mut renderer,
            &theme,
            40,
            10,
        );
        assert_eq!(pass.rendered, vec![StrategyKind::Minimal]);

        let complete = StreamEvent::new(StreamPayload::TextComplete {
            message_id: MessageId::from("m1"),
            block_id: BlockId::from("b1"),
        });
        session.handle_event(&complete, &mut scroll, t0);

        // Exactly one full-fidelity re-render after completion...
        let pass = widget.sync(
            session.store(),
            session.feed().window(),
            &mut renderer,
            &theme,
            40,
            10,
        );
        assert_eq!(pass.rendered, vec![StrategyKind::Full]);

        // ...and none on later frames.
        let pass = widget.sync(
            session.store(),
            session.feed().window(),
            &mut renderer,
            &theme,
            40,
            10,
        );
        assert!(pass.rendered.is_empty());
        assert_eq!(pass.reused, 1);
    }

    #[test]
    fn error_banner_is_rendered() {
        let mut store = ChatStore::new();
        let msg = MessageId::from("m1");
        let block = BlockId::from("b1");
        store.ensure_streaming_block(&msg, &block, colloquy_core::BlockKind::Text);
        store.set_block_content(&block, "partial");
        store.fail_message(&msg, "connection reset");

        let mut feed = WindowedMessageFeed::new(20, 20);
        feed.set_total(store.len());
        let mut renderer = AdaptiveRenderer::new(DeviceTier::High);
        let mut widget = FeedWidget::new(MessageGrouping::Compact);
        let theme = Theme::default();

        let area = Rect::new(0, 0, 60, 6);
        let mut buf = Buffer::empty(area);
        widget.sync(&store, feed.window(), &mut renderer, &theme, area.width, area.height);
        widget.render(&mut buf, area, 0);

        let text = buffer_text(&buf, area);
        assert!(text.contains("connection reset"));
        assert!(text.contains("partial"), "partial content stays visible");

        // Dismissal removes the banner and keeps the content.
        store.dismiss_error(&msg);
        let mut buf = Buffer::empty(area);
        widget.sync(&store, feed.window(), &mut renderer, &theme, area.width, area.height);
        widget.render(&mut buf, area, 0);
        let text = buffer_text(&buf, area);
        assert!(!text.contains("connection reset"));
        assert!(text.contains("partial"));
    }

    #[test]
    fn missing_block_shows_loading_row() {
        let mut store = ChatStore::new();
        let mut message = colloquy_core::Message::new(colloquy_core::Role::Assistant);
        message.status = ContentStatus::Complete;
        message.block_ids.push(BlockId::from("not-resident"));
        store.add_message(message);

        let mut feed = WindowedMessageFeed::new(20, 20);
        feed.set_total(store.len());
        let mut renderer = AdaptiveRenderer::new(DeviceTier::High);
        let mut widget = FeedWidget::new(MessageGrouping::Compact);
        let theme = Theme::default();

        let area = Rect::new(0, 0, 40, 4);
        let mut buf = Buffer::empty(area);
        widget.sync(&store, feed.window(), &mut renderer, &theme, area.width, area.height);
        widget.render(&mut buf, area, 0);

        assert!(buffer_text(&buf, area).contains("loading"));
    }
}
