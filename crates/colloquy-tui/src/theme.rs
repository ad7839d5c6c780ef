//! Component-keyed theme for the feed renderer.

use ratatui::style::{Color, Modifier, Style};

/// Themeable UI components.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Component {
    UserMessage,
    UserMessageAccent,
    AssistantMessage,
    ThinkingText,
    StreamingIndicator,
    ErrorBanner,
    LoadingBlock,
    GapRow,
    MarkdownH1,
    MarkdownH2,
    MarkdownH3,
    MarkdownH4,
    MarkdownH5,
    MarkdownH6,
    MarkdownCode,
    MarkdownCodeBlock,
    MarkdownBlockquote,
    MarkdownLink,
    MarkdownListBullet,
    MarkdownListNumber,
    MarkdownRule,
}

/// Style lookup table. One instance lives for the app; widgets receive it by
/// reference on every render.
#[derive(Debug, Clone)]
pub struct Theme {
    pub name: String,
}

impl Default for Theme {
    fn default() -> Self {
        Self {
            name: "default".to_string(),
        }
    }
}

impl Theme {
    pub fn style(&self, component: Component) -> Style {
        match component {
            Component::UserMessage => Style::default().fg(Color::White),
            Component::UserMessageAccent => Style::default().fg(Color::Cyan),
            Component::AssistantMessage => Style::default().fg(Color::Gray),
            Component::ThinkingText => Style::default()
                .fg(Color::DarkGray)
                .add_modifier(Modifier::ITALIC),
            Component::StreamingIndicator => Style::default().fg(Color::Cyan),
            Component::ErrorBanner => Style::default()
                .fg(Color::Red)
                .add_modifier(Modifier::BOLD),
            Component::LoadingBlock => Style::default().fg(Color::DarkGray),
            Component::GapRow => Style::default(),
            Component::MarkdownH1 => Style::default()
                .fg(Color::Magenta)
                .add_modifier(Modifier::BOLD | Modifier::REVERSED),
            Component::MarkdownH2 => Style::default()
                .fg(Color::Magenta)
                .add_modifier(Modifier::BOLD | Modifier::UNDERLINED),
            Component::MarkdownH3 => Style::default()
                .fg(Color::Magenta)
                .add_modifier(Modifier::BOLD),
            Component::MarkdownH4 => Style::default()
                .fg(Color::Magenta)
                .add_modifier(Modifier::UNDERLINED),
            Component::MarkdownH5 | Component::MarkdownH6 => Style::default()
                .fg(Color::Magenta)
                .add_modifier(Modifier::ITALIC),
            Component::MarkdownCode => Style::default().fg(Color::Yellow).bg(Color::Black),
            Component::MarkdownCodeBlock => Style::default().fg(Color::Yellow),
            Component::MarkdownBlockquote => Style::default()
                .fg(Color::Green)
                .add_modifier(Modifier::ITALIC),
            Component::MarkdownLink => Style::default()
                .fg(Color::Blue)
                .add_modifier(Modifier::UNDERLINED),
            Component::MarkdownListBullet | Component::MarkdownListNumber => {
                Style::default().fg(Color::Cyan)
            }
            Component::MarkdownRule => Style::default().fg(Color::DarkGray),
        }
    }
}
