//! Conversation history display component

use crate::session::{ChatMessage, LocalStatus, Origin, Provenance};
use crate::ui::markdown::render_markdown;
use chrono::{DateTime, Local, TimeZone};
use ratatui::{
    buffer::Buffer,
    layout::Rect,
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Widget},
};
use std::cell::Cell;
use std::fmt::Display;

/// Display pattern for message timestamps, e.g. "May 1, 2024, 02:05 PM"
pub const TIMESTAMP_FORMAT: &str = "%b %-d, %Y, %I:%M %p";

/// Bubbles take at most this share of the pane width
const BUBBLE_WIDTH_PERCENT: usize = 70;
const MIN_BUBBLE_WIDTH: usize = 12;

pub fn format_timestamp<Tz>(timestamp: &DateTime<Tz>) -> String
where
    Tz: TimeZone,
    Tz::Offset: Display,
{
    timestamp.format(TIMESTAMP_FORMAT).to_string()
}

/// Scroll state and local notices for the message pane.
///
/// The messages themselves are owned by the session and passed in at render time.
#[derive(Debug, Default)]
pub struct ConversationHistory {
    /// Lines scrolled up from the bottom; 0 follows new messages
    scroll_from_bottom: usize,
    /// Upper bound for scrolling, refreshed on every render
    max_scroll: Cell<usize>,
    notice: Option<String>,
}

impl ConversationHistory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn scroll_up(&mut self, lines: usize) {
        self.scroll_from_bottom = (self.scroll_from_bottom + lines).min(self.max_scroll.get());
    }

    pub fn scroll_down(&mut self, lines: usize) {
        self.scroll_from_bottom = self.scroll_from_bottom.saturating_sub(lines);
    }

    pub fn scroll_to_bottom(&mut self) {
        self.scroll_from_bottom = 0;
    }

    pub fn scroll_offset(&self) -> usize {
        self.scroll_from_bottom
    }

    /// Show a local-only note (help text) under the thread
    pub fn set_notice(&mut self, notice: impl Into<String>) {
        self.notice = Some(notice.into());
        self.scroll_to_bottom();
    }

    pub fn clear_notice(&mut self) {
        self.notice = None;
    }

    pub fn view<'a>(&'a self, messages: &'a [ChatMessage]) -> HistoryView<'a> {
        HistoryView {
            history: self,
            messages,
        }
    }
}

/// Borrowed pairing of scroll state and the thread, ready to draw
pub struct HistoryView<'a> {
    history: &'a ConversationHistory,
    messages: &'a [ChatMessage],
}

impl Widget for HistoryView<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let block = Block::default().borders(Borders::ALL).title("💬 Conversation");
        let inner_area = block.inner(area);
        block.render(area, buf);

        let width = inner_area.width as usize;
        let height = inner_area.height as usize;
        let mut all_lines = if self.messages.is_empty() {
            welcome_lines()
        } else {
            thread_lines(self.messages, width)
        };

        if let Some(notice) = &self.history.notice {
            all_lines.push(Line::default());
            all_lines.extend(render_markdown(
                notice,
                Style::default().fg(Color::Yellow),
                width.saturating_sub(2),
            ));
        }

        // Anchor to the bottom, then apply the scroll offset
        let total = all_lines.len();
        let max_scroll = total.saturating_sub(height);
        self.history.max_scroll.set(max_scroll);
        let offset = self.history.scroll_from_bottom.min(max_scroll);
        let end = total - offset;
        let start = end.saturating_sub(height);

        for (i, line) in all_lines[start..end].iter().enumerate() {
            buf.set_line(inner_area.x, inner_area.y + i as u16, line, inner_area.width);
        }
    }
}

fn welcome_lines() -> Vec<Line<'static>> {
    vec![
        Line::from(vec![Span::styled(
            "Say hello to start a conversation.",
            Style::default().fg(Color::Green),
        )]),
        Line::from(vec![Span::raw("")]),
        Line::from(vec![Span::styled(
            "Enter sends. Type /help for commands.",
            Style::default().fg(Color::DarkGray),
        )]),
    ]
}

/// Lay out every message as a bubble, with a blank line between bubbles
pub fn thread_lines(messages: &[ChatMessage], width: usize) -> Vec<Line<'static>> {
    let mut lines = Vec::new();
    for (i, message) in messages.iter().enumerate() {
        if i > 0 {
            lines.push(Line::default());
        }
        lines.extend(render_message(message, width));
    }
    lines
}

/// Render a single message: markdown body plus timestamp footer.
/// Agent messages hug the left edge, user messages the right.
pub fn render_message(message: &ChatMessage, width: usize) -> Vec<Line<'static>> {
    let origin = message.origin();
    let bubble_width = (width * BUBBLE_WIDTH_PERCENT / 100)
        .max(MIN_BUBBLE_WIDTH)
        .min(width);
    let text_width = bubble_width.saturating_sub(2);

    let mut body = render_markdown(&message.message.text, content_style(origin), text_width);
    body.push(footer_line(message));

    let bubble = body
        .iter()
        .map(Line::width)
        .max()
        .unwrap_or(0)
        .min(bubble_width);

    let (gutter, gutter_style) = match origin {
        Origin::Agent => ("▌ ".to_string(), Style::default().fg(Color::Green)),
        Origin::User => {
            let pad = width.saturating_sub(bubble + 2);
            (
                format!("{}▐ ", " ".repeat(pad)),
                Style::default().fg(Color::Blue),
            )
        }
    };

    body.into_iter()
        .map(|line| {
            let mut spans = vec![Span::styled(gutter.clone(), gutter_style)];
            spans.extend(line.spans);
            Line::from(spans)
        })
        .collect()
}

fn footer_line(message: &ChatMessage) -> Line<'static> {
    let timestamp = format_timestamp(&message.message.date_created.with_timezone(&Local));
    let mut spans = vec![Span::styled(
        timestamp,
        Style::default().fg(Color::DarkGray).add_modifier(Modifier::DIM),
    )];

    match message.provenance {
        Provenance::Local {
            status: LocalStatus::Pending,
        } => spans.push(Span::styled(" · sending", Style::default().fg(Color::DarkGray))),
        Provenance::Local {
            status: LocalStatus::Failed,
        } => spans.push(Span::styled(
            " · not delivered",
            Style::default().fg(Color::Red),
        )),
        _ => {}
    }

    Line::from(spans)
}

/// Get content style based on origin
fn content_style(origin: Origin) -> Style {
    match origin {
        Origin::User => Style::default().fg(Color::LightBlue),
        Origin::Agent => Style::default(),
    }
}
