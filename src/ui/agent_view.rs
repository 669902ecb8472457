//! Header, loading and load-failure views for the agent

use crate::api::Agent;
use ratatui::{
    buffer::Buffer,
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph, Widget},
};

const SPINNER: [&str; 4] = ["⠋", "⠙", "⠹", "⠸"];

/// Title bar: avatar reference, agent title and key hints
pub struct AgentHeader<'a> {
    pub agent: &'a Agent,
    pub title: &'a str,
}

impl Widget for AgentHeader<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let mut spans = vec![
            Span::styled("🤖 ", Style::default()),
            Span::styled(
                self.title.to_string(),
                Style::default().add_modifier(Modifier::BOLD),
            ),
        ];
        if let Some(avatar) = self.agent.avatar_url.as_deref() {
            spans.push(Span::styled(
                format!("  {avatar}"),
                Style::default().fg(Color::DarkGray),
            ));
        }

        let hints = Line::from(vec![Span::styled(
            "Ctrl+L new chat · /help · Esc quit",
            Style::default().fg(Color::DarkGray),
        )]);

        let block = Block::default().borders(Borders::BOTTOM);
        let inner = block.inner(area);
        block.render(area, buf);

        buf.set_line(inner.x, inner.y, &Line::from(spans), inner.width);
        if inner.height > 1 {
            buf.set_line(inner.x, inner.y + 1, &hints, inner.width);
        }
    }
}

/// Spinner shown while the agent loads
pub struct LoadingView {
    pub tick: usize,
}

impl Widget for LoadingView {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let frame = SPINNER[self.tick % SPINNER.len()];
        let text = Line::from(vec![
            Span::styled(frame, Style::default().fg(Color::Yellow)),
            Span::raw(" Loading agent..."),
        ]);
        Paragraph::new(text)
            .alignment(Alignment::Center)
            .render(centered_row(area, 1), buf);
    }
}

/// Static view shown when the agent could not be loaded
pub struct LoadErrorView<'a> {
    pub detail: &'a str,
}

impl Widget for LoadErrorView<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let lines = vec![
            Line::from(Span::styled(
                "Error loading agent",
                Style::default().fg(Color::Red).add_modifier(Modifier::BOLD),
            )),
            Line::from(""),
            Line::from("Check your configuration and try again."),
            Line::from(Span::styled(
                self.detail.to_string(),
                Style::default().fg(Color::DarkGray),
            )),
            Line::from(""),
            Line::from(Span::styled(
                "Press any key to exit.",
                Style::default().fg(Color::DarkGray),
            )),
        ];
        let height = lines.len() as u16;
        Paragraph::new(lines)
            .alignment(Alignment::Center)
            .render(centered_row(area, height), buf);
    }
}

fn centered_row(area: Rect, height: u16) -> Rect {
    let pad = area.height.saturating_sub(height) / 2;
    Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(pad),
            Constraint::Length(height.min(area.height)),
            Constraint::Min(0),
        ])
        .split(area)[1]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rows(buf: &Buffer) -> String {
        let area = buf.area;
        (0..area.height)
            .map(|y| {
                (0..area.width)
                    .map(|x| buf.get(x, y).symbol().to_string())
                    .collect::<String>()
            })
            .collect::<Vec<_>>()
            .join("\n")
    }

    #[test]
    fn header_shows_title_and_avatar() {
        let agent = Agent {
            id: "a1".into(),
            title: "Concierge".into(),
            avatar_url: Some("https://cdn/avatar.png".into()),
        };
        let area = Rect::new(0, 0, 60, 3);
        let mut buf = Buffer::empty(area);
        AgentHeader {
            agent: &agent,
            title: "Concierge",
        }
        .render(area, &mut buf);

        let text = rows(&buf);
        assert!(text.contains("Concierge"));
        assert!(text.contains("https://cdn/avatar.png"));
    }

    #[test]
    fn error_view_names_the_failure() {
        let area = Rect::new(0, 0, 60, 12);
        let mut buf = Buffer::empty(area);
        LoadErrorView {
            detail: "agent service returned 500",
        }
        .render(area, &mut buf);

        let text = rows(&buf);
        assert!(text.contains("Error loading agent"));
        assert!(text.contains("returned 500"));
    }
}
