use crate::ui::conversation::commands::{parse_slash_command, SlashCommand};
use crossterm::event::{KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use ratatui::{
    buffer::Buffer,
    layout::Rect,
    style::{Color, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Widget},
};
use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

/// Result returned when the user interacts with the conversation composer
#[derive(Debug, PartialEq)]
pub enum ConversationResult {
    Submitted(String),
    Command(SlashCommand),
    None,
}

/// State for the text area within the composer
#[derive(Debug, Clone, Default)]
pub struct TextAreaState {
    pub content: String,
    /// Cursor position in chars, not bytes
    pub cursor: usize,
}

impl TextAreaState {
    fn byte_index(&self, char_index: usize) -> usize {
        self.content
            .char_indices()
            .nth(char_index)
            .map(|(i, _)| i)
            .unwrap_or(self.content.len())
    }

    fn char_len(&self) -> usize {
        self.content.chars().count()
    }

    fn insert_char(&mut self, c: char) {
        let at = self.byte_index(self.cursor);
        self.content.insert(at, c);
        self.cursor += 1;
    }

    /// Delete character before cursor
    fn backspace(&mut self) {
        if self.cursor > 0 {
            self.cursor -= 1;
            let at = self.byte_index(self.cursor);
            self.content.remove(at);
        }
    }

    /// Delete character at cursor
    fn delete(&mut self) {
        if self.cursor < self.char_len() {
            let at = self.byte_index(self.cursor);
            self.content.remove(at);
        }
    }

    fn take(&mut self) -> String {
        self.cursor = 0;
        std::mem::take(&mut self.content)
    }
}

/// Single-line message input
#[derive(Debug, Clone)]
pub struct ConversationComposer {
    state: TextAreaState,
    placeholder: String,
    disabled: bool,
}

impl ConversationComposer {
    pub fn new(placeholder: impl Into<String>) -> Self {
        Self {
            state: TextAreaState::default(),
            placeholder: placeholder.into(),
            disabled: false,
        }
    }

    /// Handle key input. Editing keys are ignored while disabled.
    pub fn handle_key(&mut self, key: KeyEvent) -> ConversationResult {
        if key.kind != KeyEventKind::Press || self.disabled {
            return ConversationResult::None;
        }

        match key.code {
            KeyCode::Enter => {
                if self.state.content.trim().is_empty() {
                    return ConversationResult::None;
                }
                if let Some(command) = parse_slash_command(&self.state.content) {
                    self.state.take();
                    return ConversationResult::Command(command);
                }
                // Kept until the send succeeds so a failed message can be retried
                return ConversationResult::Submitted(self.state.content.clone());
            }
            KeyCode::Char(_) if key.modifiers.contains(KeyModifiers::CONTROL) => {}
            KeyCode::Char(c) => self.state.insert_char(c),
            KeyCode::Backspace => self.state.backspace(),
            KeyCode::Delete => self.state.delete(),
            KeyCode::Left => self.state.cursor = self.state.cursor.saturating_sub(1),
            KeyCode::Right => {
                if self.state.cursor < self.state.char_len() {
                    self.state.cursor += 1;
                }
            }
            KeyCode::Home => self.state.cursor = 0,
            KeyCode::End => self.state.cursor = self.state.char_len(),
            _ => {}
        }

        ConversationResult::None
    }

    /// Paste text at the cursor; newlines become spaces
    pub fn insert_str(&mut self, text: &str) {
        if self.disabled {
            return;
        }
        for c in text.chars() {
            self.state.insert_char(if c == '\n' || c == '\r' { ' ' } else { c });
        }
    }

    /// Disable input while a request is in flight
    pub fn set_disabled(&mut self, disabled: bool) {
        self.disabled = disabled;
    }

    pub fn is_disabled(&self) -> bool {
        self.disabled
    }

    /// Get current content
    pub fn content(&self) -> &str {
        &self.state.content
    }

    /// Clear content
    pub fn clear(&mut self) {
        self.state.take();
    }
}

impl Widget for &ConversationComposer {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let (title, border) = if self.disabled {
            ("⏳ Waiting for reply...", Style::default().fg(Color::DarkGray))
        } else {
            ("✉ Message", Style::default().fg(Color::Green))
        };

        let block = Block::default().borders(Borders::ALL).title(title).style(border);
        let inner_area = block.inner(area);
        block.render(area, buf);

        let line = if self.state.content.is_empty() {
            Line::from(vec![Span::styled(
                self.placeholder.as_str(),
                Style::default().fg(Color::DarkGray),
            )])
        } else {
            let mut content = self.state.content.clone();
            if !self.disabled {
                content.insert(self.state.byte_index(self.state.cursor), '▌');
            }
            let style = if self.disabled {
                Style::default().fg(Color::DarkGray)
            } else {
                Style::default()
            };

            // Keep the cursor visible on long input
            let width = inner_area.width as usize;
            let before_cursor = &self.state.content[..self.state.byte_index(self.state.cursor)];
            let mut overflow = before_cursor.width().saturating_sub(width.saturating_sub(1));
            let visible: String = content
                .chars()
                .skip_while(|c| {
                    if overflow == 0 {
                        return false;
                    }
                    overflow = overflow.saturating_sub(c.width().unwrap_or(0));
                    true
                })
                .collect();
            Line::from(vec![Span::styled(visible, style)])
        };

        buf.set_line(inner_area.x, inner_area.y, &line, inner_area.width);
    }
}
