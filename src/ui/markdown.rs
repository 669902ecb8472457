//! Markdown to ratatui lines, with word wrapping.

use pulldown_cmark::{CodeBlockKind, Event, Options, Parser, Tag, TagEnd};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

const LIST_INDENT: usize = 2;
const RULE_WIDTH: usize = 24;

/// A logical line before wrapping
struct Block {
    spans: Vec<Span<'static>>,
    /// Width of the continuation indent when the line wraps
    indent: usize,
    /// Code lines are kept verbatim
    preformatted: bool,
}

struct Renderer {
    base: Style,
    blocks: Vec<Block>,
    current: Vec<Span<'static>>,
    current_indent: usize,
    style_stack: Vec<Style>,
    lists: Vec<Option<u64>>,
    quote_depth: usize,
    in_code_block: bool,
    link_target: Option<String>,
}

impl Renderer {
    fn new(base: Style) -> Self {
        Self {
            base,
            blocks: Vec::new(),
            current: Vec::new(),
            current_indent: 0,
            style_stack: vec![base],
            lists: Vec::new(),
            quote_depth: 0,
            in_code_block: false,
            link_target: None,
        }
    }

    fn style(&self) -> Style {
        self.style_stack.last().copied().unwrap_or(self.base)
    }

    fn push_style(&mut self, patch: Style) {
        let style = self.style().patch(patch);
        self.style_stack.push(style);
    }

    fn pop_style(&mut self) {
        if self.style_stack.len() > 1 {
            self.style_stack.pop();
        }
    }

    fn code_style(&self) -> Style {
        self.base.fg(Color::Magenta)
    }

    fn quote_prefix(&self) -> Option<Span<'static>> {
        (self.quote_depth > 0).then(|| {
            Span::styled("│ ".repeat(self.quote_depth), self.base.fg(Color::DarkGray))
        })
    }

    fn push_text(&mut self, text: &str, style: Style) {
        if text.is_empty() {
            return;
        }
        if self.current.is_empty() {
            if let Some(prefix) = self.quote_prefix() {
                self.current_indent += prefix.content.width();
                self.current.push(prefix);
            }
        }
        self.current.push(Span::styled(text.to_string(), style));
    }

    fn flush(&mut self) {
        if self.current.is_empty() {
            return;
        }
        self.blocks.push(Block {
            spans: std::mem::take(&mut self.current),
            indent: self.current_indent,
            preformatted: false,
        });
        self.current_indent = 0;
    }

    fn blank(&mut self) {
        self.flush();
        if self.blocks.last().is_some_and(|b| !b.spans.is_empty()) {
            self.blocks.push(Block {
                spans: Vec::new(),
                indent: 0,
                preformatted: false,
            });
        }
    }

    fn code_line(&mut self, line: &str) {
        let mut spans = Vec::new();
        if let Some(prefix) = self.quote_prefix() {
            spans.push(prefix);
        }
        spans.push(Span::styled(format!("  {line}"), self.code_style()));
        self.blocks.push(Block {
            spans,
            indent: 0,
            preformatted: true,
        });
    }

    fn start(&mut self, tag: Tag<'_>) {
        match tag {
            Tag::Heading { .. } => {
                self.flush();
                self.push_style(Style::default().add_modifier(Modifier::BOLD | Modifier::UNDERLINED));
            }
            Tag::Emphasis => self.push_style(Style::default().add_modifier(Modifier::ITALIC)),
            Tag::Strong => self.push_style(Style::default().add_modifier(Modifier::BOLD)),
            Tag::Strikethrough => {
                self.push_style(Style::default().add_modifier(Modifier::CROSSED_OUT))
            }
            Tag::CodeBlock(kind) => {
                self.flush();
                self.in_code_block = true;
                if let CodeBlockKind::Fenced(lang) = kind {
                    if !lang.is_empty() {
                        let label = lang.to_string();
                        self.blocks.push(Block {
                            spans: vec![Span::styled(label, self.base.fg(Color::DarkGray))],
                            indent: 0,
                            preformatted: true,
                        });
                    }
                }
            }
            Tag::List(start) => {
                self.flush();
                self.lists.push(start);
            }
            Tag::Item => {
                self.flush();
                let depth = self.lists.len().saturating_sub(1);
                let marker = match self.lists.last_mut() {
                    Some(Some(n)) => {
                        let marker = format!("{n}. ");
                        *n += 1;
                        marker
                    }
                    _ => "• ".to_string(),
                };
                let padding = " ".repeat(depth * LIST_INDENT);
                let prefix = format!("{padding}{marker}");
                let width = prefix.width();
                self.push_text(&prefix, self.base);
                self.current_indent += width;
            }
            Tag::BlockQuote => {
                self.flush();
                self.quote_depth += 1;
                self.push_style(Style::default().add_modifier(Modifier::ITALIC));
            }
            Tag::Link { dest_url, .. } | Tag::Image { dest_url, .. } => {
                self.link_target = Some(dest_url.to_string());
                self.push_style(Style::default().fg(Color::Cyan).add_modifier(Modifier::UNDERLINED));
            }
            _ => {}
        }
    }

    fn end(&mut self, tag: TagEnd) {
        match tag {
            TagEnd::Paragraph => self.blank(),
            TagEnd::Heading(_) => {
                self.pop_style();
                self.blank();
            }
            TagEnd::Emphasis | TagEnd::Strong | TagEnd::Strikethrough => self.pop_style(),
            TagEnd::CodeBlock => {
                self.in_code_block = false;
                self.blank();
            }
            TagEnd::List(_) => {
                self.flush();
                self.lists.pop();
                if self.lists.is_empty() {
                    self.blank();
                }
            }
            TagEnd::Item => self.flush(),
            TagEnd::BlockQuote => {
                self.pop_style();
                self.flush();
                self.quote_depth = self.quote_depth.saturating_sub(1);
                self.blank();
            }
            TagEnd::Link | TagEnd::Image => {
                self.pop_style();
                if let Some(url) = self.link_target.take() {
                    let shown: String = self.current.iter().map(|s| s.content.as_ref()).collect();
                    if !shown.ends_with(url.as_str()) {
                        self.push_text(&format!(" ({url})"), self.base.fg(Color::DarkGray));
                    }
                }
            }
            _ => {}
        }
    }

    fn event(&mut self, event: Event<'_>) {
        match event {
            Event::Start(tag) => self.start(tag),
            Event::End(tag) => self.end(tag),
            Event::Text(text) if self.in_code_block => {
                for line in text.lines() {
                    self.code_line(line);
                }
            }
            Event::Text(text) => self.push_text(&text, self.style()),
            Event::Code(code) => self.push_text(&code, self.code_style()),
            Event::Html(html) | Event::InlineHtml(html) => self.push_text(&html, self.style()),
            Event::SoftBreak => self.push_text(" ", self.style()),
            Event::HardBreak => self.flush(),
            Event::Rule => {
                self.flush();
                self.push_text(&"─".repeat(RULE_WIDTH), self.base.fg(Color::DarkGray));
                self.blank();
            }
            Event::TaskListMarker(checked) => {
                self.push_text(if checked { "[x] " } else { "[ ] " }, self.base)
            }
            Event::FootnoteReference(label) => {
                self.push_text(&format!("[^{label}]"), self.style())
            }
        }
    }

    fn finish(mut self) -> Vec<Block> {
        self.flush();
        while self.blocks.last().is_some_and(|b| b.spans.is_empty()) {
            self.blocks.pop();
        }
        self.blocks
    }
}

/// Render markdown `source` into lines no wider than `width` (0 disables wrapping)
pub fn render_markdown(source: &str, base: Style, width: usize) -> Vec<Line<'static>> {
    let options = Options::ENABLE_STRIKETHROUGH | Options::ENABLE_TASKLISTS;
    let mut renderer = Renderer::new(base);
    for event in Parser::new_ext(source, options) {
        renderer.event(event);
    }

    let mut lines = Vec::new();
    for block in renderer.finish() {
        if block.preformatted || width == 0 {
            lines.push(Line::from(block.spans));
        } else {
            lines.extend(wrap_spans(block.spans, width, block.indent));
        }
    }
    if lines.is_empty() {
        lines.push(Line::default());
    }
    lines
}

fn push_token(line: &mut Vec<Span<'static>>, token: &str, style: Style) {
    if let Some(last) = line.last_mut() {
        if last.style == style {
            last.content.to_mut().push_str(token);
            return;
        }
    }
    line.push(Span::styled(token.to_string(), style));
}

/// Greedy word wrap across styled spans, measured in terminal columns
pub fn wrap_spans(spans: Vec<Span<'static>>, width: usize, indent: usize) -> Vec<Line<'static>> {
    let width = width.max(1);
    let indent = indent.min(width / 2);
    let mut lines = Vec::new();
    let mut line: Vec<Span<'static>> = Vec::new();
    let mut col = 0;

    for span in spans {
        for word in span.content.split_inclusive(' ') {
            for token in split_to_width(word, width - indent) {
                if col > indent && col + token.trim_end().width() > width {
                    lines.push(Line::from(std::mem::take(&mut line)));
                    col = 0;
                    if indent > 0 {
                        line.push(Span::raw(" ".repeat(indent)));
                        col = indent;
                    }
                    if token.trim().is_empty() {
                        continue;
                    }
                }

                // Trailing spaces never push a line past the edge
                let token = if col + token.width() > width {
                    token.trim_end()
                } else {
                    token
                };
                if !token.is_empty() {
                    push_token(&mut line, token, span.style);
                    col += token.width();
                }
            }
        }
    }

    if !line.is_empty() {
        lines.push(Line::from(line));
    }
    lines
}

/// Break a word wider than `max` columns into pieces that fit
fn split_to_width(word: &str, max: usize) -> Vec<&str> {
    if word.trim_end().width() <= max {
        return vec![word];
    }

    let mut pieces = Vec::new();
    let mut start = 0;
    let mut col = 0;
    for (i, c) in word.char_indices() {
        let w = c.width().unwrap_or(0);
        if col + w > max && i > start {
            pieces.push(&word[start..i]);
            start = i;
            col = 0;
        }
        col += w;
    }
    pieces.push(&word[start..]);
    pieces
}
