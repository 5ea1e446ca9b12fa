//! Terminal rendering of coach messages
//!
//! Coach replies and reflections use a tiny markdown subset: `**bold**`,
//! `*italic*` and `-`/`*` bullets. Lines are parsed into [`Span`]s first and
//! styled with `colored` afterwards, so the parsing can be tested without a
//! terminal.

use chrono::Local;
use colored::Colorize;
use regex::Regex;

use crate::coach::{Role, Turn};
use crate::error::Result;

/// Bullet glyph used in place of `-` / `*`
pub const BULLET: &str = "•";

/// Inline style of a span
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpanStyle {
    Plain,
    Bold,
    Italic,
}

/// A run of text with one style
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Span {
    pub text: String,
    pub style: SpanStyle,
}

impl Span {
    fn new(text: impl Into<String>, style: SpanStyle) -> Self {
        Self {
            text: text.into(),
            style,
        }
    }
}

/// One parsed line
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Line {
    /// Leading whitespace width of a bullet item; `None` for plain lines
    pub bullet_indent: Option<usize>,
    pub spans: Vec<Span>,
}

/// Markdown-subset renderer
pub struct MarkdownRenderer {
    bullet: Regex,
    inline: Regex,
}

impl MarkdownRenderer {
    pub fn new() -> Result<Self> {
        Ok(Self {
            bullet: Regex::new(r"^(\s*)[-*]\s+(.*)$")?,
            inline: Regex::new(r"\*\*(?P<bold>.+?)\*\*|\*(?P<italic>[^*\s][^*]*?)\*")?,
        })
    }

    /// Splits one line into bullet marker and styled spans
    pub fn parse_line(&self, line: &str) -> Line {
        let (bullet_indent, body) = match self.bullet.captures(line) {
            Some(caps) => {
                let indent = caps.get(1).map_or(0, |m| m.as_str().len());
                let body = caps.get(2).map_or("", |m| m.as_str());
                (Some(indent), body)
            }
            None => (None, line),
        };

        Line {
            bullet_indent,
            spans: self.parse_inline(body),
        }
    }

    fn parse_inline(&self, text: &str) -> Vec<Span> {
        let mut spans = Vec::new();
        let mut cursor = 0;

        for caps in self.inline.captures_iter(text) {
            let Some(whole) = caps.get(0) else { continue };
            if whole.start() > cursor {
                spans.push(Span::new(&text[cursor..whole.start()], SpanStyle::Plain));
            }
            if let Some(bold) = caps.name("bold") {
                spans.push(Span::new(bold.as_str(), SpanStyle::Bold));
            } else if let Some(italic) = caps.name("italic") {
                spans.push(Span::new(italic.as_str(), SpanStyle::Italic));
            }
            cursor = whole.end();
        }

        if cursor < text.len() {
            spans.push(Span::new(&text[cursor..], SpanStyle::Plain));
        }
        spans
    }

    /// Renders a block of markdown for the terminal
    pub fn render(&self, text: &str) -> String {
        text.lines()
            .map(|line| style_line(&self.parse_line(line)))
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Renders a conversation turn, including its reflection when visible
    pub fn render_turn(&self, turn: &Turn) -> String {
        let speaker = match turn.role() {
            Role::User => "you".cyan().bold(),
            Role::Assistant => "moti".magenta().bold(),
        };
        let mut out = format!("{}: {}", speaker, self.render(turn.content()));

        if turn.reflection_visible() {
            if let Some(reflection) = turn.reflection() {
                out.push_str("\n\n");
                out.push_str(&self.render(reflection).dimmed().to_string());
            }
        }
        out
    }

    /// Renders a turn for `/history`, prefixed with its local `HH:MM` time
    pub fn render_history_turn(&self, turn: &Turn) -> String {
        let stamp = turn.created_at().with_timezone(&Local).format("%H:%M");
        format!("{} {}", format!("[{}]", stamp).dimmed(), self.render_turn(turn))
    }
}

fn style_line(line: &Line) -> String {
    let mut out = String::new();
    if let Some(indent) = line.bullet_indent {
        out.push_str(&" ".repeat(indent + 2));
        out.push_str(BULLET);
        out.push(' ');
    }
    for span in &line.spans {
        let styled = match span.style {
            SpanStyle::Plain => span.text.normal(),
            SpanStyle::Bold => span.text.bold(),
            SpanStyle::Italic => span.text.italic(),
        };
        out.push_str(&styled.to_string());
    }
    out
}
