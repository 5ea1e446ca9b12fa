//! Conversation log for one coaching session
//!
//! Turns are kept in insertion order, which is both display order and the
//! order the transcript is fed back to the model. The log is never
//! reordered, deduplicated, or pruned.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt;

/// Author of a turn
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// The person being coached
    User,
    /// The coach
    Assistant,
}

impl Role {
    /// Label used when rendering the transcript
    pub fn label(&self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Assistant => "assistant",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// One message in the conversation
///
/// Everything except `reflection_visible` is fixed at creation; fields are
/// private so the only mutation path is [`ConversationLog::toggle_reflection`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Turn {
    role: Role,
    content: String,
    reflection: Option<String>,
    reflection_visible: bool,
    created_at: DateTime<Utc>,
}

impl Turn {
    /// Creates a user turn
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
            reflection: None,
            reflection_visible: false,
            created_at: Utc::now(),
        }
    }

    /// Creates an assistant turn without reflection
    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
            reflection: None,
            reflection_visible: false,
            created_at: Utc::now(),
        }
    }

    /// Creates an assistant turn carrying hidden reflection text
    pub fn assistant_with_reflection(
        content: impl Into<String>,
        reflection: impl Into<String>,
    ) -> Self {
        Self {
            reflection: Some(reflection.into()),
            ..Self::assistant(content)
        }
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    pub fn reflection(&self) -> Option<&str> {
        self.reflection.as_deref()
    }

    pub fn reflection_visible(&self) -> bool {
        self.reflection_visible
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Transcript line for this turn
    pub fn render(&self) -> String {
        format!("{}: {}", self.role.label(), self.content)
    }
}

/// Ordered sequence of turns
///
/// # Examples
///
/// ```
/// use moti::coach::{ConversationLog, Turn};
///
/// let mut log = ConversationLog::new();
/// log.push(Turn::user("start my essay"));
/// log.push(Turn::assistant("open a blank doc"));
/// assert_eq!(log.transcript(), "user: start my essay\nassistant: open a blank doc");
/// ```
#[derive(Debug, Clone, Default, Serialize)]
pub struct ConversationLog {
    turns: Vec<Turn>,
}

impl ConversationLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a turn and returns its index
    pub fn push(&mut self, turn: Turn) -> usize {
        self.turns.push(turn);
        self.turns.len() - 1
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    pub fn turns(&self) -> &[Turn] {
        &self.turns
    }

    pub fn get(&self, index: usize) -> Option<&Turn> {
        self.turns.get(index)
    }

    /// Renders every turn as `role: content`, newline-joined, in order
    pub fn transcript(&self) -> String {
        self.turns
            .iter()
            .map(Turn::render)
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Index of the most recent assistant turn that carries a reflection
    pub fn last_reflection_index(&self) -> Option<usize> {
        self.turns
            .iter()
            .rposition(|turn| turn.role == Role::Assistant && turn.reflection.is_some())
    }

    /// Flips reflection visibility of one turn
    ///
    /// Returns the new visibility, or `None` when the turn does not exist or
    /// has no reflection.
    pub fn toggle_reflection(&mut self, index: usize) -> Option<bool> {
        let turn = self.turns.get_mut(index)?;
        turn.reflection.as_ref()?;
        turn.reflection_visible = !turn.reflection_visible;
        Some(turn.reflection_visible)
    }
}
