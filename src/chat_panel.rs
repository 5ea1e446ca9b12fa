//! Chat panel state for the interactive shell
//!
//! The coach lives behind a single emoji. The chat panel can be shown or
//! hidden; while hidden the prompt collapses to the emoji, coach replies are
//! still recorded but not printed, and only commands are accepted.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use colored::Colorize;

use crate::coach::TimerTick;

/// Emoji the shell collapses to
pub const COACH_EMOJI: &str = "🌱";

/// Whether the chat panel is open
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PanelVisibility {
    Shown,
    Hidden,
}

impl fmt::Display for PanelVisibility {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Shown => write!(f, "SHOWN"),
            Self::Hidden => write!(f, "HIDDEN"),
        }
    }
}

impl PanelVisibility {
    fn from_flag(visible: bool) -> Self {
        if visible {
            Self::Shown
        } else {
            Self::Hidden
        }
    }
}

/// Shared handle to the panel visibility flag
///
/// Cloned into background tasks so a reply that lands after `/hide` is
/// recorded without being printed.
#[derive(Debug, Clone)]
pub struct ChatPanel {
    visible: Arc<AtomicBool>,
}

impl ChatPanel {
    /// Creates a panel in the given state
    ///
    /// # Examples
    ///
    /// ```
    /// use moti::chat_panel::{ChatPanel, PanelVisibility};
    ///
    /// let panel = ChatPanel::new(PanelVisibility::Hidden);
    /// assert!(!panel.is_visible());
    /// ```
    pub fn new(visibility: PanelVisibility) -> Self {
        Self {
            visible: Arc::new(AtomicBool::new(visibility == PanelVisibility::Shown)),
        }
    }

    pub fn visibility(&self) -> PanelVisibility {
        PanelVisibility::from_flag(self.visible.load(Ordering::Acquire))
    }

    pub fn is_visible(&self) -> bool {
        self.visibility() == PanelVisibility::Shown
    }

    /// Sets visibility and returns the previous value
    pub fn set(&self, visibility: PanelVisibility) -> PanelVisibility {
        let previous = self
            .visible
            .swap(visibility == PanelVisibility::Shown, Ordering::AcqRel);
        tracing::debug!("Chat panel {}", visibility);
        PanelVisibility::from_flag(previous)
    }

    /// Prompt text without colors
    ///
    /// # Examples
    ///
    /// ```
    /// use std::time::Duration;
    /// use moti::chat_panel::{ChatPanel, PanelVisibility};
    /// use moti::coach::TimerTick;
    ///
    /// let panel = ChatPanel::new(PanelVisibility::Shown);
    /// let tick = TimerTick::Running(Duration::from_secs(90));
    /// assert_eq!(panel.format_prompt(tick), "🌱 [1:30] >> ");
    /// ```
    pub fn format_prompt(&self, tick: TimerTick) -> String {
        if !self.is_visible() {
            return format!("{} ", COACH_EMOJI);
        }
        match tick.display() {
            Some(countdown) => format!("{} [{}] >> ", COACH_EMOJI, countdown),
            None => format!("{} >> ", COACH_EMOJI),
        }
    }

    /// Prompt text with the countdown colored by urgency
    pub fn format_colored_prompt(&self, tick: TimerTick) -> String {
        if !self.is_visible() {
            return format!("{} ", COACH_EMOJI);
        }
        let countdown = match tick {
            TimerTick::Idle => return format!("{} >> ", COACH_EMOJI),
            TimerTick::Running(_) => tick.display().unwrap_or_default().green(),
            TimerTick::Expired => tick.display().unwrap_or_default().yellow(),
        };
        format!("{} [{}] >> ", COACH_EMOJI, countdown)
    }
}

impl Default for ChatPanel {
    fn default() -> Self {
        Self::new(PanelVisibility::Shown)
    }
}
