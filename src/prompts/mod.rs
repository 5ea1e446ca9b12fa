//! System prompts for the coach
//!
//! This module owns the prompt template the negotiation engine sends as
//! system instructions with every request.

pub mod coach_prompt;

use crate::config::CoachConfig;

/// The rendered system prompt plus the policy it was rendered from
///
/// Built once per session. The policy is kept so callers can compare model
/// proposals against it without re-reading configuration.
#[derive(Debug, Clone)]
pub struct PromptTemplate {
    policy: CoachConfig,
    text: String,
}

impl PromptTemplate {
    /// Renders the template for the given policy
    ///
    /// # Examples
    ///
    /// ```
    /// use moti::config::CoachConfig;
    /// use moti::prompts::PromptTemplate;
    ///
    /// let template = PromptTemplate::new(CoachConfig::default());
    /// assert!(template.text().contains("accountability coach"));
    /// assert_eq!(template.policy().max_task_minutes, 25.0);
    /// ```
    pub fn new(policy: CoachConfig) -> Self {
        let text = coach_prompt::generate_coach_prompt(&policy);
        Self { policy, text }
    }

    /// The full system prompt text
    pub fn text(&self) -> &str {
        &self.text
    }

    /// The policy constants rendered into the prompt
    pub fn policy(&self) -> &CoachConfig {
        &self.policy
    }

    /// Whether a proposed duration falls inside the policy range
    ///
    /// Used for logging only; proposals outside the range are still accepted.
    pub fn within_policy(&self, minutes: f64) -> bool {
        let seconds = minutes * 60.0;
        seconds >= self.policy.min_task_seconds && minutes <= self.policy.max_task_minutes
    }
}

impl Default for PromptTemplate {
    fn default() -> Self {
        Self::new(CoachConfig::default())
    }
}
