//! Base provider trait and common types for Moti
//!
//! This module defines the [`GenerationService`] trait the negotiation
//! engine talks to, the structured reply it expects ([`ProposedTask`]), and
//! the typed failure taxonomy ([`GenerationError`]).

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// The structured reply from the coach
///
/// `time_minutes` is serialized as `timeMinutes` to match the output schema
/// the model is asked to follow.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ProposedTask {
    /// Hidden analysis of the user's previous reply
    pub reflection: String,
    /// The single action the user should take
    pub task: String,
    /// Time limit in minutes; fractional values are allowed
    #[serde(rename = "timeMinutes")]
    pub time_minutes: f64,
    /// Why this task should work
    pub hope: String,
}

impl ProposedTask {
    /// Checks the constraints JSON deserialization cannot express
    ///
    /// # Errors
    ///
    /// Returns [`GenerationError::Schema`] when `timeMinutes` is not a
    /// positive finite number
    ///
    /// # Examples
    ///
    /// ```
    /// use moti::providers::ProposedTask;
    ///
    /// let task = ProposedTask {
    ///     reflection: "r".to_string(),
    ///     task: "open a blank doc".to_string(),
    ///     time_minutes: 0.0,
    ///     hope: "h".to_string(),
    /// };
    /// assert!(task.validate().is_err());
    /// ```
    pub fn validate(&self) -> Result<(), GenerationError> {
        if !self.time_minutes.is_finite() || self.time_minutes <= 0.0 {
            return Err(GenerationError::Schema(format!(
                "timeMinutes must be a positive number, got {}",
                self.time_minutes
            )));
        }
        Ok(())
    }

    /// JSON schema for the structured output contract
    ///
    /// All four fields are required and no other properties are allowed.
    pub fn json_schema() -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "reflection": { "type": "string" },
                "task": { "type": "string" },
                "timeMinutes": { "type": "number" },
                "hope": { "type": "string" }
            },
            "required": ["reflection", "task", "timeMinutes", "hope"],
            "additionalProperties": false
        })
    }
}

/// One outbound request to the generation service
#[derive(Debug, Clone)]
pub struct TaskRequest {
    /// API key for the generation service
    pub api_key: String,
    /// System instructions (the coach prompt)
    pub instructions: String,
    /// The rendered conversation, one `role: content` line per turn
    pub transcript: String,
}

/// Failure of a single generation call
///
/// The engine pattern-matches on these; only [`GenerationError::Unauthorized`]
/// has a side effect beyond the fallback message.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GenerationError {
    /// Network failure, timeout, or non-2xx status other than auth rejection
    #[error("Transport error: {0}")]
    Transport(String),

    /// The service rejected the API key
    #[error("Authorization error: {0}")]
    Unauthorized(String),

    /// A response arrived but did not match the structured output contract
    #[error("Schema violation: {0}")]
    Schema(String),
}

/// A text-generation service that answers with a [`ProposedTask`]
#[async_trait]
pub trait GenerationService: Send + Sync {
    /// Sends one request and returns the structured proposal
    ///
    /// # Errors
    ///
    /// Returns a [`GenerationError`] describing which kind of failure
    /// occurred. Implementations never retry.
    async fn propose_task(&self, request: &TaskRequest) -> Result<ProposedTask, GenerationError>;

    /// Name of the model requests are sent to
    fn model(&self) -> String;
}
