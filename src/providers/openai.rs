//! OpenAI-compatible provider implementation for Moti
//!
//! This module implements [`GenerationService`] against a chat completions
//! endpoint using `json_schema` structured output, so every successful reply
//! is a [`ProposedTask`].

use crate::config::ProviderConfig;
use crate::error::{MotiError, Result};
use crate::providers::{GenerationError, GenerationService, ProposedTask, TaskRequest};

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Name of the schema sent with every request
const SCHEMA_NAME: &str = "proposed_task";

/// Chat completions provider with structured output
///
/// # Examples
///
/// ```no_run
/// use moti::config::ProviderConfig;
/// use moti::providers::{GenerationService, OpenAiProvider, TaskRequest};
///
/// # async fn example() -> moti::error::Result<()> {
/// let provider = OpenAiProvider::new(ProviderConfig::default())?;
/// let request = TaskRequest {
///     api_key: "sk-...".to_string(),
///     instructions: "you are a coach".to_string(),
///     transcript: "user: start my essay".to_string(),
/// };
/// let proposal = provider.propose_task(&request).await;
/// # Ok(())
/// # }
/// ```
pub struct OpenAiProvider {
    client: Client,
    config: ProviderConfig,
}

/// Request body for `/chat/completions`
#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    response_format: ResponseFormat,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct ResponseFormat {
    r#type: &'static str,
    json_schema: JsonSchemaFormat,
}

#[derive(Debug, Serialize)]
struct JsonSchemaFormat {
    name: &'static str,
    strict: bool,
    schema: serde_json::Value,
}

/// Response body from `/chat/completions`
#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
    #[serde(default)]
    usage: Option<ChatUsage>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ChatResponseMessage {
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    refusal: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChatUsage {
    #[serde(default)]
    prompt_tokens: usize,
    #[serde(default)]
    completion_tokens: usize,
}

impl OpenAiProvider {
    /// Create a new provider instance
    ///
    /// # Errors
    ///
    /// Returns error if HTTP client initialization fails
    ///
    /// # Examples
    ///
    /// ```
    /// use moti::config::ProviderConfig;
    /// use moti::providers::OpenAiProvider;
    ///
    /// let provider = OpenAiProvider::new(ProviderConfig::default());
    /// assert!(provider.is_ok());
    /// ```
    pub fn new(config: ProviderConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .user_agent(concat!("moti/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| MotiError::Provider(format!("Failed to create HTTP client: {}", e)))?;

        tracing::info!(
            "Initialized generation provider: api_base={}, model={}",
            config.api_base,
            config.model
        );

        Ok(Self { client, config })
    }

    /// Full URL of the chat completions endpoint
    pub fn endpoint(&self) -> String {
        format!(
            "{}/chat/completions",
            self.config.api_base.trim_end_matches('/')
        )
    }

    fn build_request<'a>(&'a self, request: &'a TaskRequest) -> ChatRequest<'a> {
        ChatRequest {
            model: &self.config.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: &request.instructions,
                },
                ChatMessage {
                    role: "user",
                    content: &request.transcript,
                },
            ],
            response_format: ResponseFormat {
                r#type: "json_schema",
                json_schema: JsonSchemaFormat {
                    name: SCHEMA_NAME,
                    strict: true,
                    schema: ProposedTask::json_schema(),
                },
            },
        }
    }
}

/// Maps a non-success status to the failure taxonomy
fn classify_status(status: StatusCode, body: &str) -> GenerationError {
    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
            GenerationError::Unauthorized(format!("{}: {}", status, body))
        }
        _ => GenerationError::Transport(format!("{}: {}", status, body)),
    }
}

/// Extracts and validates the proposal from a decoded response
fn parse_proposal(response: ChatResponse) -> std::result::Result<ProposedTask, GenerationError> {
    let message = response
        .choices
        .into_iter()
        .next()
        .map(|choice| choice.message)
        .ok_or_else(|| GenerationError::Schema("response contained no choices".to_string()))?;

    if let Some(refusal) = message.refusal {
        return Err(GenerationError::Schema(format!("model refused: {}", refusal)));
    }

    let content = message
        .content
        .filter(|c| !c.trim().is_empty())
        .ok_or_else(|| GenerationError::Schema("response message had no content".to_string()))?;

    let task: ProposedTask = serde_json::from_str(&content)
        .map_err(|e| GenerationError::Schema(format!("content is not a proposed task: {}", e)))?;
    task.validate()?;
    Ok(task)
}

#[async_trait]
impl GenerationService for OpenAiProvider {
    async fn propose_task(
        &self,
        request: &TaskRequest,
    ) -> std::result::Result<ProposedTask, GenerationError> {
        let body = self.build_request(request);

        tracing::debug!(
            "Sending generation request: model={}, transcript_bytes={}",
            body.model,
            request.transcript.len()
        );

        let response = self
            .client
            .post(self.endpoint())
            .bearer_auth(&request.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                tracing::error!("Generation request failed: {}", e);
                GenerationError::Transport(e.to_string())
            })?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            tracing::error!("Generation service returned error {}: {}", status, error_text);
            return Err(classify_status(status, &error_text));
        }

        let decoded: ChatResponse = response.json().await.map_err(|e| {
            tracing::error!("Failed to parse generation response: {}", e);
            GenerationError::Schema(format!("Failed to parse response: {}", e))
        })?;

        if let Some(usage) = &decoded.usage {
            tracing::debug!(
                "Generation usage: prompt_tokens={}, completion_tokens={}",
                usage.prompt_tokens,
                usage.completion_tokens
            );
        }

        parse_proposal(decoded)
    }

    fn model(&self) -> String {
        self.config.model.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn provider() -> OpenAiProvider {
        OpenAiProvider::new(ProviderConfig {
            api_base: "http://localhost:9999/v1/".to_string(),
            model: "gpt-test".to_string(),
            timeout_seconds: 5,
        })
        .unwrap()
    }

    fn response_with_content(content: Option<&str>, refusal: Option<&str>) -> ChatResponse {
        ChatResponse {
            choices: vec![ChatChoice {
                message: ChatResponseMessage {
                    content: content.map(str::to_string),
                    refusal: refusal.map(str::to_string),
                },
            }],
            usage: None,
        }
    }

    #[test]
    fn test_endpoint_trims_trailing_slash() {
        assert_eq!(
            provider().endpoint(),
            "http://localhost:9999/v1/chat/completions"
        );
    }

    #[test]
    fn test_build_request_shape() {
        let provider = provider();
        let request = TaskRequest {
            api_key: "sk-test".to_string(),
            instructions: "be a coach".to_string(),
            transcript: "user: start my essay".to_string(),
        };
        let json = serde_json::to_value(provider.build_request(&request)).unwrap();

        assert_eq!(json["model"], "gpt-test");
        assert_eq!(json["messages"][0]["role"], "system");
        assert_eq!(json["messages"][0]["content"], "be a coach");
        assert_eq!(json["messages"][1]["role"], "user");
        assert_eq!(json["messages"][1]["content"], "user: start my essay");
        assert_eq!(json["response_format"]["type"], "json_schema");
        assert_eq!(json["response_format"]["json_schema"]["name"], "proposed_task");
        assert_eq!(json["response_format"]["json_schema"]["strict"], true);
        assert_eq!(
            json["response_format"]["json_schema"]["schema"],
            ProposedTask::json_schema()
        );
    }

    #[test]
    fn test_classify_status() {
        assert!(matches!(
            classify_status(StatusCode::UNAUTHORIZED, "bad key"),
            GenerationError::Unauthorized(_)
        ));
        assert!(matches!(
            classify_status(StatusCode::FORBIDDEN, ""),
            GenerationError::Unauthorized(_)
        ));
        assert!(matches!(
            classify_status(StatusCode::INTERNAL_SERVER_ERROR, "boom"),
            GenerationError::Transport(_)
        ));
        assert!(matches!(
            classify_status(StatusCode::TOO_MANY_REQUESTS, ""),
            GenerationError::Transport(_)
        ));
    }

    #[test]
    fn test_parse_proposal_success() {
        let content = r#"{"reflection":"r","task":"open a blank doc","timeMinutes":5,"hope":"h"}"#;
        let task = parse_proposal(response_with_content(Some(content), None)).unwrap();
        assert_eq!(task.task, "open a blank doc");
        assert_eq!(task.time_minutes, 5.0);
    }

    #[test]
    fn test_parse_proposal_no_choices() {
        let response = ChatResponse {
            choices: Vec::new(),
            usage: None,
        };
        assert!(matches!(
            parse_proposal(response),
            Err(GenerationError::Schema(_))
        ));
    }

    #[test]
    fn test_parse_proposal_refusal() {
        let response = response_with_content(None, Some("cannot help"));
        assert!(matches!(
            parse_proposal(response),
            Err(GenerationError::Schema(_))
        ));
    }

    #[test]
    fn test_parse_proposal_free_text() {
        let response = response_with_content(Some("sure, try writing a sentence"), None);
        assert!(matches!(
            parse_proposal(response),
            Err(GenerationError::Schema(_))
        ));
    }

    #[test]
    fn test_parse_proposal_zero_minutes() {
        let content = r#"{"reflection":"r","task":"t","timeMinutes":0,"hope":"h"}"#;
        assert!(matches!(
            parse_proposal(response_with_content(Some(content), None)),
            Err(GenerationError::Schema(_))
        ));
    }

    #[test]
    fn test_model_name() {
        assert_eq!(provider().model(), "gpt-test");
    }
}
