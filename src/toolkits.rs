//! Tool-router side panel
//!
//! Provisions a hosted tool-router session scoped to a user and a set of
//! toolkits, and hands back the URL an MCP client can connect to. The router
//! key lives in the same credential store as the generation key.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::config::ToolRouterConfig;
use crate::credentials::{CredentialKind, Credentials};
use crate::error::{MotiError, Result};

/// Toolkits offered when provisioning a session
const AVAILABLE_TOOLKITS: &[&str] = &[
    "gmail",
    "github",
    "slack",
    "notion",
    "jira",
    "linear",
    "figma",
    "googlecalendar",
    "googledrive",
    "googlesheets",
];

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// A provisioned tool-router session
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ToolRouterSession {
    pub url: String,
    pub user_id: String,
    pub toolkits: Vec<String>,
}

#[derive(Debug, Serialize)]
struct SessionRequest<'a> {
    user_id: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    toolkits: Option<&'a [String]>,
}

#[derive(Debug, Deserialize)]
struct SessionResponse {
    url: Option<String>,
    chat_session_mcp_url: Option<String>,
}

impl SessionResponse {
    fn into_url(self) -> Option<String> {
        self.url
            .or(self.chat_session_mcp_url)
            .filter(|url| !url.trim().is_empty())
    }
}

/// Toolkits that can be attached to a session
pub fn available_toolkits() -> Vec<String> {
    AVAILABLE_TOOLKITS.iter().map(|s| s.to_string()).collect()
}

/// HTTP client for the tool-router service
pub struct ToolRouterClient {
    client: reqwest::Client,
    config: ToolRouterConfig,
}

impl ToolRouterClient {
    pub fn new(config: ToolRouterConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .user_agent(format!("moti/{}", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| MotiError::ToolRouter(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self { client, config })
    }

    /// Whether a router key is configured
    pub fn is_ready(&self, credentials: &Credentials) -> bool {
        credentials.has(CredentialKind::ToolRouter)
    }

    fn endpoint(&self) -> String {
        format!(
            "{}{}",
            self.config.api_base.trim_end_matches('/'),
            self.config.session_path
        )
    }

    /// Creates a session for `user_id`
    ///
    /// An empty `toolkits` list leaves the choice to the service.
    pub async fn create_session(
        &self,
        credentials: &Credentials,
        user_id: &str,
        toolkits: &[String],
    ) -> Result<ToolRouterSession> {
        let api_key = credentials
            .get(CredentialKind::ToolRouter)
            .ok_or_else(|| MotiError::MissingCredentials(CredentialKind::ToolRouter.to_string()))?;

        let body = SessionRequest {
            user_id,
            toolkits: (!toolkits.is_empty()).then_some(toolkits),
        };

        tracing::info!(
            "Creating tool-router session for {} ({} toolkits)",
            user_id,
            toolkits.len()
        );

        let response = self
            .client
            .post(self.endpoint())
            .header("x-api-key", api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| MotiError::ToolRouter(format!("Request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            tracing::error!("Tool-router returned {}: {}", status, text);
            return Err(MotiError::ToolRouter(format!("Service returned {}: {}", status, text)).into());
        }

        let parsed: SessionResponse = response
            .json()
            .await
            .map_err(|e| MotiError::ToolRouter(format!("Invalid session response: {}", e)))?;

        let url = parsed
            .into_url()
            .ok_or_else(|| MotiError::ToolRouter("Session response has no URL".to_string()))?;

        tracing::debug!("Tool-router session URL: {}", url);

        Ok(ToolRouterSession {
            url,
            user_id: user_id.to_string(),
            toolkits: toolkits.to_vec(),
        })
    }
}
