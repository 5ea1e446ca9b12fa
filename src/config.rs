//! Configuration management for Moti
//!
//! This module handles loading, parsing, validating, and managing
//! configuration from files, environment variables, and CLI overrides.

use crate::error::{MotiError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Main configuration structure for Moti
///
/// Holds the generation-service settings, the coaching policy, the
/// tool-router settings and the credential backend selection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Generation service configuration
    #[serde(default)]
    pub provider: ProviderConfig,
    /// Coaching policy constants rendered into the system prompt
    #[serde(default)]
    pub coach: CoachConfig,
    /// Tool-router (side panel) configuration
    #[serde(default)]
    pub tools: ToolRouterConfig,
    /// Credential storage configuration
    #[serde(default)]
    pub credentials: CredentialsConfig,
}

/// Generation service configuration
///
/// Points at any OpenAI-compatible chat completions endpoint that supports
/// `json_schema` structured output.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    /// Base URL of the API, without the `/chat/completions` suffix
    #[serde(default = "default_api_base")]
    pub api_base: String,

    /// Model to request
    #[serde(default = "default_model")]
    pub model: String,

    /// Request timeout in seconds
    #[serde(default = "default_timeout")]
    pub timeout_seconds: u64,
}

fn default_api_base() -> String {
    "https://api.openai.com/v1".to_string()
}

fn default_model() -> String {
    "gpt-4o-mini".to_string()
}

fn default_timeout() -> u64 {
    60
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            api_base: default_api_base(),
            model: default_model(),
            timeout_seconds: default_timeout(),
        }
    }
}

/// Coaching policy constants
///
/// These values are instructions to the model only. The negotiation engine
/// accepts whatever duration the model proposes.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct CoachConfig {
    /// Longest task the coach should propose, in minutes
    #[serde(default = "default_max_task_minutes")]
    pub max_task_minutes: f64,

    /// Shortest task the coach should propose, in seconds
    #[serde(default = "default_min_task_seconds")]
    pub min_task_seconds: f64,

    /// How much to shrink task scope after a `[no]`
    #[serde(default = "default_reduction_factor")]
    pub scope_reduction_factor: f64,

    /// How much to shrink task time after a `[no]`
    #[serde(default = "default_reduction_factor")]
    pub time_reduction_factor: f64,
}

fn default_max_task_minutes() -> f64 {
    25.0
}

fn default_min_task_seconds() -> f64 {
    10.0
}

fn default_reduction_factor() -> f64 {
    0.5
}

impl Default for CoachConfig {
    fn default() -> Self {
        Self {
            max_task_minutes: default_max_task_minutes(),
            min_task_seconds: default_min_task_seconds(),
            scope_reduction_factor: default_reduction_factor(),
            time_reduction_factor: default_reduction_factor(),
        }
    }
}

/// Tool-router configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolRouterConfig {
    /// Base URL of the tool-router service
    #[serde(default = "default_tools_api_base")]
    pub api_base: String,

    /// Path of the session creation endpoint
    #[serde(default = "default_session_path")]
    pub session_path: String,

    /// User identifier sent when provisioning a session
    #[serde(default = "default_user_id")]
    pub user_id: String,
}

fn default_tools_api_base() -> String {
    "https://backend.composio.dev".to_string()
}

fn default_session_path() -> String {
    "/api/v3/labs/tool_router/session".to_string()
}

fn default_user_id() -> String {
    "default".to_string()
}

impl Default for ToolRouterConfig {
    fn default() -> Self {
        Self {
            api_base: default_tools_api_base(),
            session_path: default_session_path(),
            user_id: default_user_id(),
        }
    }
}

/// Where API keys are kept between runs
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum CredentialBackend {
    /// The operating system keyring
    Keyring,
    /// Process memory only; keys are lost on exit
    Memory,
}

/// Credential storage configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CredentialsConfig {
    /// Storage backend
    #[serde(default = "default_backend")]
    pub backend: CredentialBackend,

    /// Keyring service name under which keys are stored
    #[serde(default = "default_keyring_service")]
    pub keyring_service: String,
}

fn default_backend() -> CredentialBackend {
    CredentialBackend::Keyring
}

fn default_keyring_service() -> String {
    "moti".to_string()
}

impl Default for CredentialsConfig {
    fn default() -> Self {
        Self {
            backend: default_backend(),
            keyring_service: default_keyring_service(),
        }
    }
}

impl Config {
    /// Load configuration from file with environment and CLI overrides
    ///
    /// A missing file is not an error; defaults are used and a warning is
    /// logged.
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the YAML configuration file
    /// * `cli` - Parsed command line, applied last
    ///
    /// # Errors
    ///
    /// Returns error if the file exists but cannot be read or parsed
    pub fn load(path: &str, cli: &crate::cli::Cli) -> Result<Self> {
        let mut config = if Path::new(path).exists() {
            Self::from_file(path)?
        } else {
            tracing::warn!("Config file not found at {}, using defaults", path);
            Self::default()
        };

        config.apply_env_vars();
        config.apply_cli_overrides(cli);

        Ok(config)
    }

    fn from_file(path: &str) -> Result<Self> {
        let contents = std::fs::read_to_string(path).map_err(MotiError::Io)?;
        let config = serde_yaml::from_str(&contents).map_err(MotiError::Yaml)?;
        tracing::debug!("Loaded configuration from {}", path);
        Ok(config)
    }

    fn apply_env_vars(&mut self) {
        if let Ok(api_base) = std::env::var("MOTI_API_BASE") {
            self.provider.api_base = api_base;
        }

        if let Ok(model) = std::env::var("MOTI_MODEL") {
            self.provider.model = model;
        }

        if let Ok(timeout) = std::env::var("MOTI_TIMEOUT_SECONDS") {
            if let Ok(value) = timeout.parse() {
                self.provider.timeout_seconds = value;
            } else {
                tracing::warn!("Invalid MOTI_TIMEOUT_SECONDS: {}", timeout);
            }
        }

        if let Ok(max_minutes) = std::env::var("MOTI_MAX_TASK_MINUTES") {
            if let Ok(value) = max_minutes.parse() {
                self.coach.max_task_minutes = value;
            } else {
                tracing::warn!("Invalid MOTI_MAX_TASK_MINUTES: {}", max_minutes);
            }
        }

        if let Ok(min_seconds) = std::env::var("MOTI_MIN_TASK_SECONDS") {
            if let Ok(value) = min_seconds.parse() {
                self.coach.min_task_seconds = value;
            } else {
                tracing::warn!("Invalid MOTI_MIN_TASK_SECONDS: {}", min_seconds);
            }
        }

        if let Ok(tools_base) = std::env::var("MOTI_TOOLS_API_BASE") {
            self.tools.api_base = tools_base;
        }

        if let Ok(user_id) = std::env::var("MOTI_TOOLS_USER_ID") {
            self.tools.user_id = user_id;
        }

        if let Ok(backend) = std::env::var("MOTI_CREDENTIAL_BACKEND") {
            self.credentials.backend = match backend.to_lowercase().as_str() {
                "keyring" => CredentialBackend::Keyring,
                "memory" => CredentialBackend::Memory,
                _ => {
                    tracing::warn!("Invalid MOTI_CREDENTIAL_BACKEND: {}", backend);
                    self.credentials.backend
                }
            };
        }
    }

    fn apply_cli_overrides(&mut self, cli: &crate::cli::Cli) {
        if let Some(model) = &cli.model {
            tracing::debug!("Using model override from CLI: {}", model);
            self.provider.model = model.clone();
        }
        if cli.ephemeral {
            self.credentials.backend = CredentialBackend::Memory;
        }
    }

    /// Validate the configuration
    ///
    /// # Errors
    ///
    /// Returns error if any URL is malformed or a policy constant is out of
    /// range
    pub fn validate(&self) -> Result<()> {
        url::Url::parse(&self.provider.api_base).map_err(|e| {
            MotiError::Config(format!(
                "provider.api_base is not a valid URL ({}): {}",
                self.provider.api_base, e
            ))
        })?;

        if self.provider.model.trim().is_empty() {
            return Err(MotiError::Config("provider.model cannot be empty".to_string()).into());
        }

        if self.provider.timeout_seconds == 0 {
            return Err(MotiError::Config(
                "provider.timeout_seconds must be greater than 0".to_string(),
            )
            .into());
        }

        if !(self.coach.max_task_minutes > 0.0) {
            return Err(MotiError::Config(
                "coach.max_task_minutes must be greater than 0".to_string(),
            )
            .into());
        }

        if !(self.coach.min_task_seconds > 0.0) {
            return Err(MotiError::Config(
                "coach.min_task_seconds must be greater than 0".to_string(),
            )
            .into());
        }

        if self.coach.min_task_seconds > self.coach.max_task_minutes * 60.0 {
            return Err(MotiError::Config(
                "coach.min_task_seconds cannot exceed coach.max_task_minutes".to_string(),
            )
            .into());
        }

        for (name, factor) in [
            ("scope_reduction_factor", self.coach.scope_reduction_factor),
            ("time_reduction_factor", self.coach.time_reduction_factor),
        ] {
            if factor <= 0.0 || factor >= 1.0 {
                return Err(MotiError::Config(format!(
                    "coach.{} must be between 0.0 and 1.0 (exclusive)",
                    name
                ))
                .into());
            }
        }

        url::Url::parse(&self.tools.api_base).map_err(|e| {
            MotiError::Config(format!(
                "tools.api_base is not a valid URL ({}): {}",
                self.tools.api_base, e
            ))
        })?;

        if !self.tools.session_path.starts_with('/') {
            return Err(
                MotiError::Config("tools.session_path must start with '/'".to_string()).into(),
            );
        }

        if self.credentials.keyring_service.trim().is_empty() {
            return Err(MotiError::Config(
                "credentials.keyring_service cannot be empty".to_string(),
            )
            .into());
        }

        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            provider: ProviderConfig::default(),
            coach: CoachConfig::default(),
            tools: ToolRouterConfig::default(),
            credentials: CredentialsConfig::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::Cli;
    use serial_test::serial;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.provider.api_base, "https://api.openai.com/v1");
        assert_eq!(config.coach.max_task_minutes, 25.0);
        assert_eq!(config.coach.min_task_seconds, 10.0);
        assert_eq!(config.coach.scope_reduction_factor, 0.5);
        assert_eq!(config.coach.time_reduction_factor, 0.5);
        assert_eq!(config.credentials.backend, CredentialBackend::Keyring);
    }

    #[test]
    fn test_config_validation_success() {
        assert!(Config::default().validate().is_ok());
    }

    #[test]
    fn test_config_validation_bad_api_base() {
        let mut config = Config::default();
        config.provider.api_base = "not a url".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_validation_zero_timeout() {
        let mut config = Config::default();
        config.provider.timeout_seconds = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_validation_reduction_factor_out_of_range() {
        let mut config = Config::default();
        config.coach.time_reduction_factor = 1.0;
        assert!(config.validate().is_err());

        config.coach.time_reduction_factor = 0.0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_validation_min_exceeds_max() {
        let mut config = Config::default();
        config.coach.max_task_minutes = 0.1;
        config.coach.min_task_seconds = 30.0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_validation_nan_minutes() {
        let mut config = Config::default();
        config.coach.max_task_minutes = f64::NAN;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_validation_session_path() {
        let mut config = Config::default();
        config.tools.session_path = "session".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_partial_yaml_uses_defaults() {
        let yaml = "coach:\n  max_task_minutes: 15\n";
        let config: Config = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.coach.max_task_minutes, 15.0);
        assert_eq!(config.coach.min_task_seconds, 10.0);
        assert_eq!(config.provider.model, "gpt-4o-mini");
    }

    #[test]
    fn test_backend_parses_snake_case() {
        let yaml = "credentials:\n  backend: memory\n";
        let config: Config = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.credentials.backend, CredentialBackend::Memory);
    }

    #[test]
    #[serial]
    fn test_env_overrides() {
        std::env::set_var("MOTI_MODEL", "gpt-test");
        std::env::set_var("MOTI_MAX_TASK_MINUTES", "12.5");
        std::env::set_var("MOTI_CREDENTIAL_BACKEND", "memory");

        let mut config = Config::default();
        config.apply_env_vars();

        std::env::remove_var("MOTI_MODEL");
        std::env::remove_var("MOTI_MAX_TASK_MINUTES");
        std::env::remove_var("MOTI_CREDENTIAL_BACKEND");

        assert_eq!(config.provider.model, "gpt-test");
        assert_eq!(config.coach.max_task_minutes, 12.5);
        assert_eq!(config.credentials.backend, CredentialBackend::Memory);
    }

    #[test]
    #[serial]
    fn test_invalid_env_value_is_ignored() {
        std::env::set_var("MOTI_TIMEOUT_SECONDS", "soon");
        let mut config = Config::default();
        config.apply_env_vars();
        std::env::remove_var("MOTI_TIMEOUT_SECONDS");

        assert_eq!(config.provider.timeout_seconds, 60);
    }

    #[test]
    #[serial]
    fn test_load_missing_file_uses_defaults() {
        let cli = Cli::default();
        let config = Config::load("/nonexistent/moti.yaml", &cli).unwrap();
        assert_eq!(config.provider.model, "gpt-4o-mini");
    }

    #[test]
    fn test_cli_overrides_model_and_backend() {
        let mut cli = Cli::default();
        cli.model = Some("gpt-override".to_string());
        cli.ephemeral = true;

        let mut config = Config::default();
        config.apply_cli_overrides(&cli);

        assert_eq!(config.provider.model, "gpt-override");
        assert_eq!(config.credentials.backend, CredentialBackend::Memory);
    }
}
