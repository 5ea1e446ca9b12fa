//! Error types for Moti
//!
//! This module defines the crate-level error type, using `thiserror` for
//! ergonomic error handling. Failures of a single coaching round are not
//! errors at this level; they are reported through
//! [`crate::coach::FailureKind`] and shown to the user as fallback turns.

use thiserror::Error;

/// Main error type for Moti operations
///
/// Covers configuration loading, provider setup, credential storage and the
/// tool-router side panel.
#[derive(Error, Debug)]
pub enum MotiError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Provider-related errors (client construction, bad settings)
    #[error("Provider error: {0}")]
    Provider(String),

    /// Tool-router session provisioning errors
    #[error("Tool router error: {0}")]
    ToolRouter(String),

    /// Missing credentials for a service
    #[error("Missing credentials for service: {0}")]
    MissingCredentials(String),

    /// Credential store errors that are not keyring-specific
    #[error("Credential store error: {0}")]
    CredentialStore(String),

    /// IO errors reading the configuration file
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// YAML parsing errors in the configuration file
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// Keyring/credential storage errors
    #[error("Keyring error: {0}")]
    Keyring(#[from] keyring::Error),
}

/// Result type alias for Moti operations
///
/// Uses `anyhow::Error` so callers can attach context while still being able
/// to downcast to [`MotiError`].
pub type Result<T> = anyhow::Result<T>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_error_display() {
        let error = MotiError::Config("invalid format".to_string());
        assert_eq!(error.to_string(), "Configuration error: invalid format");
    }

    #[test]
    fn test_provider_error_display() {
        let error = MotiError::Provider("bad api base".to_string());
        assert_eq!(error.to_string(), "Provider error: bad api base");
    }

    #[test]
    fn test_tool_router_error_display() {
        let error = MotiError::ToolRouter("no session url".to_string());
        assert_eq!(error.to_string(), "Tool router error: no session url");
    }

    #[test]
    fn test_missing_credentials_error_display() {
        let error = MotiError::MissingCredentials("tool-router".to_string());
        assert_eq!(
            error.to_string(),
            "Missing credentials for service: tool-router"
        );
    }

    #[test]
    fn test_io_error_conversion() {
        let io_error = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let error: MotiError = io_error.into();
        assert!(matches!(error, MotiError::Io(_)));
    }

    #[test]
    fn test_yaml_error_conversion() {
        let yaml_error = serde_yaml::from_str::<serde_yaml::Value>("invalid: : yaml").unwrap_err();
        let error: MotiError = yaml_error.into();
        assert!(matches!(error, MotiError::Yaml(_)));
    }

    #[test]
    fn test_error_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<MotiError>();
    }

    #[test]
    fn test_anyhow_downcast_preserves_variant() {
        let err: anyhow::Error = MotiError::MissingCredentials("generation".to_string()).into();
        assert!(matches!(
            err.downcast_ref::<MotiError>(),
            Some(MotiError::MissingCredentials(_))
        ));
    }
}
