//! Provider module for Moti
//!
//! This module contains the generation-service abstraction and its
//! OpenAI-compatible implementation.

pub mod base;
pub mod openai;

pub use base::{GenerationError, GenerationService, ProposedTask, TaskRequest};
pub use openai::OpenAiProvider;

use crate::config::ProviderConfig;
use crate::error::Result;
use std::sync::Arc;

/// Create the generation service described by configuration
///
/// # Errors
///
/// Returns error if the HTTP client cannot be built
///
/// # Examples
///
/// ```
/// use moti::config::ProviderConfig;
/// use moti::providers::create_provider;
///
/// let provider = create_provider(&ProviderConfig::default()).unwrap();
/// assert_eq!(provider.model(), "gpt-4o-mini");
/// ```
pub fn create_provider(config: &ProviderConfig) -> Result<Arc<dyn GenerationService>> {
    Ok(Arc::new(OpenAiProvider::new(config.clone())?))
}
