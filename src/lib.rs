//! Moti - accountability coach CLI library
//!
//! Moti breaks an intimidating goal into tiny timed tasks. Each round the
//! user's message is sent to a structured-output generation service, which
//! answers with a task, a duration, and a hidden reflection; the task is
//! shown with a countdown and the user accepts or asks for something
//! smaller.
//!
//! # Architecture
//!
//! - `coach`: conversation log, countdown timer, and the negotiation engine
//! - `providers`: generation service abstraction and the OpenAI-compatible client
//! - `prompts`: coaching instructions and policy limits
//! - `credentials`: API key storage (system keyring or memory)
//! - `toolkits`: tool-router session provisioning
//! - `render`, `chat_panel`, `commands`: the terminal shell
//! - `config`, `cli`, `error`: configuration, argument parsing, error types
//!
//! # Example
//!
//! ```no_run
//! use moti::cli::Cli;
//! use moti::commands::build_engine;
//! use moti::Config;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::load("config/config.yaml", &Cli::default())?;
//!     config.validate()?;
//!
//!     let engine = build_engine(&config)?;
//!     engine.submit("start my essay").await;
//!     Ok(())
//! }
//! ```

pub mod chat_panel;
pub mod cli;
pub mod coach;
pub mod commands;
pub mod config;
pub mod credentials;
pub mod error;
pub mod prompts;
pub mod providers;
pub mod render;
pub mod toolkits;

// Re-export commonly used types
pub use coach::{NegotiationEngine, Session, SubmitOutcome};
pub use config::Config;
pub use error::{MotiError, Result};

#[cfg(test)]
pub mod test_utils;
