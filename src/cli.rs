//! Command-line interface definition for Moti
//!
//! This module defines the CLI structure using clap's derive API,
//! providing commands for the interactive coach, one-shot prompts,
//! key management, and the tool-router side panel.

use clap::{Parser, Subcommand, ValueEnum};

/// Moti - accountability coach in your terminal
///
/// Break intimidating goals into tiny timed tasks, negotiated one at a time
/// with an AI coach.
#[derive(Parser, Debug, Clone)]
#[command(name = "moti")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "config/config.yaml")]
    pub config: Option<String>,

    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,

    /// Override the model from config
    #[arg(short, long)]
    pub model: Option<String>,

    /// Keep API keys in memory only for this run
    #[arg(long)]
    pub ephemeral: bool,

    /// Command to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands for Moti
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Start the interactive coaching chat
    Chat {
        /// Start with the chat panel collapsed to the emoji
        #[arg(long)]
        hidden: bool,
    },

    /// Send a single message to the coach and print the proposal
    Ask {
        /// Message for the coach
        #[arg(required = true)]
        text: Vec<String>,
    },

    /// Store an API key
    Auth {
        /// Which service the key belongs to
        #[arg(short, long, value_enum, default_value_t = ServiceArg::Generation)]
        service: ServiceArg,

        /// Key value; prompted for when omitted
        #[arg(short, long)]
        key: Option<String>,
    },

    /// Remove a stored API key
    Logout {
        /// Which service the key belongs to
        #[arg(short, long, value_enum, default_value_t = ServiceArg::Generation)]
        service: ServiceArg,
    },

    /// Tool-router side panel
    Tools {
        /// Tool-router subcommand
        #[command(subcommand)]
        command: ToolsCommand,
    },
}

/// Services that own an API key
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServiceArg {
    /// The text-generation service
    Generation,
    /// The tool-router service
    ToolRouter,
}

/// Tool-router subcommands
#[derive(Subcommand, Debug, Clone)]
pub enum ToolsCommand {
    /// List toolkits that can be attached to a session
    List,

    /// Provision a tool-router session and print its URL
    Session {
        /// User identifier; defaults to the configured one
        #[arg(short, long)]
        user_id: Option<String>,

        /// Toolkit to include (repeatable)
        #[arg(short, long = "toolkit")]
        toolkits: Vec<String>,
    },
}

impl Cli {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Self::parse()
    }
}

impl Default for Cli {
    fn default() -> Self {
        Self {
            config: Some("config/config.yaml".to_string()),
            verbose: false,
            model: None,
            ephemeral: false,
            command: Commands::Chat { hidden: false },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_default() {
        let cli = Cli::default();
        assert_eq!(cli.config, Some("config/config.yaml".to_string()));
        assert!(!cli.verbose);
        assert!(!cli.ephemeral);
        assert!(matches!(cli.command, Commands::Chat { hidden: false }));
    }

    #[test]
    fn test_cli_parse_chat_command() {
        let cli = Cli::try_parse_from(["moti", "chat", "--hidden"]).unwrap();
        assert!(matches!(cli.command, Commands::Chat { hidden: true }));
    }

    #[test]
    fn test_cli_parse_ask_joins_words() {
        let cli = Cli::try_parse_from(["moti", "ask", "start", "my", "essay"]).unwrap();
        if let Commands::Ask { text } = cli.command {
            assert_eq!(text.join(" "), "start my essay");
        } else {
            panic!("Expected Ask command");
        }
    }

    #[test]
    fn test_cli_parse_ask_requires_text() {
        assert!(Cli::try_parse_from(["moti", "ask"]).is_err());
    }

    #[test]
    fn test_cli_parse_auth_defaults_to_generation() {
        let cli = Cli::try_parse_from(["moti", "auth"]).unwrap();
        if let Commands::Auth { service, key } = cli.command {
            assert_eq!(service, ServiceArg::Generation);
            assert_eq!(key, None);
        } else {
            panic!("Expected Auth command");
        }
    }

    #[test]
    fn test_cli_parse_auth_tool_router_with_key() {
        let cli =
            Cli::try_parse_from(["moti", "auth", "--service", "tool-router", "--key", "ck_1"])
                .unwrap();
        if let Commands::Auth { service, key } = cli.command {
            assert_eq!(service, ServiceArg::ToolRouter);
            assert_eq!(key, Some("ck_1".to_string()));
        } else {
            panic!("Expected Auth command");
        }
    }

    #[test]
    fn test_cli_parse_tools_session_toolkits() {
        let cli = Cli::try_parse_from([
            "moti", "tools", "session", "-t", "gmail", "-t", "github", "--user-id", "me",
        ])
        .unwrap();
        if let Commands::Tools {
            command: ToolsCommand::Session { user_id, toolkits },
        } = cli.command
        {
            assert_eq!(user_id, Some("me".to_string()));
            assert_eq!(toolkits, vec!["gmail".to_string(), "github".to_string()]);
        } else {
            panic!("Expected Tools Session command");
        }
    }

    #[test]
    fn test_cli_global_flags() {
        let cli =
            Cli::try_parse_from(["moti", "--ephemeral", "-m", "gpt-x", "-v", "tools", "list"])
                .unwrap();
        assert!(cli.ephemeral);
        assert!(cli.verbose);
        assert_eq!(cli.model, Some("gpt-x".to_string()));
        assert!(matches!(
            cli.command,
            Commands::Tools {
                command: ToolsCommand::List
            }
        ));
    }
}
