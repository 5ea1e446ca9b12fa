//! Moti - accountability coach CLI
//!
//! Main entry point for the moti binary.

use anyhow::Result;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use moti::cli::{Cli, Commands, ToolsCommand};
use moti::commands;
use moti::config::Config;

#[tokio::main]
async fn main() -> Result<()> {
    // Parse command line arguments
    let cli = Cli::parse_args();

    init_tracing(cli.verbose);

    // Load configuration
    let config_path = cli.config.as_deref().unwrap_or("config/config.yaml");
    let config = Config::load(config_path, &cli)?;

    // Validate configuration
    config.validate()?;

    match cli.command {
        Commands::Chat { hidden } => {
            tracing::info!("Starting interactive chat");
            commands::chat::run_chat(config, hidden).await?;
            Ok(())
        }
        Commands::Ask { text } => {
            let text = text.join(" ");
            tracing::debug!("One-shot message: {}", text);
            commands::ask::run_ask(config, text).await?;
            Ok(())
        }
        Commands::Auth { service, key } => {
            commands::auth::store_key(config, service.into(), key).await?;
            Ok(())
        }
        Commands::Logout { service } => {
            commands::auth::remove_key(config, service.into()).await?;
            Ok(())
        }
        Commands::Tools { command } => match command {
            ToolsCommand::List => {
                commands::tools::list_toolkits();
                Ok(())
            }
            ToolsCommand::Session { user_id, toolkits } => {
                commands::tools::create_session(config, user_id, toolkits).await?;
                Ok(())
            }
        },
    }
}

/// Initialize tracing subscriber with environment filter
///
/// `RUST_LOG` wins; otherwise `--verbose` selects debug output for moti.
fn init_tracing(verbose: bool) {
    let default_filter = if verbose { "moti=debug" } else { "moti=info" };
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}
