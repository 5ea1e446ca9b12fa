/*!
Command handlers for the CLI

This module provides the handlers invoked by the CLI entrypoint:

- `chat`  - Interactive coaching session
- `ask`   - Send one message and print the coach's answer
- `auth`  - Store or remove API keys
- `tools` - Tool-router toolkits and sessions

The handlers are thin; coaching behavior lives in [`crate::coach`].
*/

use std::sync::Arc;

use colored::Colorize;

use crate::coach::{NegotiationEngine, Session, SubmitOutcome};
use crate::config::Config;
use crate::credentials::{create_store, Credentials};
use crate::error::Result;
use crate::prompts::PromptTemplate;
use crate::providers::create_provider;
use crate::render::MarkdownRenderer;

// Special commands parser for the interactive coach
pub mod special_commands;

/// Opens the configured credential store and builds a fresh session
pub fn build_session(config: &Config) -> Arc<Session> {
    let store = create_store(&config.credentials);
    Arc::new(Session::new(Credentials::load(store)))
}

/// Builds the negotiation engine for `config`
pub fn build_engine(config: &Config) -> Result<Arc<NegotiationEngine>> {
    let provider = create_provider(&config.provider)?;
    tracing::debug!("Using model {}", provider.model());
    Ok(Arc::new(NegotiationEngine::new(
        build_session(config),
        provider,
        PromptTemplate::new(config.coach),
    )))
}

/// Terminal text for the result of a submit
///
/// Returns the turn this submit appended for proposals and fallbacks, a
/// notice when another request is still pending, and nothing for blank input.
pub fn describe_outcome(
    outcome: &SubmitOutcome,
    session: &Session,
    renderer: &MarkdownRenderer,
) -> Option<String> {
    match outcome {
        SubmitOutcome::Ignored => None,
        SubmitOutcome::Busy => Some(
            "still waiting on the coach's last answer, hang on"
                .yellow()
                .to_string(),
        ),
        SubmitOutcome::Proposed { turn, .. } | SubmitOutcome::Failed { turn, .. } => {
            session.with_log(|log| log.get(*turn).map(|turn| renderer.render_turn(turn)))
        }
    }
}

// Chat command handler
pub mod chat {
    //! Interactive coaching loop.
    //!
    //! Reads lines with rustyline. Submits run as background tasks so the
    //! shell stays usable (for `/hide`, `/timer`, ...) while the coach is
    //! thinking; their results and the timer expiry notice are printed
    //! through rustyline's external printer without clobbering the prompt.

    use super::*;
    use crate::chat_panel::{ChatPanel, PanelVisibility};
    use crate::coach::TimerTick;
    use crate::commands::special_commands::{parse_special_command, print_help, SpecialCommand};
    use crate::credentials::CredentialKind;
    use crate::toolkits::ToolRouterClient;
    use rustyline::error::ReadlineError;
    use rustyline::{DefaultEditor, ExternalPrinter};
    use tokio::sync::{mpsc, watch};
    use tokio::task::JoinHandle;

    /// Message announced when the countdown runs out
    pub const EXPIRY_NOTICE: &str = "⏰ time's up! how did it go?";

    /// Start the interactive coach
    ///
    /// # Arguments
    ///
    /// * `config` - Global configuration (consumed)
    /// * `hidden` - Start with the chat panel collapsed
    pub async fn run_chat(config: Config, hidden: bool) -> Result<()> {
        tracing::info!("Starting interactive coach");

        let engine = build_engine(&config)?;
        let tools = ToolRouterClient::new(config.tools.clone())?;
        let renderer = Arc::new(MarkdownRenderer::new()?);
        let panel = ChatPanel::new(if hidden {
            PanelVisibility::Hidden
        } else {
            PanelVisibility::Shown
        });

        let mut rl = DefaultEditor::new()?;
        let notices = spawn_notice_printer(&mut rl);
        let expiry = spawn_expiry_watcher(
            engine.session().timer().subscribe(),
            notices.clone(),
            panel.clone(),
        );

        print_welcome_banner(&panel, engine.session().credentials());

        loop {
            let prompt = panel.format_colored_prompt(engine.session().timer().tick());
            match rl.readline(&prompt) {
                Ok(line) => {
                    let trimmed = line.trim();
                    if trimmed.is_empty() {
                        continue;
                    }

                    let command = match parse_special_command(trimmed) {
                        Ok(command) => command,
                        Err(e) => {
                            eprintln!("{}", e.to_string().red());
                            continue;
                        }
                    };

                    // Keys never go into history
                    if !matches!(
                        command,
                        SpecialCommand::SetKey(_) | SpecialCommand::SetToolKey(_)
                    ) {
                        let _ = rl.add_history_entry(trimmed);
                    }

                    match command {
                        SpecialCommand::Reply(reply) => {
                            submit_in_background(&engine, reply.text(), &renderer, &panel, &notices);
                        }
                        SpecialCommand::None => {
                            submit_in_background(&engine, trimmed, &renderer, &panel, &notices);
                        }
                        SpecialCommand::ToggleReflection => {
                            toggle_reflection(engine.session(), &renderer);
                        }
                        SpecialCommand::ShowTimer => {
                            print_timer(engine.session().timer().tick());
                        }
                        SpecialCommand::ShowHistory => {
                            print_history(engine.session(), &renderer);
                        }
                        SpecialCommand::SetPanel(visibility) => {
                            let previous = panel.set(visibility);
                            if previous != visibility && visibility == PanelVisibility::Shown {
                                print_history(engine.session(), &renderer);
                            }
                        }
                        SpecialCommand::SetKey(key) => {
                            store_key(engine.session().credentials(), CredentialKind::Generation, &key);
                        }
                        SpecialCommand::SetToolKey(key) => {
                            store_key(engine.session().credentials(), CredentialKind::ToolRouter, &key);
                        }
                        SpecialCommand::Tools(toolkits) => {
                            let credentials = engine.session().credentials();
                            match tools
                                .create_session(credentials, &config.tools.user_id, &toolkits)
                                .await
                            {
                                Ok(session) => {
                                    println!("{} {}", "tool session:".green(), session.url)
                                }
                                Err(e) => eprintln!("{}", format!("Error: {}", e).red()),
                            }
                        }
                        SpecialCommand::Help => print_help(),
                        SpecialCommand::Exit => break,
                    }
                }
                Err(ReadlineError::Interrupted) => {
                    println!("CTRL-C");
                    break;
                }
                Err(ReadlineError::Eof) => {
                    println!("CTRL-D");
                    break;
                }
                Err(err) => {
                    tracing::error!("Readline error: {:?}", err);
                    break;
                }
            }
        }

        expiry.abort();
        engine.session().timer().stop();
        println!("see you soon 👋");
        Ok(())
    }

    /// Runs one submit without blocking the prompt
    ///
    /// The result is always applied to the log; it is printed only if the
    /// panel is open when it arrives.
    fn submit_in_background(
        engine: &Arc<NegotiationEngine>,
        text: &str,
        renderer: &Arc<MarkdownRenderer>,
        panel: &ChatPanel,
        notices: &mpsc::UnboundedSender<String>,
    ) {
        if !panel.is_visible() {
            println!("{}", "chat is hidden, type /show to open it".dimmed());
            return;
        }

        let engine = Arc::clone(engine);
        let renderer = Arc::clone(renderer);
        let panel = panel.clone();
        let notices = notices.clone();
        let text = text.to_string();

        tokio::spawn(async move {
            let outcome = engine.submit(&text).await;
            if !panel.is_visible() {
                tracing::debug!("Chat panel hidden; reply recorded but not shown");
                return;
            }
            if let Some(message) = describe_outcome(&outcome, engine.session(), &renderer) {
                let hint = match outcome {
                    SubmitOutcome::Proposed { .. } => format!("\n{}", "/yes  /no  /why".dimmed()),
                    _ => String::new(),
                };
                let _ = notices.send(format!("\n{}{}\n", message, hint));
            }
        });
    }

    /// Forwards notices to the terminal
    ///
    /// Uses rustyline's external printer when the terminal supports it so
    /// the prompt is redrawn under the message; plain stdout otherwise.
    fn spawn_notice_printer(rl: &mut DefaultEditor) -> mpsc::UnboundedSender<String> {
        let (tx, mut rx) = mpsc::unbounded_channel::<String>();

        match rl.create_external_printer() {
            Ok(mut printer) => {
                tokio::spawn(async move {
                    while let Some(message) = rx.recv().await {
                        if let Err(e) = printer.print(message) {
                            tracing::warn!("External printer failed: {}", e);
                        }
                    }
                });
            }
            Err(e) => {
                tracing::debug!("No external printer available: {}", e);
                tokio::spawn(async move {
                    while let Some(message) = rx.recv().await {
                        println!("{}", message);
                    }
                });
            }
        }

        tx
    }

    /// Announces each transition into the expired state
    pub(crate) fn spawn_expiry_watcher(
        mut ticks: watch::Receiver<TimerTick>,
        notices: mpsc::UnboundedSender<String>,
        panel: ChatPanel,
    ) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut previous = *ticks.borrow_and_update();
            while ticks.changed().await.is_ok() {
                let current = *ticks.borrow_and_update();
                let newly_expired = current == TimerTick::Expired && previous != TimerTick::Expired;
                previous = current;
                if newly_expired && panel.is_visible() {
                    let _ = notices.send(EXPIRY_NOTICE.yellow().bold().to_string());
                }
            }
        })
    }

    fn store_key(credentials: &Credentials, kind: CredentialKind, key: &str) {
        match credentials.set(kind, key) {
            Ok(()) => println!("{}", format!("{} key saved", kind).green()),
            Err(e) => eprintln!("{}", format!("Error: {}", e).red()),
        }
    }

    fn toggle_reflection(session: &Session, renderer: &MarkdownRenderer) {
        match session.toggle_latest_reflection() {
            Some((index, visible)) => {
                if visible {
                    if let Some(text) =
                        session.with_log(|log| log.get(index).map(|turn| renderer.render_turn(turn)))
                    {
                        println!("\n{}\n", text);
                    }
                } else {
                    println!("{}", "reflection hidden".dimmed());
                }
            }
            None => println!("{}", "no reflection yet".dimmed()),
        }
    }

    fn print_timer(tick: TimerTick) {
        match tick.display() {
            Some(countdown) => println!("⏱️ {}", countdown),
            None => println!("{}", "no timer running".dimmed()),
        }
    }

    fn print_history(session: &Session, renderer: &MarkdownRenderer) {
        let lines = session.with_log(|log| {
            log.turns()
                .iter()
                .map(|turn| renderer.render_history_turn(turn))
                .collect::<Vec<_>>()
        });
        if lines.is_empty() {
            println!("{}", "nothing yet, tell me what you're putting off".dimmed());
            return;
        }
        for line in lines {
            println!("\n{}", line);
        }
        println!();
    }

    fn print_welcome_banner(panel: &ChatPanel, credentials: &Credentials) {
        println!("\n{} {}", crate::chat_panel::COACH_EMOJI, "moti".magenta().bold());
        println!("tell me what you're avoiding and we'll find a tiny first step.");
        if !credentials.has(CredentialKind::Generation) {
            println!(
                "{}",
                "no api key yet, add one with /key <your key>".yellow()
            );
        }
        if !panel.is_visible() {
            println!("{}", "chat is hidden, type /show to open it".dimmed());
        }
        println!("Type '/help' for available commands, 'exit' to quit\n");
    }

    #[cfg(test)]
    mod tests {
        use super::*;
        use crate::coach::CountdownTimer;
        use std::time::Duration;

        #[tokio::test(start_paused = true)]
        async fn test_expiry_is_announced_once() {
            let timer = CountdownTimer::new();
            let (tx, mut rx) = mpsc::unbounded_channel();
            let watcher = spawn_expiry_watcher(timer.subscribe(), tx, ChatPanel::default());

            timer.start(0.05);
            tokio::time::sleep(Duration::from_secs(4)).await;
            timer.tick();
            timer.tick();
            tokio::task::yield_now().await;

            let notice = rx.try_recv().unwrap();
            assert!(notice.contains("time's up"));
            assert!(rx.try_recv().is_err());
            watcher.abort();
        }

        #[tokio::test(start_paused = true)]
        async fn test_expiry_is_silent_while_hidden() {
            let timer = CountdownTimer::new();
            let (tx, mut rx) = mpsc::unbounded_channel();
            let watcher = spawn_expiry_watcher(
                timer.subscribe(),
                tx,
                ChatPanel::new(PanelVisibility::Hidden),
            );

            timer.start(0.05);
            tokio::time::sleep(Duration::from_secs(4)).await;

            assert!(rx.try_recv().is_err());
            watcher.abort();
        }
    }
}

// One-shot command handler
pub mod ask {
    use super::*;

    /// Submit `text` once and print the coach's answer
    pub async fn run_ask(config: Config, text: String) -> Result<()> {
        let engine = build_engine(&config)?;
        let renderer = MarkdownRenderer::new()?;

        let outcome = engine.submit(&text).await;
        match describe_outcome(&outcome, engine.session(), &renderer) {
            Some(message) => println!("{}", message),
            None => println!("{}", "nothing to send".dimmed()),
        }
        engine.session().timer().stop();
        Ok(())
    }
}

// Key management command handlers
pub mod auth {
    use super::*;
    use crate::credentials::CredentialKind;
    use crate::error::MotiError;
    use rustyline::DefaultEditor;

    /// Store a key for `kind`, prompting when none was passed
    pub async fn store_key(config: Config, kind: CredentialKind, key: Option<String>) -> Result<()> {
        tracing::info!("Storing {} API key", kind);

        let key = match key {
            Some(key) => key,
            None => {
                let mut rl = DefaultEditor::new()?;
                rl.readline(&format!("{} api key: ", kind))
                    .map_err(|e| MotiError::Config(format!("No key entered: {}", e)))?
            }
        };

        let session = build_session(&config);
        session.credentials().set(kind, &key)?;
        println!("{}", format!("{} key saved", kind).green());
        Ok(())
    }

    /// Remove the stored key for `kind`
    pub async fn remove_key(config: Config, kind: CredentialKind) -> Result<()> {
        let session = build_session(&config);
        session.credentials().clear(kind)?;
        println!("{}", format!("{} key removed", kind).green());
        Ok(())
    }

}

// Tool-router command handlers
pub mod tools {
    use super::*;
    use crate::toolkits::{available_toolkits, ToolRouterClient};

    /// Print the toolkits that can be attached to a session
    pub fn list_toolkits() {
        println!("available toolkits:");
        for toolkit in available_toolkits() {
            println!("  {}", toolkit);
        }
    }

    /// Provision a session and print its URL
    pub async fn create_session(
        config: Config,
        user_id: Option<String>,
        toolkits: Vec<String>,
    ) -> Result<()> {
        let user_id = user_id.unwrap_or_else(|| config.tools.user_id.clone());
        let client = ToolRouterClient::new(config.tools.clone())?;
        let session = build_session(&config);

        let created = client
            .create_session(session.credentials(), &user_id, &toolkits)
            .await?;

        println!("{} {}", "tool session:".green(), created.url);
        if !created.toolkits.is_empty() {
            println!("toolkits: {}", created.toolkits.join(", "));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coach::FailureKind;
    use crate::config::{CredentialBackend, CredentialsConfig, ProviderConfig};
    use crate::credentials::MemoryStore;
    use crate::test_utils::{proposal, ScriptedService};

    #[test]
    fn test_build_engine_uses_configured_model() {
        let config = Config {
            provider: ProviderConfig {
                model: "gpt-test".to_string(),
                ..Default::default()
            },
            credentials: CredentialsConfig {
                backend: CredentialBackend::Memory,
                ..Default::default()
            },
            ..Default::default()
        };
        let engine = build_engine(&config).unwrap();
        assert!(engine.session().conversation().is_empty());
        assert!(!engine.is_busy());
    }

    #[tokio::test]
    async fn test_describe_outcome() {
        colored::control::set_override(false);
        let session = Arc::new(Session::new(Credentials::load(Arc::new(
            MemoryStore::with_key(crate::credentials::CredentialKind::Generation, "sk"),
        ))));
        let engine = NegotiationEngine::new(
            Arc::clone(&session),
            Arc::new(ScriptedService::new(vec![Ok(proposal("open a blank doc", 5.0))])),
            PromptTemplate::default(),
        );
        let renderer = MarkdownRenderer::new().unwrap();

        let outcome = engine.submit("start my essay").await;
        assert_eq!(
            describe_outcome(&outcome, &session, &renderer).as_deref(),
            Some("moti: open a blank doc\n\n⏱️ 5 minutes")
        );

        assert_eq!(
            describe_outcome(&SubmitOutcome::Ignored, &session, &renderer),
            None
        );
        assert!(describe_outcome(&SubmitOutcome::Busy, &session, &renderer)
            .unwrap()
            .contains("still waiting"));

        let failed = SubmitOutcome::Failed {
            kind: FailureKind::Transport,
            turn: 1,
        };
        assert!(describe_outcome(&failed, &session, &renderer).is_some());
    }

    #[tokio::test]
    async fn test_describe_outcome_renders_its_own_turn() {
        colored::control::set_override(false);
        let session = Arc::new(Session::new(Credentials::load(Arc::new(
            MemoryStore::with_key(crate::credentials::CredentialKind::Generation, "sk"),
        ))));
        let engine = NegotiationEngine::new(
            Arc::clone(&session),
            Arc::new(ScriptedService::new(vec![Ok(proposal("open a blank doc", 5.0))])),
            PromptTemplate::default(),
        );
        let renderer = MarkdownRenderer::new().unwrap();

        let first = engine.submit("start my essay").await;
        // The next round appends its user turn before the first reply is shown
        engine.submit("no").await;

        assert_eq!(
            describe_outcome(&first, &session, &renderer).as_deref(),
            Some("moti: open a blank doc\n\n⏱️ 5 minutes")
        );
    }
}
