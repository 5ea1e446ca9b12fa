//! Special commands parser for the interactive coach
//!
//! Commands are prefixed with `/`, case-insensitive in their name, and never
//! reach the coach. Everything else is submitted as a user turn.

use thiserror::Error;

use crate::chat_panel::PanelVisibility;
use crate::coach::QuickReply;

/// Errors that can occur when parsing special commands
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CommandError {
    /// Unknown command was entered
    #[error("Unknown command: {0}\n\nType '/help' to see available commands")]
    UnknownCommand(String),

    /// Command requires an argument but none was provided
    #[error("Command {command} requires an argument\n\nUsage: {usage}")]
    MissingArgument { command: String, usage: String },
}

/// Special commands available in the interactive coach
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SpecialCommand {
    /// Answer the latest proposal with `yes` or `no`
    Reply(QuickReply),

    /// Show or hide the reflection of the latest proposal
    ToggleReflection,

    /// Show the countdown
    ShowTimer,

    /// Reprint the conversation
    ShowHistory,

    /// Open or collapse the chat panel
    SetPanel(PanelVisibility),

    /// Store the generation API key
    SetKey(String),

    /// Store the tool-router API key
    SetToolKey(String),

    /// Provision a tool-router session with the given toolkits
    Tools(Vec<String>),

    /// Display help information
    Help,

    /// Exit the interactive session
    Exit,

    /// Not a special command
    None,
}

/// Parse a user input string into a special command
///
/// Key arguments keep their original case.
///
/// # Examples
///
/// ```
/// use moti::commands::special_commands::{parse_special_command, SpecialCommand};
/// use moti::coach::QuickReply;
///
/// assert_eq!(
///     parse_special_command("/yes").unwrap(),
///     SpecialCommand::Reply(QuickReply::Yes)
/// );
/// assert_eq!(
///     parse_special_command("start my essay").unwrap(),
///     SpecialCommand::None
/// );
/// assert!(parse_special_command("/foo").is_err());
/// ```
pub fn parse_special_command(input: &str) -> Result<SpecialCommand, CommandError> {
    let trimmed = input.trim();
    let lower = trimmed.to_lowercase();

    if !trimmed.starts_with('/') && lower != "exit" && lower != "quit" {
        return Ok(SpecialCommand::None);
    }

    let (name, rest) = match trimmed.split_once(char::is_whitespace) {
        Some((name, rest)) => (name.to_lowercase(), rest.trim()),
        None => (lower.clone(), ""),
    };

    match name.as_str() {
        "/yes" | "/y" => Ok(SpecialCommand::Reply(QuickReply::Yes)),
        "/no" | "/n" => Ok(SpecialCommand::Reply(QuickReply::No)),
        "/why" | "/reflection" => Ok(SpecialCommand::ToggleReflection),
        "/timer" => Ok(SpecialCommand::ShowTimer),
        "/history" => Ok(SpecialCommand::ShowHistory),
        "/hide" => Ok(SpecialCommand::SetPanel(PanelVisibility::Hidden)),
        "/show" => Ok(SpecialCommand::SetPanel(PanelVisibility::Shown)),
        "/key" => required_arg("/key", "/key <api key>", rest).map(SpecialCommand::SetKey),
        "/toolkey" => {
            required_arg("/toolkey", "/toolkey <api key>", rest).map(SpecialCommand::SetToolKey)
        }
        "/tools" => Ok(SpecialCommand::Tools(
            rest.split(|c: char| c.is_whitespace() || c == ',')
                .filter(|s| !s.is_empty())
                .map(str::to_lowercase)
                .collect(),
        )),
        "/help" | "/?" => Ok(SpecialCommand::Help),
        "/exit" | "/quit" | "exit" | "quit" => Ok(SpecialCommand::Exit),
        _ => Err(CommandError::UnknownCommand(trimmed.to_string())),
    }
}

fn required_arg(command: &str, usage: &str, rest: &str) -> Result<String, CommandError> {
    if rest.is_empty() {
        Err(CommandError::MissingArgument {
            command: command.to_string(),
            usage: usage.to_string(),
        })
    } else {
        Ok(rest.to_string())
    }
}

/// Display help information for special commands
pub fn print_help() {
    println!(
        r#"
Coach Commands
==============

ANSWERING A PROPOSAL:
  /yes, /y        - Accept the proposed task
  /no, /n         - Ask for something smaller
  /why            - Show or hide the coach's reflection

SESSION:
  /timer          - Show the countdown
  /history        - Reprint the conversation
  /hide           - Collapse the chat to the emoji
  /show           - Open the chat again

KEYS AND TOOLS:
  /key <key>      - Store the generation API key
  /toolkey <key>  - Store the tool-router API key
  /tools [names]  - Create a tool-router session (e.g. /tools gmail github)

  /help, /?       - Show this help message
  /exit, exit     - Leave moti

NOTES:
  - Anything not starting with / is sent to the coach
  - Command names are case-insensitive
"#
    );
}
