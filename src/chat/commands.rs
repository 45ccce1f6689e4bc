//! Slash command parsing for the terminal front-end.
//!
//! Input starting with `/` controls the session and is never sent to the model.

use std::str::FromStr;

use crate::types::Topic;

/// A parsed chat command.
#[derive(Debug, Clone, PartialEq)]
pub enum ChatCommand {
    /// Switch to another topic module.
    Topic(Topic),

    /// List the topic modules.
    Topics,

    /// Re-run initialization of the current topic.
    Reset,

    /// Redraw the transcript.
    History,

    /// Change the model for the next handle.
    Model(String),

    /// Set the sampling temperature for the next handle.
    Temperature(f32),

    /// Clear the sampling temperature (use model default).
    ClearTemperature,

    /// Display session statistics.
    Stats,

    /// Display help information.
    Help,

    /// Exit the chat application.
    Quit,

    /// Report a parsing error back to the caller.
    Invalid(String),
}

/// Parses user input for slash commands.
///
/// Returns `Some(ChatCommand)` if the input is a command, or `None` if it should be
/// sent as a regular message.
///
/// # Examples
///
/// ```
/// # use cyberinstruct::chat::{ChatCommand, parse_command};
/// # use cyberinstruct::Topic;
/// assert_eq!(parse_command("/topic web"), Some(ChatCommand::Topic(Topic::WebExploitation)));
/// assert!(parse_command("/quit").is_some());
/// assert!(parse_command("How does SYN scanning work?").is_none());
/// ```
pub fn parse_command(input: &str) -> Option<ChatCommand> {
    let input = input.trim();
    let rest = input.strip_prefix('/')?;

    let mut parts = rest.splitn(2, ' ');
    let command = parts.next()?.to_lowercase();
    let argument = parts.next().map(|s| s.trim()).filter(|s| !s.is_empty());

    let result = match command.as_str() {
        "topic" | "module" => match argument {
            Some(arg) => match Topic::from_str(arg) {
                Ok(topic) => ChatCommand::Topic(topic),
                Err(err) => ChatCommand::Invalid(err),
            },
            None => {
                ChatCommand::Invalid("/topic requires a name or number (see /topics)".to_string())
            }
        },
        "topics" | "modules" => ChatCommand::Topics,
        "reset" | "clear" => ChatCommand::Reset,
        "history" => ChatCommand::History,
        "model" => match argument {
            Some(model) => ChatCommand::Model(model.to_string()),
            None => ChatCommand::Invalid("/model requires a model name".to_string()),
        },
        "temperature" => match argument {
            Some(arg) if arg.eq_ignore_ascii_case("clear") => ChatCommand::ClearTemperature,
            Some(arg) => match parse_f32_in_range(arg, 0.0, 1.0) {
                Ok(value) => ChatCommand::Temperature(value),
                Err(err) => ChatCommand::Invalid(format!("/temperature {err}")),
            },
            None => ChatCommand::Invalid("/temperature requires a value".to_string()),
        },
        "stats" | "status" => ChatCommand::Stats,
        "help" | "?" => ChatCommand::Help,
        "quit" | "exit" | "q" => ChatCommand::Quit,
        _ => ChatCommand::Invalid(format!("Unknown command: /{command}")),
    };

    Some(result)
}

fn parse_f32_in_range(value: &str, min: f32, max: f32) -> Result<f32, String> {
    let parsed: f32 = value
        .parse()
        .map_err(|_| format!("expects a value between {min} and {max}"))?;
    if parsed.is_finite() && parsed >= min && parsed <= max {
        Ok(parsed)
    } else {
        Err(format!("expects a value between {min} and {max}"))
    }
}

/// Returns the numbered list of topic modules.
pub fn topics_text(current: Topic) -> String {
    let mut text = String::from("Modules:");
    for (idx, topic) in Topic::ALL.iter().enumerate() {
        let marker = if *topic == current { '*' } else { ' ' };
        text.push_str(&format!(
            "\n {marker} {}. {:<24} /topic {}",
            idx + 1,
            topic.label(),
            topic.slug()
        ));
    }
    text
}

/// Returns help text describing available commands.
pub fn help_text() -> &'static str {
    r#"Available commands:
  /topic <name|number>   Switch module (e.g., /topic web, /topic 3)
  /topics                List modules
  /reset                 Reload the current module
  /history               Redraw the transcript
  /model <name>          Change the model (applies from the next module load)
  /temperature <v>       Set temperature 0.0-1.0 (use 'clear' to reset)
  /stats                 Show session statistics
  /help                  Show this help message
  /quit                  Exit the chat"#
}
