use std::str::FromStr;

use strum::{AsRefStr, EnumIter, EnumString, IntoEnumIterator, IntoStaticStr};

/// Commands that can be invoked by starting a message with a leading slash.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, EnumString, EnumIter, AsRefStr, IntoStaticStr,
)]
#[strum(serialize_all = "kebab-case")]
pub enum SlashCommand {
    /// Toggle expanded source details on citations
    Details,
    /// Start a fresh conversation
    Clear,
    /// Show help
    Help,
    /// Exit the application
    Quit,
}

pub fn command_entries() -> Vec<CommandEntry> {
    SlashCommand::iter()
        .map(|command| CommandEntry {
            keyword: command.command(),
            description: command.description(),
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedCommand {
    pub command: SlashCommand,
    pub argument: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommandEntry {
    pub keyword: &'static str,
    pub description: &'static str,
}

impl SlashCommand {
    /// User-visible description shown in help.
    pub fn description(self) -> &'static str {
        match self {
            SlashCommand::Details => "show or hide citation details (/details on|off)",
            SlashCommand::Clear => "start a fresh conversation",
            SlashCommand::Help => "show available commands",
            SlashCommand::Quit => "exit Sema",
        }
    }

    /// Command string without the leading '/'.
    pub fn command(self) -> &'static str {
        self.into()
    }
}

/// Parse a slash command from user input
pub fn parse_slash_command(input: &str) -> Option<ParsedCommand> {
    let rest = input.trim_start().strip_prefix('/')?;

    let mut parts = rest.split_whitespace();
    let head = parts.next()?.to_lowercase();
    let tail: Vec<&str> = parts.collect();

    let command = SlashCommand::from_str(&head).ok().or_else(|| match head.as_str() {
        "q" | "exit" | "bye" => Some(SlashCommand::Quit),
        "h" | "?" => Some(SlashCommand::Help),
        "d" | "sources" => Some(SlashCommand::Details),
        "new" | "reset" => Some(SlashCommand::Clear),
        _ => None,
    })?;

    let argument = if tail.is_empty() {
        None
    } else {
        Some(tail.join(" "))
    };

    // Anything past a documented argument is an ordinary question
    let accepted = match (command, argument.as_deref()) {
        (_, None) => true,
        (SlashCommand::Details, Some(arg)) => {
            matches!(arg.to_lowercase().as_str(), "on" | "off" | "toggle")
        }
        _ => false,
    };

    accepted.then_some(ParsedCommand { command, argument })
}

/// Get help text for all available commands
pub fn get_help_text() -> String {
    let mut help = String::from("Available commands:\n");
    for entry in command_entries() {
        help.push_str(&format!("/{} - {}\n", entry.keyword, entry.description));
    }

    help.push_str("\nAliases: /q for /quit, /h for /help, /d for /details, /new for /clear");
    help.push_str("\nKeys: F1-F4 quick queries, Ctrl+D details, PgUp/PgDn scroll, Ctrl+C quit");

    help
}
