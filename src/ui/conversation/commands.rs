use std::str::FromStr;

use once_cell::sync::Lazy;
use strum::{EnumIter, EnumString, IntoEnumIterator, IntoStaticStr};

/// Commands that can be invoked by starting a message with a leading slash.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumString, EnumIter, IntoStaticStr)]
#[strum(serialize_all = "kebab-case")]
pub enum SlashCommand {
    /// Start a fresh chat (drops the current conversation)
    New,
    /// Show help
    Help,
    /// Exit the application
    Quit,
}

impl SlashCommand {
    /// User-visible description shown in help.
    pub fn description(self) -> &'static str {
        match self {
            SlashCommand::New => "start a new chat",
            SlashCommand::Help => "show available commands",
            SlashCommand::Quit => "exit the application",
        }
    }

    /// Command string without the leading '/'.
    pub fn command(self) -> &'static str {
        self.into()
    }
}

/// Parse a slash command from user input
pub fn parse_slash_command(input: &str) -> Option<SlashCommand> {
    let rest = input.trim().strip_prefix('/')?;
    let head = rest.split_whitespace().next()?.to_lowercase();

    SlashCommand::from_str(&head)
        .ok()
        .or_else(|| match head.as_str() {
            "clear" | "reset" => Some(SlashCommand::New),
            "q" | "exit" | "bye" => Some(SlashCommand::Quit),
            "h" | "?" => Some(SlashCommand::Help),
            _ => None,
        })
}

static HELP_TEXT: Lazy<String> = Lazy::new(|| {
    let mut help = String::from("Available commands:\n\n");
    for command in SlashCommand::iter() {
        help.push_str(&format!("- `/{}`: {}\n", command.command(), command.description()));
    }
    help.push_str("\nAliases: `/clear` for `/new`, `/q` or `/exit` for `/quit`.");
    help.push_str("\nKeys: Enter sends, Ctrl+L starts a new chat, PageUp/PageDown scroll, Esc quits.");
    help
});

/// Get help text for all available commands
pub fn get_help_text() -> &'static str {
    HELP_TEXT.as_str()
}
