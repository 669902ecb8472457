//! Conversation UI components for chat interface

pub mod commands;
pub mod composer;
pub mod history;
pub mod manager;

pub use commands::{SlashCommand, get_help_text, parse_slash_command};
pub use composer::ConversationComposer;
pub use history::ConversationHistory;
pub use manager::{ConversationAction, ConversationManager};
