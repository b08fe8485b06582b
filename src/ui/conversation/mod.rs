//! Conversation UI components for the chat screen

pub mod commands;
pub mod composer;
pub mod history;
pub mod indicator;
pub mod manager;

pub use commands::{get_help_text, ParsedCommand, SlashCommand};
pub use composer::{ComposerResult, ConversationComposer};
pub use history::{ConversationHistory, RenderOptions};
pub use indicator::{ThinkingIndicator, THINKING_TEXT};
pub use manager::{ConversationAction, ConversationManager};
