use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};

/// TUI-specific events (keyboard, paste, resize)
#[derive(Debug, Clone)]
pub enum TuiEvent {
    /// Key press event
    Key(crossterm::event::KeyEvent),

    /// Paste event
    Paste(String),

    /// Terminal resize
    Resize(u16, u16),
}

/// Who authored a message in the conversation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    User,
    Assistant,
}

impl ChatRole {
    pub fn display_name(&self) -> &'static str {
        match self {
            ChatRole::User => "You",
            ChatRole::Assistant => "Sema",
        }
    }
}

/// Document/page metadata an assistant answer draws from
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Source {
    pub title: String,
    pub page: i64,
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thumbnail_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub agency: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub publish_date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_size: Option<String>,
}

impl Source {
    /// Short citation label, e.g. `Kenya Gazette p.18`
    pub fn chip_label(&self) -> String {
        format!("{} p.{}", self.title, self.page)
    }
}

/// A single entry in the conversation sequence.
///
/// Fields are private so an appended message cannot be edited in place.
#[derive(Debug, Clone, PartialEq)]
pub struct ChatMessage {
    role: ChatRole,
    content: String,
    sources: Option<Vec<Source>>,
    timestamp: DateTime<Local>,
}

impl ChatMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::User,
            content: content.into(),
            sources: None,
            timestamp: Local::now(),
        }
    }

    pub fn assistant(content: impl Into<String>, sources: Option<Vec<Source>>) -> Self {
        Self {
            role: ChatRole::Assistant,
            content: content.into(),
            sources,
            timestamp: Local::now(),
        }
    }

    pub fn role(&self) -> ChatRole {
        self.role
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    /// Sources exactly as received; `None` when the response carried none.
    pub fn sources(&self) -> Option<&[Source]> {
        self.sources.as_deref()
    }

    /// Sources to cite, empty when absent
    pub fn citations(&self) -> &[Source] {
        self.sources.as_deref().unwrap_or(&[])
    }

    pub fn timestamp(&self) -> DateTime<Local> {
        self.timestamp
    }

    /// Whether the decorative budget breakdown accompanies this message
    pub fn mentions_budget(&self) -> bool {
        self.content.to_lowercase().contains("budget")
    }
}
