//! Conversation state and the submit/settle exchange.
//!
//! The controller owns the message sequence, the input text and the busy
//! flag. A submission is split in two halves so the UI can run the network
//! call off the render loop: [`ConversationController::submit`] records the
//! user turn and yields the request, [`ConversationController::settle`]
//! records the outcome.

use crate::api::{ApiError, ChatApi, ChatRequest, ChatResponse, HistoryTurn};
use crate::events::ChatMessage;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Assistant reply shown for every failed exchange.
pub const FALLBACK_REPLY: &str = "Sorry, something went wrong.";

/// Externally meaningful controller states
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConversationState {
    Idle,
    AwaitingResponse,
}

/// Request produced by an accepted submission
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingRequest {
    pub id: Uuid,
    pub request: ChatRequest,
}

/// Editable contents of the input box.
///
/// The cursor is a char index so multi-byte text edits cleanly.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InputBuffer {
    content: String,
    cursor: usize,
}

impl InputBuffer {
    pub fn as_str(&self) -> &str {
        &self.content
    }

    pub fn is_empty(&self) -> bool {
        self.content.is_empty()
    }

    /// Cursor position in chars
    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn set(&mut self, text: impl Into<String>) {
        self.content = text.into();
        self.cursor = self.content.chars().count();
    }

    pub fn clear(&mut self) {
        self.content.clear();
        self.cursor = 0;
    }

    pub fn insert(&mut self, c: char) {
        let at = self.byte_index(self.cursor);
        self.content.insert(at, c);
        self.cursor += 1;
    }

    pub fn insert_str(&mut self, text: &str) {
        for c in text.chars().filter(|c| !c.is_control()) {
            self.insert(c);
        }
    }

    /// Delete the char before the cursor
    pub fn backspace(&mut self) -> bool {
        if self.cursor == 0 {
            return false;
        }
        self.cursor -= 1;
        let at = self.byte_index(self.cursor);
        self.content.remove(at);
        true
    }

    /// Delete the char under the cursor
    pub fn delete(&mut self) -> bool {
        if self.cursor >= self.content.chars().count() {
            return false;
        }
        let at = self.byte_index(self.cursor);
        self.content.remove(at);
        true
    }

    pub fn move_left(&mut self) {
        self.cursor = self.cursor.saturating_sub(1);
    }

    pub fn move_right(&mut self) {
        self.cursor = (self.cursor + 1).min(self.content.chars().count());
    }

    pub fn move_home(&mut self) {
        self.cursor = 0;
    }

    pub fn move_end(&mut self) {
        self.cursor = self.content.chars().count();
    }

    fn byte_index(&self, char_index: usize) -> usize {
        self.content
            .char_indices()
            .nth(char_index)
            .map_or(self.content.len(), |(i, _)| i)
    }
}

pub struct ConversationController {
    messages: Vec<ChatMessage>,
    input: InputBuffer,
    busy: bool,
    send_history: bool,
    in_flight: Option<Uuid>,
}

impl ConversationController {
    pub fn new(send_history: bool) -> Self {
        Self {
            messages: Vec::new(),
            input: InputBuffer::default(),
            busy: false,
            send_history,
            in_flight: None,
        }
    }

    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    pub fn input(&self) -> &InputBuffer {
        &self.input
    }

    pub fn input_mut(&mut self) -> &mut InputBuffer {
        &mut self.input
    }

    /// Submit whatever is currently in the input box
    pub fn submit_input(&mut self) -> Option<PendingRequest> {
        let text = self.input.as_str().to_string();
        self.submit(&text)
    }

    pub fn is_busy(&self) -> bool {
        self.busy
    }

    pub fn state(&self) -> ConversationState {
        if self.busy {
            ConversationState::AwaitingResponse
        } else {
            ConversationState::Idle
        }
    }

    /// Record a user turn and return the request to send.
    ///
    /// Blank text and submissions while a response is pending are ignored.
    pub fn submit(&mut self, text: &str) -> Option<PendingRequest> {
        if text.trim().is_empty() {
            return None;
        }
        if self.busy {
            debug!("submit ignored while awaiting a response");
            return None;
        }

        let history = if self.send_history {
            self.messages.iter().map(HistoryTurn::from).collect()
        } else {
            Vec::new()
        };

        self.messages.push(ChatMessage::user(text));
        self.busy = true;
        self.input.clear();

        let id = Uuid::new_v4();
        self.in_flight = Some(id);
        info!(request_id = %id, bytes = text.len(), "question submitted");

        Some(PendingRequest {
            id,
            request: ChatRequest::new(text).with_history(history),
        })
    }

    /// Record the outcome of the pending request and return to idle.
    pub fn settle(&mut self, outcome: Result<ChatResponse, ApiError>) {
        let id = self.in_flight.take();
        let reply = match outcome {
            Ok(response) => {
                info!(
                    request_id = ?id,
                    sources = response.sources.as_ref().map_or(0, Vec::len),
                    "answer received"
                );
                ChatMessage::assistant(response.answer, response.sources)
            }
            Err(err) => {
                warn!(request_id = ?id, error = %err, "chat request failed");
                ChatMessage::assistant(FALLBACK_REPLY, None)
            }
        };

        self.messages.push(reply);
        self.busy = false;
    }

    /// Submit, wait for the service, and settle in one step.
    ///
    /// Returns `false` when the text was not accepted.
    pub async fn ask(&mut self, text: &str, api: &dyn ChatApi) -> bool {
        let Some(pending) = self.submit(text) else {
            return false;
        };
        let outcome = api.ask(pending.request).await;
        self.settle(outcome);
        true
    }

    /// Drop the conversation; ignored while a response is pending.
    pub fn clear(&mut self) -> bool {
        if self.busy {
            return false;
        }
        self.messages.clear();
        self.input.clear();
        true
    }
}
