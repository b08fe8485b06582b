use crate::api::{ApiError, ChatApi, ChatResponse};
use crate::config::Config;
use crate::controller::{ConversationController, ConversationState, PendingRequest};
use crate::ui::conversation::{
    get_help_text, ComposerResult, ConversationComposer, ConversationHistory, ParsedCommand,
    RenderOptions, SlashCommand, ThinkingIndicator,
};
use crossterm::event::{KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use ratatui::{
    buffer::Buffer,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Style},
    widgets::{Block, Borders, Clear, Paragraph, Widget, Wrap},
};
use std::sync::Arc;
use tokio::sync::oneshot;
use tracing::{debug, error};

type Settlement = Result<ChatResponse, ApiError>;

/// Overlay shown above the history until dismissed with Esc
#[derive(Debug, Clone, PartialEq, Eq)]
struct Notice {
    title: &'static str,
    body: String,
}

/// Actions that can be requested by the conversation manager
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConversationAction {
    None,
    Exit,
}

/// Manages the conversation flow and UI components
pub struct ConversationManager {
    controller: ConversationController,
    composer: ConversationComposer,
    history: ConversationHistory,
    indicator: ThinkingIndicator,
    api: Arc<dyn ChatApi>,
    pending: Option<oneshot::Receiver<Settlement>>,
    options: RenderOptions,
    notice: Option<Notice>,
}

impl ConversationManager {
    pub fn new(config: &Config, api: Arc<dyn ChatApi>) -> Self {
        Self {
            controller: ConversationController::new(config.api.send_history),
            composer: ConversationComposer::new(),
            history: ConversationHistory::new(),
            indicator: ThinkingIndicator::new(),
            api,
            pending: None,
            options: RenderOptions {
                show_details: config.ui.show_source_details,
                show_timestamps: config.ui.show_timestamps,
            },
            notice: None,
        }
    }

    pub fn controller(&self) -> &ConversationController {
        &self.controller
    }

    pub fn notice(&self) -> Option<&str> {
        self.notice.as_ref().map(|notice| notice.body.as_str())
    }

    /// Handle key input
    pub fn handle_key(&mut self, key: KeyEvent) -> ConversationAction {
        if key.kind != KeyEventKind::Press {
            return ConversationAction::None;
        }

        if key.modifiers.contains(KeyModifiers::CONTROL) {
            match key.code {
                KeyCode::Char('c') => return ConversationAction::Exit,
                KeyCode::Char('d') => {
                    self.options.show_details = !self.options.show_details;
                    return ConversationAction::None;
                }
                _ => {}
            }
        }

        match key.code {
            KeyCode::PageUp => {
                self.history.scroll_up();
                return ConversationAction::None;
            }
            KeyCode::PageDown => {
                self.history.scroll_down();
                return ConversationAction::None;
            }
            KeyCode::Esc if self.notice.is_some() && !self.composer.is_palette_open() => {
                self.notice = None;
                return ConversationAction::None;
            }
            _ => {}
        }

        let enabled = !self.controller.is_busy();
        match self.composer.handle_key(key, self.controller.input_mut(), enabled) {
            ComposerResult::Submit => {
                self.notice = None;
                self.submit_input();
                ConversationAction::None
            }
            ComposerResult::Command(command) => self.handle_slash_command(command),
            ComposerResult::None => ConversationAction::None,
        }
    }

    pub fn handle_paste(&mut self, text: &str) {
        let enabled = !self.controller.is_busy();
        self.composer.handle_paste(text, self.controller.input_mut(), enabled);
    }

    /// Submit the input box and run the request on a background task
    pub fn submit_input(&mut self) {
        if let Some(pending) = self.controller.submit_input() {
            self.dispatch(pending);
        }
    }

    fn dispatch(&mut self, pending: PendingRequest) {
        let (tx, rx) = oneshot::channel();
        let api = Arc::clone(&self.api);
        let request_id = pending.id;

        tokio::spawn(async move {
            let outcome = api.ask(pending.request).await;
            if tx.send(outcome).is_err() {
                debug!(request_id = %request_id, "answer dropped, conversation closed");
            }
        });

        self.pending = Some(rx);
        self.indicator.start();
        self.history.scroll_to_bottom();
    }

    /// Apply a finished request, if any (called from main loop)
    pub fn poll_pending(&mut self) {
        let Some(rx) = self.pending.as_mut() else {
            return;
        };

        match rx.try_recv() {
            Ok(outcome) => self.finish(outcome),
            Err(oneshot::error::TryRecvError::Empty) => {}
            Err(oneshot::error::TryRecvError::Closed) => {
                error!("request task ended without a result");
                self.finish(Err(ApiError::Unreachable("request task aborted".to_string())));
            }
        }
    }

    pub fn is_waiting(&self) -> bool {
        self.pending.is_some()
    }

    fn finish(&mut self, outcome: Settlement) {
        self.pending = None;
        self.controller.settle(outcome);
        self.indicator.stop();
        self.history.scroll_to_bottom();
    }

    /// Handle slash commands
    fn handle_slash_command(&mut self, command: ParsedCommand) -> ConversationAction {
        match command.command {
            SlashCommand::Details => {
                let argument = command.argument.map(|arg| arg.trim().to_lowercase());
                self.options.show_details = match argument.as_deref() {
                    Some("on") => true,
                    Some("off") => false,
                    _ => !self.options.show_details,
                };
                ConversationAction::None
            }
            SlashCommand::Clear => {
                if self.controller.clear() {
                    self.history.scroll_to_bottom();
                    self.notice = None;
                } else {
                    self.notice = Some(Notice {
                        title: "Busy (Esc to close)",
                        body: "Wait for the current answer before clearing.".to_string(),
                    });
                }
                ConversationAction::None
            }
            SlashCommand::Help => {
                self.notice = Some(Notice {
                    title: "Help (Esc to close)",
                    body: get_help_text(),
                });
                ConversationAction::None
            }
            SlashCommand::Quit => ConversationAction::Exit,
        }
    }

    /// Render the conversation UI components
    pub fn render(&mut self, area: Rect, buf: &mut Buffer) {
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Min(3),    // History
                Constraint::Length(1), // Thinking indicator
                Constraint::Length(3), // Composer
            ])
            .split(area);

        self.history.set_page_height(chunks[0].height.saturating_sub(2));
        self.history
            .view(self.controller.messages(), self.options)
            .render(chunks[0], buf);

        if self.controller.state() == ConversationState::AwaitingResponse {
            (&self.indicator).render(chunks[1], buf);
        }

        self.composer
            .view(self.controller.input(), self.controller.is_busy())
            .render(chunks[2], buf);

        if let Some(notice) = &self.notice {
            render_notice(notice, chunks[0], buf);
        }
    }
}

fn render_notice(notice: &Notice, area: Rect, buf: &mut Buffer) {
    let text = notice.body.as_str();
    let height = (text.lines().count() as u16 + 2).min(area.height);
    let notice_area = Rect {
        x: area.x + 2,
        y: area.y + area.height.saturating_sub(height),
        width: area.width.saturating_sub(4),
        height,
    };

    Clear.render(notice_area, buf);
    Paragraph::new(text.to_string())
        .wrap(Wrap { trim: false })
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title(notice.title)
                .style(Style::default().fg(Color::Yellow)),
        )
        .render(notice_area, buf);
}
