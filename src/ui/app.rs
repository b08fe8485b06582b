use crate::api::ChatApi;
use crate::config::Config;
use crate::events::TuiEvent;
use crate::ui::conversation::{ConversationAction, ConversationManager};
use anyhow::{Context, Result};
use crossterm::{
    event::{self, DisableBracketedPaste, EnableBracketedPaste, Event},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{backend::CrosstermBackend, Terminal};
use std::io::{self, Stdout};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

const TICK: Duration = Duration::from_millis(50);

type Tui = Terminal<CrosstermBackend<Stdout>>;

fn setup_terminal() -> Result<Tui> {
    enable_raw_mode().context("Failed to enable raw mode")?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableBracketedPaste)
        .context("Failed to enter alternate screen")?;
    Terminal::new(CrosstermBackend::new(stdout)).context("Failed to create terminal")
}

fn restore_terminal(terminal: &mut Tui) {
    let _ = disable_raw_mode();
    let _ = execute!(terminal.backend_mut(), DisableBracketedPaste, LeaveAlternateScreen);
    let _ = terminal.show_cursor();
}

/// Run the interactive chat until the user quits
pub async fn run(config: Config, api: Arc<dyn ChatApi>) -> Result<()> {
    let mut terminal = setup_terminal()?;

    // Restore the terminal before printing a panic
    let orig_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |info| {
        let _ = disable_raw_mode();
        let _ = execute!(io::stdout(), DisableBracketedPaste, LeaveAlternateScreen);
        orig_hook(info);
    }));

    info!(api = %config.chat_url(), "chat session started");
    let mut manager = ConversationManager::new(&config, api);
    let result = event_loop(&mut terminal, &mut manager).await;

    restore_terminal(&mut terminal);
    info!(
        messages = manager.controller().messages().len(),
        abandoned_request = manager.is_waiting(),
        "chat session ended"
    );
    result
}

async fn event_loop(terminal: &mut Tui, manager: &mut ConversationManager) -> Result<()> {
    loop {
        manager.poll_pending();

        terminal
            .draw(|frame| {
                let area = frame.size();
                manager.render(area, frame.buffer_mut());
            })
            .context("Failed to draw frame")?;

        let Some(tui_event) = next_event()? else {
            // Let the request task make progress between frames
            tokio::task::yield_now().await;
            continue;
        };

        match tui_event {
            TuiEvent::Key(key) => {
                if manager.handle_key(key) == ConversationAction::Exit {
                    return Ok(());
                }
            }
            TuiEvent::Paste(text) => manager.handle_paste(&text),
            TuiEvent::Resize(width, height) => debug!(width, height, "terminal resized"),
        }
    }
}

fn next_event() -> Result<Option<TuiEvent>> {
    if !event::poll(TICK).context("Failed to poll terminal events")? {
        return Ok(None);
    }

    let event = match event::read().context("Failed to read terminal event")? {
        Event::Key(key) => Some(TuiEvent::Key(key)),
        Event::Paste(text) => Some(TuiEvent::Paste(text)),
        Event::Resize(width, height) => Some(TuiEvent::Resize(width, height)),
        _ => None,
    };
    Ok(event)
}
