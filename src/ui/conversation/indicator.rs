use ratatui::{
    buffer::Buffer,
    layout::Rect,
    style::{Color, Style},
    text::{Line, Span},
    widgets::Widget,
};
use std::time::Instant;

pub const THINKING_TEXT: &str = "Sema is reading the documents";

/// Transient "thinking" line shown while a question is pending
#[derive(Debug, Clone)]
pub struct ThinkingIndicator {
    active_since: Option<Instant>,
}

impl ThinkingIndicator {
    pub fn new() -> Self {
        Self { active_since: None }
    }

    pub fn start(&mut self) {
        self.active_since = Some(Instant::now());
    }

    pub fn stop(&mut self) {
        self.active_since = None;
    }

    pub fn is_active(&self) -> bool {
        self.active_since.is_some()
    }

    fn dots(&self) -> &'static str {
        let elapsed = self
            .active_since
            .map(|since| since.elapsed().as_millis())
            .unwrap_or_default();
        match (elapsed / 300) % 4 {
            0 => ".",
            1 => "..",
            2 => "...",
            _ => "   ",
        }
    }
}

impl Default for ThinkingIndicator {
    fn default() -> Self {
        Self::new()
    }
}

impl Widget for &ThinkingIndicator {
    fn render(self, area: Rect, buf: &mut Buffer) {
        if !self.is_active() || area.height == 0 {
            return;
        }

        let line = Line::from(vec![
            Span::styled("● ", Style::default().fg(Color::Green)),
            Span::styled(THINKING_TEXT, Style::default().fg(Color::Green)),
            Span::styled(self.dots(), Style::default().fg(Color::Yellow)),
        ]);
        buf.set_line(area.x, area.y, &line, area.width);
    }
}
