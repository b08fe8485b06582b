use crate::controller::InputBuffer;
use crate::ui::conversation::commands::{command_entries, parse_slash_command, CommandEntry, ParsedCommand};
use crossterm::event::{KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use ratatui::{
    buffer::Buffer,
    layout::Rect,
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Widget},
};

/// Canned questions bound to F1-F4
pub const QUICK_QUERIES: [&str; 4] = [
    "Analyze Nairobi County Budget 2024",
    "Summarize recent road procurement tenders",
    "List education grants in Nakuru",
    "Show new housing levy regulations",
];

const PLACEHOLDER: &str = "Ask a transparency question";

/// Result returned when the user interacts with the composer
#[derive(Debug, PartialEq)]
pub enum ComposerResult {
    /// Enter pressed on a question; the text is still in the input buffer
    Submit,
    Command(ParsedCommand),
    None,
}

/// Key handling and command palette for the input box.
///
/// The text itself lives in the controller's [`InputBuffer`].
pub struct ConversationComposer {
    has_focus: bool,
    command_entries: Vec<CommandEntry>,
    filtered_commands: Vec<CommandEntry>,
    show_command_palette: bool,
    selected_command: Option<usize>,
}

impl ConversationComposer {
    pub fn new() -> Self {
        Self {
            has_focus: true,
            command_entries: command_entries(),
            filtered_commands: Vec::new(),
            show_command_palette: false,
            selected_command: None,
        }
    }

    /// Handle key input; `enabled` is false while a response is pending
    pub fn handle_key(&mut self, key: KeyEvent, input: &mut InputBuffer, enabled: bool) -> ComposerResult {
        if key.kind != KeyEventKind::Press || !enabled {
            return ComposerResult::None;
        }

        match key.code {
            KeyCode::Enter => {
                if self.show_command_palette && self.apply_selected_command(input) {
                    return ComposerResult::None;
                }
                if input.as_str().trim().is_empty() {
                    return ComposerResult::None;
                }
                self.close_command_palette();
                if let Some(command) = parse_slash_command(input.as_str()) {
                    input.clear();
                    return ComposerResult::Command(command);
                }
                return ComposerResult::Submit;
            }
            KeyCode::Up if self.show_command_palette => self.move_command_selection(-1),
            KeyCode::Down if self.show_command_palette => self.move_command_selection(1),
            KeyCode::Esc if self.show_command_palette => self.close_command_palette(),
            KeyCode::Tab if self.show_command_palette => {
                self.apply_selected_command(input);
            }
            KeyCode::F(n @ 1..=4) => {
                input.set(QUICK_QUERIES[usize::from(n) - 1]);
                self.close_command_palette();
            }
            KeyCode::Char(c) if !key.modifiers.contains(KeyModifiers::CONTROL) => {
                input.insert(c);
                self.sync_command_palette(input);
            }
            KeyCode::Backspace => {
                if input.backspace() {
                    self.sync_command_palette(input);
                }
            }
            KeyCode::Delete => {
                if input.delete() {
                    self.sync_command_palette(input);
                }
            }
            KeyCode::Left => input.move_left(),
            KeyCode::Right => input.move_right(),
            KeyCode::Home => input.move_home(),
            KeyCode::End => input.move_end(),
            _ => {}
        }

        ComposerResult::None
    }

    /// Insert pasted text at the cursor
    pub fn handle_paste(&mut self, text: &str, input: &mut InputBuffer, enabled: bool) {
        if enabled {
            input.insert_str(text);
            self.sync_command_palette(input);
        }
    }

    pub fn is_palette_open(&self) -> bool {
        self.show_command_palette
    }

    fn sync_command_palette(&mut self, input: &InputBuffer) {
        let content = input.as_str();
        let typing_command = content.starts_with('/') && !content.contains(char::is_whitespace);

        if typing_command {
            if !self.show_command_palette {
                self.show_command_palette = true;
                self.selected_command = Some(0);
            }
            self.refresh_command_palette(content);
        } else {
            self.close_command_palette();
        }
    }

    fn close_command_palette(&mut self) {
        self.show_command_palette = false;
        self.filtered_commands.clear();
        self.selected_command = None;
    }

    fn refresh_command_palette(&mut self, content: &str) {
        let query = content.trim_start_matches('/').to_lowercase();
        self.filtered_commands = self
            .command_entries
            .iter()
            .filter(|entry| query.is_empty() || entry.keyword.starts_with(&query))
            .copied()
            .collect();

        if self.filtered_commands.is_empty() {
            self.selected_command = None;
        } else {
            let index = self.selected_command.unwrap_or(0);
            self.selected_command = Some(index.min(self.filtered_commands.len() - 1));
        }
    }

    fn move_command_selection(&mut self, delta: isize) {
        if self.filtered_commands.is_empty() {
            self.selected_command = None;
            return;
        }

        let len = self.filtered_commands.len() as isize;
        let current = self.selected_command.unwrap_or(0) as isize;
        self.selected_command = Some((current + delta).rem_euclid(len) as usize);
    }

    fn apply_selected_command(&mut self, input: &mut InputBuffer) -> bool {
        let Some(entry) = self
            .selected_command
            .and_then(|index| self.filtered_commands.get(index))
            .copied()
        else {
            return false;
        };

        let completed = format!("/{}", entry.keyword);
        self.close_command_palette();
        if input.as_str() == completed {
            return false;
        }
        input.set(completed);
        true
    }

    /// Borrow the composer together with the state it draws
    pub fn view<'a>(&'a self, input: &'a InputBuffer, busy: bool) -> ComposerView<'a> {
        ComposerView {
            composer: self,
            input,
            busy,
        }
    }
}

impl Default for ConversationComposer {
    fn default() -> Self {
        Self::new()
    }
}

/// Renderable snapshot of the input box
pub struct ComposerView<'a> {
    composer: &'a ConversationComposer,
    input: &'a InputBuffer,
    busy: bool,
}

impl Widget for ComposerView<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let composer = self.composer;
        let title = if self.busy {
            "Ask Sema (waiting for answer)"
        } else {
            "Ask Sema - Enter to send, / for commands, F1-F4 quick queries"
        };

        let border_style = if self.busy {
            Style::default().fg(Color::DarkGray)
        } else if composer.has_focus {
            Style::default().fg(Color::Green)
        } else {
            Style::default().fg(Color::Gray)
        };

        let block = Block::default()
            .borders(Borders::ALL)
            .title(title)
            .style(border_style);

        let inner_area = block.inner(area);
        block.render(area, buf);

        if self.input.is_empty() {
            let placeholder_line = Line::from(vec![
                Span::styled("● ", Style::default().fg(Color::Green)),
                Span::styled(PLACEHOLDER, Style::default().fg(Color::DarkGray)),
            ]);
            buf.set_line(inner_area.x, inner_area.y, &placeholder_line, inner_area.width);
        } else {
            let mut content: Vec<char> = self.input.as_str().chars().collect();
            if composer.has_focus && !self.busy {
                content.insert(self.input.cursor().min(content.len()), '▌');
            }
            let text: String = content.into_iter().collect();
            let style = if self.busy {
                Style::default().fg(Color::DarkGray)
            } else {
                Style::default()
            };
            let line = Line::from(vec![Span::styled(text, style)]);
            buf.set_line(inner_area.x, inner_area.y, &line, inner_area.width);
        }

        if composer.show_command_palette && !composer.filtered_commands.is_empty() {
            let palette_height = (composer.filtered_commands.len().min(5) + 2) as u16;
            let palette_area = Rect {
                x: area.x,
                y: area.y.saturating_sub(palette_height),
                width: area.width,
                height: palette_height.min(area.y),
            };
            if palette_area.height < 3 {
                return;
            }

            let block = Block::default()
                .borders(Borders::ALL)
                .title("Commands")
                .style(Style::default().fg(Color::Blue));
            let inner = block.inner(palette_area);
            block.render(palette_area, buf);

            for (index, entry) in composer.filtered_commands.iter().enumerate() {
                if index >= inner.height as usize {
                    break;
                }

                let style = if composer.selected_command == Some(index) {
                    Style::default().fg(Color::Black).bg(Color::Cyan).add_modifier(Modifier::BOLD)
                } else {
                    Style::default().fg(Color::White)
                };

                let line = Line::from(vec![
                    Span::styled(format!("/{}", entry.keyword), style),
                    Span::styled("  ", Style::default()),
                    Span::styled(entry.description, Style::default().fg(Color::Gray)),
                ]);
                buf.set_line(inner.x, inner.y + index as u16, &line, inner.width);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ui::conversation::commands::SlashCommand;

    fn press(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    fn type_text(composer: &mut ConversationComposer, input: &mut InputBuffer, text: &str) {
        for c in text.chars() {
            composer.handle_key(press(KeyCode::Char(c)), input, true);
        }
    }

    #[test]
    fn enter_on_question_requests_submit() {
        let mut composer = ConversationComposer::new();
        let mut input = InputBuffer::default();
        type_text(&mut composer, &mut input, "budget?");

        assert_eq!(composer.handle_key(press(KeyCode::Enter), &mut input, true), ComposerResult::Submit);
        assert_eq!(input.as_str(), "budget?");
    }

    #[test]
    fn enter_on_blank_input_does_nothing() {
        let mut composer = ConversationComposer::new();
        let mut input = InputBuffer::default();
        type_text(&mut composer, &mut input, "   ");
        assert_eq!(composer.handle_key(press(KeyCode::Enter), &mut input, true), ComposerResult::None);
    }

    #[test]
    fn disabled_composer_ignores_typing() {
        let mut composer = ConversationComposer::new();
        let mut input = InputBuffer::default();
        composer.handle_key(press(KeyCode::Char('x')), &mut input, false);
        composer.handle_key(press(KeyCode::F(1)), &mut input, false);
        composer.handle_paste("pasted", &mut input, false);
        assert!(input.is_empty());
    }

    #[test]
    fn slash_opens_palette_and_enter_applies_selection() {
        let mut composer = ConversationComposer::new();
        let mut input = InputBuffer::default();
        type_text(&mut composer, &mut input, "/cl");
        assert!(composer.is_palette_open());

        assert_eq!(composer.handle_key(press(KeyCode::Enter), &mut input, true), ComposerResult::None);
        assert_eq!(input.as_str(), "/clear");
        assert!(!composer.is_palette_open());

        match composer.handle_key(press(KeyCode::Enter), &mut input, true) {
            ComposerResult::Command(parsed) => assert_eq!(parsed.command, SlashCommand::Clear),
            other => panic!("expected command, got {:?}", other),
        }
        assert!(input.is_empty());
    }

    #[test]
    fn palette_selection_wraps() {
        let mut composer = ConversationComposer::new();
        let mut input = InputBuffer::default();
        type_text(&mut composer, &mut input, "/");
        composer.handle_key(press(KeyCode::Up), &mut input, true);
        composer.handle_key(press(KeyCode::Tab), &mut input, true);
        assert_eq!(input.as_str(), "/quit");
    }

    #[test]
    fn function_keys_fill_quick_queries() {
        let mut composer = ConversationComposer::new();
        let mut input = InputBuffer::default();
        composer.handle_key(press(KeyCode::F(2)), &mut input, true);
        assert_eq!(input.as_str(), QUICK_QUERIES[1]);
        assert_eq!(input.cursor(), QUICK_QUERIES[1].chars().count());
    }

    #[test]
    fn control_chords_are_not_typed() {
        let mut composer = ConversationComposer::new();
        let mut input = InputBuffer::default();
        composer.handle_key(KeyEvent::new(KeyCode::Char('d'), KeyModifiers::CONTROL), &mut input, true);
        assert!(input.is_empty());
    }
}
