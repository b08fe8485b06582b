//! Conversation history display component

use crate::events::{ChatMessage, ChatRole, Source};
use ratatui::{
    buffer::Buffer,
    layout::Rect,
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Widget},
};

/// Fixed illustrative allocation shown next to budget questions and answers
pub const BUDGET_BREAKDOWN: [(&str, u16); 4] = [
    ("Healthcare", 42),
    ("Infrastructure", 28),
    ("Education", 18),
    ("Water & Sanitation", 12),
];

const WELCOME: &str = "Welcome to Sema-Data. Ask about budgets, tenders, or gazettes. \
I will cite sources so you can verify every claim.";

/// Citation shown with the welcome text so chips and preview are visible on first launch
fn sample_citation() -> Source {
    Source {
        title: "Kenya Gazette Vol. CXXVI".to_string(),
        page: 18,
        text: "Sample reference snippet for transparency.".to_string(),
        url: Some("http://localhost:8000/pdfs/kenya-gazette-vol-cxxvi.pdf".to_string()),
        thumbnail_url: Some("http://localhost:8000/thumbnails/kenya-gazette-vol-cxxvi.png".to_string()),
        agency: Some("Kenya Gazette Office".to_string()),
        publish_date: Some("2024-01-18".to_string()),
        file_size: Some("3.2 MB".to_string()),
    }
}

/// Display switches for message rendering
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RenderOptions {
    pub show_details: bool,
    pub show_timestamps: bool,
}

/// Scroll state for the history panel
#[derive(Debug, Clone, Default)]
pub struct ConversationHistory {
    /// Lines scrolled up from the newest content
    scroll_from_bottom: usize,
    /// Largest offset seen at the last render
    max_offset: usize,
    last_page: usize,
}

impl ConversationHistory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn scroll_up(&mut self) {
        self.scroll_from_bottom = (self.scroll_from_bottom + self.page_step()).min(self.max_offset);
    }

    pub fn scroll_down(&mut self) {
        self.scroll_from_bottom = self.scroll_from_bottom.saturating_sub(self.page_step());
    }

    pub fn scroll_to_bottom(&mut self) {
        self.scroll_from_bottom = 0;
    }

    pub fn scroll_offset(&self) -> usize {
        self.scroll_from_bottom
    }

    /// Remember the visible height so paging moves by a screenful
    pub fn set_page_height(&mut self, height: u16) {
        self.last_page = height as usize;
    }

    fn page_step(&self) -> usize {
        self.last_page.saturating_sub(2).max(1)
    }

    pub fn view<'a>(&'a mut self, messages: &'a [ChatMessage], options: RenderOptions) -> HistoryView<'a> {
        HistoryView {
            history: self,
            messages,
            options,
        }
    }
}

/// Renderable snapshot of the history panel
pub struct HistoryView<'a> {
    history: &'a mut ConversationHistory,
    messages: &'a [ChatMessage],
    options: RenderOptions,
}

impl Widget for HistoryView<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let block = Block::default()
            .borders(Borders::ALL)
            .title("Sema-Data Assistant · Investigative Chat");

        let inner_area = block.inner(area);
        block.render(area, buf);

        let all_lines: Vec<Line<'static>> = if self.messages.is_empty() {
            welcome_lines(inner_area.width, self.options)
        } else {
            let mut lines = Vec::new();
            for message in self.messages {
                lines.extend(message_lines(message, inner_area.width, self.options));
                lines.push(Line::from(""));
            }
            lines
        };

        // Bottom-anchored, shifted up by the scroll offset
        let height = inner_area.height as usize;
        let total = all_lines.len();
        let max_offset = total.saturating_sub(height);
        let history = self.history;
        let offset = history.scroll_from_bottom.min(max_offset);
        history.max_offset = max_offset;
        history.scroll_from_bottom = offset;
        let end = total - offset;
        let start = end.saturating_sub(height);

        for (i, line) in all_lines[start..end].iter().enumerate() {
            buf.set_line(inner_area.x, inner_area.y + i as u16, line, inner_area.width);
        }
    }
}

fn welcome_lines(width: u16, options: RenderOptions) -> Vec<Line<'static>> {
    let mut lines = vec![Line::from(Span::styled(
        "SEMA-DATA",
        Style::default().fg(Color::Green).add_modifier(Modifier::BOLD),
    ))];
    for text in wrap_text(WELCOME, width as usize) {
        lines.push(Line::from(Span::styled(text, Style::default().fg(Color::Gray))));
    }

    let sample = [sample_citation()];
    let text_width = width.saturating_sub(2) as usize;
    lines.push(Line::from(""));
    lines.extend(citation_lines(&sample, text_width));
    if options.show_details {
        lines.extend(source_detail_lines(&sample[0]));
    }
    lines.extend(preview_lines(&sample[0], text_width));
    lines.push(Line::from(""));
    lines.push(Line::from(Span::styled(
        "Press Enter to send, F1-F4 for quick queries, /help for commands.",
        Style::default().fg(Color::DarkGray),
    )));
    lines
}

/// Render a single message into lines
pub fn message_lines(message: &ChatMessage, width: u16, options: RenderOptions) -> Vec<Line<'static>> {
    let mut lines = Vec::new();
    let text_width = width.saturating_sub(2) as usize;

    let mut header = vec![Span::styled(
        message.role().display_name(),
        role_style(message.role()).add_modifier(Modifier::BOLD),
    )];
    if options.show_timestamps {
        header.push(Span::styled(
            format!(" {}", message.timestamp().format("%H:%M:%S")),
            Style::default().fg(Color::DarkGray),
        ));
    }
    lines.push(Line::from(header));

    for content_line in wrap_text(message.content(), text_width) {
        lines.push(Line::from(vec![
            Span::raw("  "),
            Span::styled(content_line, role_style(message.role())),
        ]));
    }

    let sources = message.citations();
    if message.role() == ChatRole::Assistant && !sources.is_empty() {
        lines.push(Line::from(""));
        lines.extend(citation_lines(sources, text_width));
        if options.show_details {
            for source in sources {
                lines.extend(source_detail_lines(source));
            }
        }
        lines.extend(preview_lines(&sources[0], text_width));
    }

    if message.mentions_budget() {
        lines.push(Line::from(""));
        lines.extend(budget_breakdown_lines(text_width));
    }

    lines
}

/// Citation chips, wrapped to the available width
fn citation_lines(sources: &[Source], width: usize) -> Vec<Line<'static>> {
    let chip_style = Style::default().fg(Color::Cyan);
    let mut lines = Vec::new();
    let mut current: Vec<Span<'static>> = vec![Span::raw("  ")];
    let mut used = 2;

    for source in sources {
        let chip = format!("[{}]", source.chip_label());
        let chip_width = chip.chars().count() + 1;
        if used + chip_width > width && current.len() > 1 {
            lines.push(Line::from(std::mem::replace(&mut current, vec![Span::raw("  ")])));
            used = 2;
        }
        current.push(Span::styled(chip, chip_style));
        current.push(Span::raw(" "));
        used += chip_width;
    }
    lines.push(Line::from(current));

    for source in sources.iter().filter(|s| s.url.is_some()) {
        if let Some(url) = &source.url {
            lines.push(Line::from(vec![
                Span::raw("    "),
                Span::styled(format!("{} ↗ ", source.title), Style::default().fg(Color::DarkGray)),
                Span::styled(url.clone(), Style::default().fg(Color::Blue).add_modifier(Modifier::UNDERLINED)),
            ]));
        }
    }

    lines
}

/// Expanded "Source Details" card for one citation
fn source_detail_lines(source: &Source) -> Vec<Line<'static>> {
    let label = Style::default().fg(Color::Green);
    let value = Style::default().fg(Color::White);
    let field = |name: &str, v: Option<&String>, missing: &str| {
        Line::from(vec![
            Span::styled(format!("      {}: ", name), label),
            Span::styled(v.cloned().unwrap_or_else(|| missing.to_string()), value),
        ])
    };

    vec![
        Line::from(vec![
            Span::styled("    Source Details ", label.add_modifier(Modifier::BOLD)),
            Span::styled(source.chip_label(), Style::default().fg(Color::Cyan)),
        ]),
        field("Agency", source.agency.as_ref(), "Unknown"),
        field("Published", source.publish_date.as_ref(), "N/A"),
        field("File size", source.file_size.as_ref(), "N/A"),
    ]
}

/// Preview pane for the first source: thumbnail reference (or placeholder) plus snippet
fn preview_lines(source: &Source, width: usize) -> Vec<Line<'static>> {
    let frame = Style::default().fg(Color::DarkGray);
    let mut lines = vec![Line::from(Span::styled("  ┌ Preview", frame))];

    match &source.thumbnail_url {
        Some(thumbnail) => lines.push(Line::from(vec![
            Span::styled("  │ ", frame),
            Span::styled("[thumbnail] ", Style::default().fg(Color::Green)),
            Span::styled(thumbnail.clone(), Style::default().fg(Color::Blue)),
        ])),
        None => lines.push(Line::from(vec![
            Span::styled("  │ ", frame),
            Span::styled("PDF Preview", Style::default().fg(Color::Green).add_modifier(Modifier::BOLD)),
        ])),
    }

    for snippet in wrap_text(&source.text, width.saturating_sub(4)) {
        lines.push(Line::from(vec![
            Span::styled("  │ ", frame),
            Span::styled(snippet, Style::default().fg(Color::Gray)),
        ]));
    }
    lines.push(Line::from(Span::styled("  └", frame)));
    lines
}

/// Decorative budget bars
pub fn budget_breakdown_lines(width: usize) -> Vec<Line<'static>> {
    const LABEL_WIDTH: usize = 20;
    let bar_width = width.saturating_sub(LABEL_WIDTH + 8).clamp(10, 40);

    let mut lines = vec![Line::from(Span::styled(
        "  BUDGET BREAKDOWN",
        Style::default().fg(Color::Green).add_modifier(Modifier::BOLD),
    ))];

    for (label, percent) in BUDGET_BREAKDOWN {
        let filled = bar_width * percent as usize / 100;
        lines.push(Line::from(vec![
            Span::styled(format!("  {:<width$}", label, width = LABEL_WIDTH), Style::default().fg(Color::Gray)),
            Span::styled("█".repeat(filled), Style::default().fg(Color::Green)),
            Span::styled("░".repeat(bar_width - filled), Style::default().fg(Color::DarkGray)),
            Span::styled(format!(" {:>3}%", percent), Style::default().fg(Color::DarkGray)),
        ]));
    }

    lines
}

fn role_style(role: ChatRole) -> Style {
    match role {
        ChatRole::User => Style::default().fg(Color::Green),
        ChatRole::Assistant => Style::default().fg(Color::White),
    }
}

/// Wrap text to fit within the given width, keeping explicit line breaks.
///
/// Whitespace runs are kept as typed except where a line break replaces them;
/// words wider than the line are split across lines.
pub fn wrap_text(text: &str, width: usize) -> Vec<String> {
    if width == 0 {
        return vec![text.to_string()];
    }

    let mut lines = Vec::new();
    for paragraph in text.split('\n') {
        let mut current_line = String::new();
        let mut current_width = 0;

        for run in whitespace_runs(paragraph) {
            let run_width = run.chars().count();
            if current_width + run_width <= width {
                current_line.push_str(run);
                current_width += run_width;
                continue;
            }

            if run.starts_with(char::is_whitespace) {
                lines.push(std::mem::take(&mut current_line));
                current_width = 0;
                continue;
            }

            if current_width > 0 {
                let trimmed = current_line.trim_end().len();
                current_line.truncate(trimmed);
                lines.push(std::mem::take(&mut current_line));
                current_width = 0;
            }

            let chars: Vec<char> = run.chars().collect();
            let mut chunks = chars.chunks(width).peekable();
            while let Some(chunk) = chunks.next() {
                if chunks.peek().is_some() {
                    lines.push(chunk.iter().collect());
                } else {
                    current_line = chunk.iter().collect();
                    current_width = chunk.len();
                }
            }
        }

        lines.push(current_line);
    }

    lines
}

/// Split text into alternating runs of whitespace and non-whitespace
fn whitespace_runs(text: &str) -> Vec<&str> {
    let mut runs = Vec::new();
    let mut start = 0;
    let mut in_space = None;

    for (index, c) in text.char_indices() {
        let is_space = c.is_whitespace();
        if in_space.is_some_and(|previous| previous != is_space) {
            runs.push(&text[start..index]);
            start = index;
        }
        in_space = Some(is_space);
    }
    if start < text.len() {
        runs.push(&text[start..]);
    }

    runs
}

#[cfg(test)]
mod tests {
    use super::*;

    fn plain(lines: &[Line<'_>]) -> String {
        lines
            .iter()
            .map(|line| line.spans.iter().map(|s| s.content.as_ref()).collect::<String>())
            .collect::<Vec<_>>()
            .join("\n")
    }

    fn gazette() -> Source {
        Source {
            title: "Kenya Gazette Vol. CXXVI".into(),
            page: 18,
            text: "Sample reference snippet for transparency.".into(),
            url: Some("http://localhost:8000/pdfs/kenya-gazette-vol-cxxvi.pdf".into()),
            thumbnail_url: Some("http://localhost:8000/thumbnails/kenya-gazette-vol-cxxvi.png".into()),
            agency: Some("Kenya Gazette Office".into()),
            publish_date: Some("2024-01-18".into()),
            file_size: Some("3.2 MB".into()),
        }
    }

    fn bare(title: &str, page: i64, text: &str) -> Source {
        Source {
            title: title.into(),
            page,
            text: text.into(),
            ..Default::default()
        }
    }

    fn screen_rows(view: HistoryView<'_>, width: u16, height: u16) -> Vec<String> {
        let area = Rect::new(0, 0, width, height);
        let mut buf = Buffer::empty(area);
        view.render(area, &mut buf);
        (0..height)
            .map(|y| (0..width).map(|x| buf.get(x, y).symbol()).collect::<String>())
            .collect()
    }

    #[test]
    fn wrap_text_respects_width_and_newlines() {
        assert_eq!(wrap_text("one two three", 7), vec!["one two", "three"]);
        assert_eq!(wrap_text("one two three", 8), vec!["one two", "three"]);
        assert_eq!(wrap_text("a\nb", 10), vec!["a", "b"]);
        assert_eq!(wrap_text("", 10), vec![""]);
    }

    #[test]
    fn wrap_text_keeps_whitespace_runs() {
        assert_eq!(wrap_text("  tenders in   Mombasa  ", 40), vec!["  tenders in   Mombasa  "]);
    }

    #[test]
    fn wrap_text_splits_words_wider_than_line() {
        assert_eq!(wrap_text("see abcdefghij", 4), vec!["see", "abcd", "efgh", "ij"]);
        assert_eq!(wrap_text("abcdef gh", 3), vec!["abc", "def", "gh"]);
    }

    #[test]
    fn long_url_is_fully_visible_in_narrow_panel() {
        let url = "http://localhost:8000/pdfs/kenya-gazette-vol-cxxvi-supplement-2024.pdf";
        let messages = vec![ChatMessage::user(format!("See {}", url))];
        let mut history = ConversationHistory::new();

        let rows = screen_rows(history.view(&messages, RenderOptions::default()), 40, 10);
        let visible: String = rows
            .iter()
            .map(|row| row.chars().skip(3).take(36).collect::<String>().trim_end().to_string())
            .collect();
        assert!(visible.contains(url), "rows: {:?}", rows);
    }

    #[test]
    fn empty_panel_shows_sample_citation() {
        let mut history = ConversationHistory::new();
        let rows = screen_rows(history.view(&[], RenderOptions::default()), 120, 20).join("\n");
        assert!(rows.contains("Welcome to Sema-Data"));
        assert!(rows.contains("[Kenya Gazette Vol. CXXVI p.18]"));
        assert!(rows.contains("Sample reference snippet for transparency."));
        assert!(!rows.contains("Source Details"));
    }

    #[test]
    fn content_renders_as_plain_text() {
        let msg = ChatMessage::user("Show road tenders");
        let text = plain(&message_lines(&msg, 80, RenderOptions::default()));
        assert!(text.contains("You"));
        assert!(text.contains("Show road tenders"));
        assert!(!text.contains("Preview"));
    }

    #[test]
    fn citations_show_chips_and_first_snippet() {
        let msg = ChatMessage::assistant(
            "Tenders were awarded in March.",
            Some(vec![bare("Tender Notice", 4, "Road works lot 2"), bare("Audit", 9, "second snippet")]),
        );
        let text = plain(&message_lines(&msg, 80, RenderOptions::default()));
        assert!(text.contains("[Tender Notice p.4]"));
        assert!(text.contains("[Audit p.9]"));
        assert!(text.contains("PDF Preview"));
        assert!(text.contains("Road works lot 2"));
        assert!(!text.contains("second snippet"));
        assert!(!text.contains("Source Details"));
    }

    #[test]
    fn thumbnail_replaces_placeholder() {
        let msg = ChatMessage::assistant("See gazette.", Some(vec![gazette()]));
        let text = plain(&message_lines(&msg, 120, RenderOptions::default()));
        assert!(text.contains("[thumbnail] http://localhost:8000/thumbnails/kenya-gazette-vol-cxxvi.png"));
        assert!(!text.contains("PDF Preview"));
        assert!(text.contains("http://localhost:8000/pdfs/kenya-gazette-vol-cxxvi.pdf"));
    }

    #[test]
    fn details_fill_missing_fields() {
        let msg = ChatMessage::assistant("x", Some(vec![gazette(), bare("Memo", 1, "t")]));
        let options = RenderOptions { show_details: true, show_timestamps: false };
        let text = plain(&message_lines(&msg, 120, options));
        assert!(text.contains("Agency: Kenya Gazette Office"));
        assert!(text.contains("Published: 2024-01-18"));
        assert!(text.contains("File size: 3.2 MB"));
        assert!(text.contains("Agency: Unknown"));
        assert!(text.contains("Published: N/A"));
        assert!(text.contains("File size: N/A"));
    }

    #[test]
    fn empty_sources_render_no_citations() {
        let msg = ChatMessage::assistant("Nothing found.", Some(Vec::new()));
        let text = plain(&message_lines(&msg, 80, RenderOptions::default()));
        assert!(!text.contains("Preview"));
        assert!(!text.contains('['));
    }

    #[test]
    fn budget_breakdown_follows_content() {
        let with = ChatMessage::user("What is the healthcare Budget?");
        let text = plain(&message_lines(&with, 80, RenderOptions::default()));
        assert!(text.contains("BUDGET BREAKDOWN"));
        for (label, percent) in BUDGET_BREAKDOWN {
            assert!(text.contains(label));
            assert!(text.contains(&format!("{}%", percent)));
        }

        let without = ChatMessage::assistant("Tenders were awarded.", None);
        let text = plain(&message_lines(&without, 80, RenderOptions::default()));
        assert!(!text.contains("BUDGET BREAKDOWN"));
    }

    fn long_conversation() -> Vec<ChatMessage> {
        // Each message renders as header, content and a spacer line
        (0..30).map(|i| ChatMessage::user(format!("question {}", i))).collect()
    }

    #[test]
    fn scrolling_is_clamped_at_bottom() {
        let messages = long_conversation();
        let mut history = ConversationHistory::new();
        history.set_page_height(10);
        screen_rows(history.view(&messages, RenderOptions::default()), 40, 12);

        history.scroll_up();
        assert_eq!(history.scroll_offset(), 8);
        history.scroll_down();
        history.scroll_down();
        assert_eq!(history.scroll_offset(), 0);
    }

    #[test]
    fn scrolling_is_clamped_at_top() {
        let messages = long_conversation();
        let mut history = ConversationHistory::new();
        history.set_page_height(10);
        screen_rows(history.view(&messages, RenderOptions::default()), 40, 12);

        for _ in 0..50 {
            history.scroll_up();
        }
        assert_eq!(history.scroll_offset(), 80);

        history.scroll_down();
        assert_eq!(history.scroll_offset(), 72);
        let rows = screen_rows(history.view(&messages, RenderOptions::default()), 40, 12);
        assert!(!rows.iter().any(|row| row.contains("question 0 ")));
    }
}
