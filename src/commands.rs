use crate::api::ChatApi;
use crate::config::Config;
use crate::controller::ConversationController;
use crate::events::ChatMessage;
use crate::ui::conversation::history::BUDGET_BREAKDOWN;
use anyhow::{bail, Result};
use std::io::Write;

/// Ask a single question and print the answer with its citations
pub async fn ask(api: &dyn ChatApi, question: &str, send_history: bool) -> Result<()> {
    let mut controller = ConversationController::new(send_history);
    if !controller.ask(question, api).await {
        bail!("Question is empty");
    }

    if let Some(answer) = controller.messages().last() {
        let mut stdout = std::io::stdout().lock();
        write_answer(&mut stdout, answer)?;
    }
    Ok(())
}

/// Probe the service and print its status
pub async fn health(api: &dyn ChatApi, url: &str) -> Result<()> {
    match api.health().await {
        Ok(status) => {
            println!("✅ {} is {}", url, status.status);
            Ok(())
        }
        Err(err) => bail!("❌ {} is not responding: {}", url, err),
    }
}

/// Create the config file with defaults if needed and print it
pub fn show_config(config: &Config) -> Result<()> {
    let mut stdout = std::io::stdout().lock();
    write_config(&mut stdout, config)
}

/// Print the stored config file, then any overrides active for this run.
///
/// Only the file layer is ever written; env and CLI overrides stay transient.
pub fn write_config(out: &mut impl Write, effective: &Config) -> Result<()> {
    let path = effective.config_path();
    let mut stored = Config::load_from(&path)?;
    stored.sema_home = effective.sema_home.clone();

    if !path.exists() {
        stored.save()?;
        writeln!(out, "📝 Created {}", path.display())?;
    } else {
        writeln!(out, "📍 {}", path.display())?;
    }
    writeln!(out)?;
    write!(out, "{}", toml::to_string_pretty(&stored)?)?;

    if stored.api.base_url.trim_end_matches('/') != effective.api.base_url {
        writeln!(out)?;
        writeln!(out, "🔀 base_url for this run: {}", effective.api.base_url)?;
    }
    Ok(())
}

/// Plain-text rendering of an answer for the terminal
pub fn write_answer(out: &mut impl Write, message: &ChatMessage) -> std::io::Result<()> {
    writeln!(out, "{}", message.content())?;

    let sources = message.citations();
    if !sources.is_empty() {
        writeln!(out)?;
        writeln!(out, "📚 Sources:")?;
        for (i, source) in sources.iter().enumerate() {
            writeln!(out, "  {}. {}", i + 1, source.chip_label())?;
            if let Some(url) = &source.url {
                writeln!(out, "     {}", url)?;
            }
            writeln!(
                out,
                "     Agency: {} | Published: {} | File size: {}",
                source.agency.as_deref().unwrap_or("Unknown"),
                source.publish_date.as_deref().unwrap_or("N/A"),
                source.file_size.as_deref().unwrap_or("N/A"),
            )?;
        }
        writeln!(out)?;
        writeln!(out, "  \"{}\"", sources[0].text)?;
    }

    if message.mentions_budget() {
        writeln!(out)?;
        writeln!(out, "💰 Budget Breakdown:")?;
        for (label, percent) in BUDGET_BREAKDOWN {
            writeln!(out, "  {:<20} {:>3}%", label, percent)?;
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::{ApiError, ChatResponse};
    use crate::controller::tests::StubApi;
    use crate::controller::FALLBACK_REPLY;
    use crate::events::Source;

    fn render(message: &ChatMessage) -> String {
        let mut out = Vec::new();
        write_answer(&mut out, message).unwrap();
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn answer_lists_sources_with_defaults() {
        let message = ChatMessage::assistant(
            "Tenders were awarded.",
            Some(vec![Source {
                title: "Tender Notice".into(),
                page: 4,
                text: "Road works lot 2".into(),
                url: Some("http://localhost:8000/pdfs/tender.pdf".into()),
                ..Default::default()
            }]),
        );
        let text = render(&message);
        assert!(text.starts_with("Tenders were awarded.\n"));
        assert!(text.contains("1. Tender Notice p.4"));
        assert!(text.contains("http://localhost:8000/pdfs/tender.pdf"));
        assert!(text.contains("Agency: Unknown | Published: N/A | File size: N/A"));
        assert!(text.contains("\"Road works lot 2\""));
        assert!(!text.contains("Budget Breakdown"));
    }

    #[test]
    fn budget_answers_include_breakdown() {
        let text = render(&ChatMessage::assistant("The budget grew.", None));
        assert!(text.contains("Budget Breakdown"));
        assert!(text.contains("Healthcare"));
        assert!(!text.contains("Sources"));
    }

    #[test]
    fn config_file_keeps_defaults_under_url_override() {
        let dir = tempfile::tempdir().unwrap();
        let mut effective = Config::default();
        effective.sema_home = dir.path().to_path_buf();
        effective.set_base_url("http://temporary-override:9999");

        let mut out = Vec::new();
        write_config(&mut out, &effective).unwrap();
        let printed = String::from_utf8(out).unwrap();

        let saved = std::fs::read_to_string(effective.config_path()).unwrap();
        assert!(saved.contains("base_url = \"http://localhost:8000\""));
        assert!(!saved.contains("temporary-override"));
        assert!(printed.contains("📝 Created"));
        assert!(printed.contains("base_url for this run: http://temporary-override:9999"));
    }

    #[test]
    fn existing_config_file_is_not_rewritten() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[api]\nbase_url = \"https://sema.example.org/\"\n").unwrap();

        let mut effective = Config::load_from(&path).unwrap();
        effective.set_base_url("http://temporary-override:9999");

        let mut out = Vec::new();
        write_config(&mut out, &effective).unwrap();
        let printed = String::from_utf8(out).unwrap();

        let saved = std::fs::read_to_string(&path).unwrap();
        assert_eq!(saved, "[api]\nbase_url = \"https://sema.example.org/\"\n");
        assert!(printed.starts_with("📍"));
        assert!(printed.contains("https://sema.example.org/"));
        assert!(printed.contains("base_url for this run: http://temporary-override:9999"));
    }

    #[tokio::test]
    async fn blank_question_is_an_error() {
        let api = StubApi::answering(ChatResponse { answer: "X".into(), sources: None });
        assert!(ask(&api, "  ", false).await.is_err());
    }

    #[tokio::test]
    async fn failed_exchange_still_prints_fallback() {
        let api = StubApi::failing(ApiError::Malformed("eof".into()));
        let mut controller = ConversationController::new(false);
        controller.ask("q", &api).await;
        let text = render(controller.messages().last().unwrap());
        assert_eq!(text, format!("{}\n", FALLBACK_REPLY));
    }

    #[tokio::test]
    async fn health_reports_status() {
        let api = StubApi::answering(ChatResponse { answer: "X".into(), sources: None });
        assert!(health(&api, "http://localhost:8000/health").await.is_ok());
    }
}
