//! Cross-article summary and title selection.
//!
//! One gateway call over the concatenated per-URL contributions. The
//! answer is free text, so the summary and title are pulled out of it
//! with labeled-section heuristics:
//!
//! - **Summary**: text after `SUMMARY:` up to `TOPICS:`/`INSIGHTS:` or the end;
//!   else the first five non-empty lines joined with spaces (max 1000 chars);
//!   else the raw answer (max 1000 chars).
//! - **Title**: text after `TITLE:` up to the end of that line; else the
//!   caller's fallback.
//!
//! A failed gateway call is returned as an error; nothing here recovers it.

use itertools::Itertools;
use once_cell::sync::Lazy;
use regex::Regex;
use tracing::{info, instrument};

use crate::api::Gateway;
use crate::error::GatewayError;
use crate::utils::{truncate_chars, truncate_for_log};

/// Title used when neither the summary nor any article yields one.
pub const DEFAULT_CLUSTER_TITLE: &str = "News Cluster";

const MAX_SUMMARY_CHARS: usize = 1000;
const FALLBACK_SUMMARY_LINES: usize = 5;

static SUMMARY_SECTION: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?is)SUMMARY:\s*(.+?)(?:TOPICS:|INSIGHTS:|$)").expect("valid summary regex")
});
static TITLE_LINE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)TITLE:\s*(.+)").expect("valid title regex"));

/// Prompt asking for a synthesis of every article in `articles`.
pub fn summary_prompt(articles: &str) -> String {
    format!(
        r#"Analyze the following news articles and provide a comprehensive summary (2-3 paragraphs) covering the main points, themes, and key information from all articles.

Articles:
{articles}

Provide a well-structured summary that captures the essence of all the articles.
Start your answer with a line "TITLE: <headline for the whole set>", followed by "SUMMARY:" and the summary text."#
    )
}

/// Ask the gateway for the synthesis and split it into `(title, summary)`.
///
/// `fallback_title` is used when the answer carries no `TITLE:` label.
#[instrument(level = "info", skip_all, fields(chars = articles.chars().count()))]
pub async fn summarize<G: Gateway>(
    gateway: &G,
    articles: &str,
    fallback_title: &str,
) -> Result<(String, String), GatewayError> {
    let answer = gateway.generate(&summary_prompt(articles)).await?;
    let summary = extract_summary(&answer);
    let title = extract_title(&answer).unwrap_or_else(|| fallback_title.to_string());
    info!(
        %title,
        summary_preview = %truncate_for_log(&summary, 120),
        "Summary generated"
    );
    Ok((title, summary))
}

/// Summary body from a free-text answer.
pub fn extract_summary(text: &str) -> String {
    if let Some(section) = SUMMARY_SECTION
        .captures(text)
        .and_then(|caps| caps.get(1))
    {
        return section.as_str().trim().to_string();
    }

    let lines: Vec<&str> = text.split('\n').filter(|l| !l.trim().is_empty()).collect();
    if !lines.is_empty() {
        let joined = lines.into_iter().take(FALLBACK_SUMMARY_LINES).join(" ");
        return truncate_chars(&joined, MAX_SUMMARY_CHARS).to_string();
    }

    truncate_chars(text, MAX_SUMMARY_CHARS).to_string()
}

/// Title from a `TITLE:` label, if the answer has one.
pub fn extract_title(text: &str) -> Option<String> {
    TITLE_LINE
        .captures(text)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().trim().to_string())
        .filter(|t| !t.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::testing::{ScriptedGateway, failure};

    #[test]
    fn test_extract_summary_labeled_section() {
        let text = "TITLE: Rates\nSUMMARY: Banks held rates.\nMarkets calmed.\nTOPICS: finance";
        assert_eq!(extract_summary(text), "Banks held rates.\nMarkets calmed.");
    }

    #[test]
    fn test_extract_summary_is_case_insensitive_and_runs_to_end() {
        let text = "summary:   Everything went fine.  ";
        assert_eq!(extract_summary(text), "Everything went fine.");

        let text = "Summary: first part insights: the rest";
        assert_eq!(extract_summary(text), "first part");
    }

    #[test]
    fn test_extract_summary_first_five_lines() {
        let text = "one\n\ntwo\nthree\n  \nfour\nfive\nsix";
        assert_eq!(extract_summary(text), "one two three four five");
    }

    #[test]
    fn test_extract_summary_caps_length() {
        let text = "word ".repeat(400);
        assert_eq!(extract_summary(&text).chars().count(), MAX_SUMMARY_CHARS);
    }

    #[test]
    fn test_extract_summary_blank_answer() {
        assert_eq!(extract_summary("  \n \n"), "  \n \n");
    }

    #[test]
    fn test_extract_title() {
        assert_eq!(
            extract_title("intro\nTitle:  Storm Season Begins \nSUMMARY: x").as_deref(),
            Some("Storm Season Begins")
        );
        assert_eq!(extract_title("no label here"), None);
    }

    #[tokio::test]
    async fn test_summarize_uses_labels() {
        let gateway = ScriptedGateway::texts(["TITLE: Big Week\nSUMMARY: Lots happened."]);
        let (title, summary) = summarize(&gateway, "\n\nTitle: A\n", "A").await.unwrap();
        assert_eq!(title, "Big Week");
        assert_eq!(summary, "Lots happened.");
        assert!(gateway.prompts()[0].contains("Articles:\n\n\nTitle: A\n"));
    }

    #[tokio::test]
    async fn test_summarize_falls_back_to_article_title() {
        let gateway = ScriptedGateway::texts(["Plain prose summary."]);
        let (title, summary) = summarize(&gateway, "", "First Article").await.unwrap();
        assert_eq!(title, "First Article");
        assert_eq!(summary, "Plain prose summary.");
    }

    #[tokio::test]
    async fn test_summarize_propagates_failure() {
        let gateway = ScriptedGateway::new([failure("quota exceeded")]);
        let err = summarize(&gateway, "", DEFAULT_CLUSTER_TITLE).await.unwrap_err();
        assert!(err.to_string().contains("quota exceeded"));
    }
}
