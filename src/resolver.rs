//! Per-URL resolution: two gateway round-trips and a tiered parser.
//!
//! For each URL the gateway is asked to (1) extract and describe the
//! article, then (2) restate that description as a JSON object. The
//! second answer is parsed with decreasing expectations:
//!
//! | Outcome | When | Title from | Content contributed |
//! |---------|------|------------|---------------------|
//! | [`Resolution::Structured`] | a balanced `{...}` decodes | the JSON, else `"Untitled"` | JSON `content`, else the first answer |
//! | [`Resolution::Heuristic`] | no balanced `{...}` in the answer | patterns over the second answer | the second answer |
//! | [`Resolution::RawFallback`] | a `{...}` is found but does not decode | patterns over the first answer | the first answer |
//! | [`Resolution::Errored`] | either gateway call fails | `"Error loading article"` | nothing |
//!
//! Every variant carries exactly one [`Source`], so a batch always has one
//! record per input URL.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Deserialize;
use tracing::{debug, info, instrument, warn};

use crate::api::Gateway;
use crate::dates::{self, Clock};
use crate::error::GatewayError;
use crate::models::{LOAD_ERROR_TITLE, Source, UNTITLED};
use crate::utils::{looks_truncated, source_from_url, truncate_for_log};

static QUOTED_TITLE_KEY: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?i)title["']?\s*:\s*["']?([^"'\n]+)"#).expect("valid title-key regex")
});
static HTML_TITLE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)<title[^>]*>([^<]+)</title>").expect("valid html-title regex"));
static MARKDOWN_HEADING: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?m)^#\s+(.+)$").expect("valid heading regex"));

/// How a URL was resolved, with the record it produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    Structured { source: Source, contribution: String },
    Heuristic { source: Source, contribution: String },
    RawFallback { source: Source, contribution: String },
    Errored { source: Source, error: String },
}

impl Resolution {
    pub fn source(&self) -> &Source {
        match self {
            Resolution::Structured { source, .. }
            | Resolution::Heuristic { source, .. }
            | Resolution::RawFallback { source, .. }
            | Resolution::Errored { source, .. } => source,
        }
    }

    pub fn into_source(self) -> Source {
        match self {
            Resolution::Structured { source, .. }
            | Resolution::Heuristic { source, .. }
            | Resolution::RawFallback { source, .. }
            | Resolution::Errored { source, .. } => source,
        }
    }

    /// Text block this URL adds to the summary prompt, if any.
    pub fn contribution(&self) -> Option<&str> {
        match self {
            Resolution::Structured { contribution, .. }
            | Resolution::Heuristic { contribution, .. }
            | Resolution::RawFallback { contribution, .. } => Some(contribution.as_str()),
            Resolution::Errored { .. } => None,
        }
    }

    /// Title recovered for this URL; `None` when resolution failed.
    pub fn title(&self) -> Option<&str> {
        match self {
            Resolution::Errored { .. } => None,
            other => Some(other.source().title.as_str()),
        }
    }

    pub fn tier(&self) -> &'static str {
        match self {
            Resolution::Structured { .. } => "structured",
            Resolution::Heuristic { .. } => "heuristic",
            Resolution::RawFallback { .. } => "raw_fallback",
            Resolution::Errored { .. } => "errored",
        }
    }
}

/// Shape the gateway is asked to reply with in the second round-trip.
#[derive(Debug, Deserialize)]
struct ReportedArticle {
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    source: Option<String>,
    #[serde(default, rename = "pubDate")]
    pub_date: Option<String>,
    #[serde(default)]
    content: Option<String>,
}

/// Resolves URLs one at a time through a [`Gateway`].
pub struct Resolver<'a, G> {
    gateway: &'a G,
    clock: &'a dyn Clock,
}

impl<'a, G: Gateway> Resolver<'a, G> {
    pub fn new(gateway: &'a G, clock: &'a dyn Clock) -> Self {
        Self { gateway, clock }
    }

    /// Resolve one URL. Never fails; failures become [`Resolution::Errored`].
    #[instrument(level = "info", skip(self))]
    pub async fn resolve(&self, url: &str) -> Resolution {
        let resolution = match self.round_trip(url).await {
            Ok((described, reformatted)) => interpret(url, &described, &reformatted, self.clock),
            Err(e) => {
                warn!(error = %e, "Gateway call failed; emitting sentinel source");
                Resolution::Errored {
                    source: Source {
                        source: source_from_url(url),
                        title: LOAD_ERROR_TITLE.to_string(),
                        url: url.to_string(),
                        pub_date: dates::rfc2822(self.clock.now()),
                    },
                    error: e.to_string(),
                }
            }
        };
        info!(tier = resolution.tier(), title = %resolution.source().title, "Resolved URL");
        resolution
    }

    async fn round_trip(&self, url: &str) -> Result<(String, String), GatewayError> {
        let described = self.gateway.generate(&extract_prompt(url)).await?;
        debug!(response_preview = %truncate_for_log(&described, 300), "Extraction answer");
        let reformatted = self.gateway.generate(&reformat_prompt(&described, url)).await?;
        debug!(response_preview = %truncate_for_log(&reformatted, 300), "Reformat answer");
        Ok((described, reformatted))
    }
}

/// First prompt: have the agent run its extraction tool on `url`.
pub fn extract_prompt(url: &str) -> String {
    format!(
        r#"Use the extractUrlContent tool to get content from: {url}. Then analyze the content and extract:
- Article title
- Source name (from URL or content)
- Publication date (in RFC 2822 format like "Mon, 12 Jan 2026 08:33:14 +0000")
- Main article content

Return the information in a structured format."#
    )
}

/// Second prompt: restate the first answer as a JSON object.
pub fn reformat_prompt(described: &str, url: &str) -> String {
    format!(
        r#"Parse the following agent response and extract structured data. Return JSON format:
{{
  "title": "article title",
  "source": "source name",
  "pubDate": "RFC 2822 date format",
  "content": "main content summary"
}}

Agent response:
{described}

Original URL: {url}"#
    )
}

/// Turn the two gateway answers for `url` into a [`Resolution`].
pub fn interpret(url: &str, described: &str, reformatted: &str, clock: &dyn Clock) -> Resolution {
    let Some(object) = find_json_object(reformatted) else {
        let title = title_from_text(reformatted).unwrap_or_else(|| UNTITLED.to_string());
        return Resolution::Heuristic {
            source: fallback_source(url, title, clock),
            contribution: format!("URL: {url}\nContent: {reformatted}"),
        };
    };

    match serde_json::from_str::<ReportedArticle>(object) {
        Ok(reported) => {
            let title = non_empty(reported.title).unwrap_or_else(|| UNTITLED.to_string());
            let source = non_empty(reported.source).unwrap_or_else(|| source_from_url(url));
            let pub_date =
                non_empty(reported.pub_date).unwrap_or_else(|| dates::rfc2822(clock.now()));
            let content = non_empty(reported.content).unwrap_or_else(|| described.to_string());
            Resolution::Structured {
                contribution: format!("Title: {title}\nSource: {source}\nContent: {content}"),
                source: Source {
                    source,
                    title,
                    url: url.to_string(),
                    pub_date,
                },
            }
        }
        Err(e) => {
            warn!(
                error = %e,
                truncated = looks_truncated(&e),
                object_preview = %truncate_for_log(object, 200),
                "Gateway JSON did not decode; falling back to first answer"
            );
            let title = title_from_text(described).unwrap_or_else(|| UNTITLED.to_string());
            Resolution::RawFallback {
                source: fallback_source(url, title, clock),
                contribution: format!("URL: {url}\nContent: {described}"),
            }
        }
    }
}

fn fallback_source(url: &str, title: String, clock: &dyn Clock) -> Source {
    Source {
        source: source_from_url(url),
        title,
        url: url.to_string(),
        pub_date: dates::rfc2822(clock.now()),
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// The first balanced `{...}` in `text`, ignoring braces inside JSON strings.
///
/// A `{` that never closes is skipped and the scan restarts at the next
/// `{`, so stray braces in prose do not hide a later object.
pub fn find_json_object(text: &str) -> Option<&str> {
    text.match_indices('{')
        .find_map(|(start, _)| balanced_object_at(text, start))
}

/// The balanced object opening at byte `start`, if it closes.
fn balanced_object_at(text: &str, start: usize) -> Option<&str> {
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (offset, c) in text[start..].char_indices() {
        if in_string {
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == '"' {
                in_string = false;
            }
            continue;
        }
        match c {
            '"' => in_string = true,
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(&text[start..start + offset + 1]);
                }
            }
            _ => {}
        }
    }
    None
}

/// Best guess at a title in free text.
///
/// Tried in order: a `title:` key (optionally quoted), an HTML `<title>`,
/// a leading `# ` markdown heading, then the first line if it is between
/// 11 and 199 characters long.
pub fn title_from_text(text: &str) -> Option<String> {
    let patterns: [&Regex; 3] = [&QUOTED_TITLE_KEY, &HTML_TITLE, &MARKDOWN_HEADING];
    for pattern in patterns {
        if let Some(found) = pattern
            .captures(text)
            .and_then(|caps| caps.get(1))
            .map(|m| m.as_str().trim())
            .filter(|t| !t.is_empty())
        {
            return Some(found.to_string());
        }
    }

    let first_line = text.split('\n').next()?.trim();
    let len = first_line.chars().count();
    (len > 10 && len < 200).then(|| first_line.to_string())
}
