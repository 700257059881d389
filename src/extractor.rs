//! Content extraction for a single article URL.
//!
//! One GET per URL, no retries. The page is reduced to a best-effort
//! [`ExtractedContent`]: the `<title>` text, a publication date from the
//! usual meta tags, the host as source label, and the visible text with
//! markup stripped.
//!
//! # Date Sources
//!
//! Checked in order, first hit wins:
//! 1. `<meta property="article:published_time" content="...">`
//! 2. `<meta name="pubdate" content="...">`
//! 3. `<time datetime="...">`
//!
//! Failures never escape [`ContentExtractor::extract`]; they are encoded
//! as an error-flagged record instead.

use std::sync::Arc;

use once_cell::sync::Lazy;
use regex::Regex;
use reqwest::Client;
use scraper::{Html, Selector};
use tracing::{debug, info, instrument, warn};

use crate::dates::{self, Clock};
use crate::models::{EXTRACT_ERROR_TITLE, ExtractedContent, UNKNOWN_SOURCE, UNTITLED};
use crate::utils::{host_without_www, truncate_chars};

/// Maximum number of characters of body text kept per page.
pub const MAX_CONTENT_CHARS: usize = 5000;

static SCRIPT_BLOCK: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?is)<script[^>]*>.*?</script>").expect("valid script regex"));
static STYLE_BLOCK: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?is)<style[^>]*>.*?</style>").expect("valid style regex"));
static ANY_TAG: Lazy<Regex> = Lazy::new(|| Regex::new(r"<[^>]+>").expect("valid tag regex"));
static WHITESPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("valid whitespace regex"));

static TITLE: Lazy<Selector> = Lazy::new(|| Selector::parse("title").expect("valid selector"));
static DATE_SELECTORS: Lazy<Vec<(Selector, &'static str)>> = Lazy::new(|| {
    [
        (r#"meta[property="article:published_time"]"#, "content"),
        (r#"meta[name="pubdate"]"#, "content"),
        ("time[datetime]", "datetime"),
    ]
    .into_iter()
    .map(|(css, attr)| (Selector::parse(css).expect("valid selector"), attr))
    .collect()
});

/// Fetches article pages and reduces them to [`ExtractedContent`].
#[derive(Clone)]
pub struct ContentExtractor {
    client: Client,
    clock: Arc<dyn Clock>,
}

impl std::fmt::Debug for ContentExtractor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ContentExtractor").finish_non_exhaustive()
    }
}

impl ContentExtractor {
    pub fn new(client: Client, clock: Arc<dyn Clock>) -> Self {
        Self { client, clock }
    }

    /// Fetch `url` once and extract what can be found.
    ///
    /// Never fails. A transport or body-read error yields a record titled
    /// `"Error extracting content"` whose content starts with `"Error:"`.
    #[instrument(level = "info", skip(self))]
    pub async fn extract(&self, url: &str) -> ExtractedContent {
        match self.fetch(url).await {
            Ok(html) => {
                let record = parse_page(url, &html, self.clock.as_ref());
                info!(
                    title = %record.title,
                    source = %record.source,
                    chars = record.content.chars().count(),
                    "Extracted page content"
                );
                record
            }
            Err(e) => {
                warn!(error = %e, "Content fetch failed");
                ExtractedContent {
                    url: url.to_string(),
                    title: EXTRACT_ERROR_TITLE.to_string(),
                    source: UNKNOWN_SOURCE.to_string(),
                    pub_date: dates::iso(self.clock.now()),
                    content: format!("Error: {e}"),
                }
            }
        }
    }

    async fn fetch(&self, url: &str) -> Result<String, reqwest::Error> {
        let response = self.client.get(url).send().await?;
        debug!(status = %response.status(), "Fetched page");
        response.text().await
    }
}

/// Build an [`ExtractedContent`] from an already-fetched page.
pub fn parse_page(url: &str, html: &str, clock: &dyn Clock) -> ExtractedContent {
    let document = Html::parse_document(html);

    let title = document
        .select(&TITLE)
        .next()
        .map(|el| el.text().collect::<String>().trim().to_string())
        .filter(|t| !t.is_empty())
        .unwrap_or_else(|| UNTITLED.to_string());

    let pub_date = DATE_SELECTORS
        .iter()
        .find_map(|(selector, attr)| {
            document
                .select(selector)
                .next()
                .and_then(|el| el.value().attr(attr))
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        })
        .unwrap_or_else(|| dates::iso(clock.now()));

    let source = host_without_www(url).unwrap_or_else(|| UNKNOWN_SOURCE.to_string());

    ExtractedContent {
        url: url.to_string(),
        title,
        source,
        pub_date,
        content: strip_markup(html),
    }
}

/// Drop scripts and styles, strip tags, collapse whitespace, cap the length.
pub fn strip_markup(html: &str) -> String {
    let text = SCRIPT_BLOCK.replace_all(html, "");
    let text = STYLE_BLOCK.replace_all(&text, "");
    let text = ANY_TAG.replace_all(&text, " ");
    let text = WHITESPACE.replace_all(&text, " ");
    truncate_chars(text.trim(), MAX_CONTENT_CHARS).to_string()
}
