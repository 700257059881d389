//! Data models for resolved articles and the clusters built from them.
//!
//! This module defines the records that flow through the pipeline:
//! - [`ExtractedContent`]: What the content extractor pulls out of a fetched page
//! - [`Source`]: Per-article metadata inside a cluster
//! - [`Cluster`]: The aggregate record returned for one set of URLs
//! - [`ProcessNewsResponse`]: The success/failure envelope written by the CLI
//!
//! Wire names are camelCase to match the JSON consumers expect, so serde
//! renames are applied at the struct level instead of on every field.

use serde::{Deserialize, Serialize};

/// Title used when an extractor fetch fails.
pub const EXTRACT_ERROR_TITLE: &str = "Error extracting content";
/// Source label used when nothing better can be derived.
pub const UNKNOWN_SOURCE: &str = "Unknown";
/// Title used for a URL whose gateway round-trip failed outright.
pub const LOAD_ERROR_TITLE: &str = "Error loading article";
/// Title used when no title could be recovered.
pub const UNTITLED: &str = "Untitled";

/// The best-effort record pulled out of a single fetched page.
///
/// Produced by the content extractor and handed to the gateway as the
/// result of its `extractUrlContent` tool. It is never stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtractedContent {
    /// The URL that was fetched.
    pub url: String,
    /// Text of the first `<title>` tag, or `"Untitled"`.
    pub title: String,
    /// Host of the URL with any leading `www.` removed.
    pub source: String,
    /// Publication date as found in the page, or the fetch time.
    pub pub_date: String,
    /// Markup-stripped, whitespace-collapsed body text.
    pub content: String,
}

impl ExtractedContent {
    /// Whether this record describes a failed fetch.
    ///
    /// # Returns
    ///
    /// `true` when the title is the extraction-error sentinel and the
    /// content carries the `Error:` message.
    pub fn is_error(&self) -> bool {
        self.title == EXTRACT_ERROR_TITLE && self.content.starts_with("Error:")
    }
}

/// Per-article metadata inside a [`Cluster`].
///
/// Exactly one `Source` exists per input URL, even when every step for
/// that URL failed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Source {
    /// Site or publisher label.
    pub source: String,
    /// Article headline.
    pub title: String,
    /// The input URL this record was resolved from.
    pub url: String,
    /// Publication date, normally RFC 2822 formatted.
    pub pub_date: String,
}

/// A set of related articles with a unified title and summary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Cluster {
    /// Opaque identifier, caller supplied or minted per run.
    pub cluster_id: String,
    /// Headline for the whole cluster.
    pub title: String,
    /// Cross-article synthesis.
    pub summary: String,
    /// Always equal to `sources.len()`.
    pub article_count: usize,
    /// ISO 8601 form of the newest source date.
    pub latest_date: String,
    /// Sources, newest first.
    pub sources: Vec<Source>,
}

/// Envelope written by the CLI for every run.
///
/// Exactly one of `data` and `error` is present; the absent one is
/// omitted from the JSON rather than written as `null`.
#[derive(Debug, Serialize, Deserialize)]
pub struct ProcessNewsResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Cluster>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ProcessNewsResponse {
    /// Successful envelope carrying `cluster` as `data`.
    pub fn ok(cluster: Cluster) -> Self {
        Self {
            success: true,
            data: Some(cluster),
            error: None,
        }
    }

    /// Failed envelope.
    ///
    /// # Arguments
    ///
    /// * `message` - Human-readable reason, serialized as `error`
    ///
    /// # Returns
    ///
    /// An envelope with `success: false` and no `data` field.
    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(message.into()),
        }
    }
}
