//! Tools the news agent exposes to the model.
//!
//! | Tool | Arguments | Backed by |
//! |------|-----------|-----------|
//! | `extractUrlContent` | `{ "url": string }` | [`ContentExtractor`] |
//! | `webSearch` | `{ "query": string }` | Exa search API (only when a key is configured) |
//!
//! Tool results are always JSON strings. Failures are reported to the
//! model as `{"error": "..."}` rather than aborting the agent loop.

use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tracing::{info, instrument, warn};

use crate::extractor::ContentExtractor;
use crate::utils::truncate_chars;

pub const EXTRACT_URL_CONTENT: &str = "extractUrlContent";
pub const WEB_SEARCH: &str = "webSearch";

const EXA_SEARCH_URL: &str = "https://api.exa.ai/search";
const SEARCH_RESULTS: usize = 5;
const SEARCH_EXCERPT_CHARS: usize = 1000;

#[derive(Debug, Deserialize)]
struct ExtractArgs {
    url: String,
}

#[derive(Debug, Deserialize)]
struct SearchArgs {
    query: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ExaResponse {
    #[serde(default)]
    results: Vec<ExaResult>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ExaResult {
    #[serde(default)]
    title: Option<String>,
    url: String,
    #[serde(default)]
    published_date: Option<String>,
    #[serde(default)]
    text: Option<String>,
}

/// One search hit as handed back to the model.
#[derive(Debug, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SearchHit {
    pub title: String,
    pub url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub published_date: Option<String>,
    pub excerpt: String,
}

/// Thin client for the Exa web search endpoint.
#[derive(Debug, Clone)]
pub struct WebSearch {
    client: Client,
    api_key: String,
    endpoint: String,
}

impl WebSearch {
    pub fn new(client: Client, api_key: String) -> Self {
        Self::with_endpoint(client, api_key, EXA_SEARCH_URL.to_string())
    }

    pub fn with_endpoint(client: Client, api_key: String, endpoint: String) -> Self {
        Self {
            client,
            api_key,
            endpoint,
        }
    }

    #[instrument(level = "info", skip(self))]
    pub async fn search(&self, query: &str) -> Result<Vec<SearchHit>, reqwest::Error> {
        let body = json!({
            "query": query,
            "numResults": SEARCH_RESULTS,
            "contents": { "text": true },
        });
        let response: ExaResponse = self
            .client
            .post(&self.endpoint)
            .header("x-api-key", &self.api_key)
            .json(&body)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        let hits: Vec<SearchHit> = response
            .results
            .into_iter()
            .take(SEARCH_RESULTS)
            .map(|r| SearchHit {
                title: r.title.unwrap_or_default(),
                url: r.url,
                published_date: r.published_date,
                excerpt: truncate_chars(r.text.as_deref().unwrap_or_default(), SEARCH_EXCERPT_CHARS)
                    .to_string(),
            })
            .collect();
        info!(count = hits.len(), "Web search completed");
        Ok(hits)
    }
}

/// The set of tools available to one agent.
#[derive(Debug, Clone)]
pub struct Toolbox {
    extractor: ContentExtractor,
    search: Option<WebSearch>,
}

impl Toolbox {
    pub fn new(extractor: ContentExtractor, search: Option<WebSearch>) -> Self {
        Self { extractor, search }
    }

    /// OpenAI-style function definitions for every registered tool.
    pub fn definitions(&self) -> Vec<Value> {
        let mut tools = vec![json!({
            "type": "function",
            "function": {
                "name": EXTRACT_URL_CONTENT,
                "description": "Extract and analyze content from a specific URL. Use this to get article content, title, publication date, and source information.",
                "parameters": {
                    "type": "object",
                    "properties": {
                        "url": { "type": "string", "description": "The URL to extract content from" }
                    },
                    "required": ["url"]
                }
            }
        })];
        if self.search.is_some() {
            tools.push(json!({
                "type": "function",
                "function": {
                    "name": WEB_SEARCH,
                    "description": "Search the web for recent pages related to a query.",
                    "parameters": {
                        "type": "object",
                        "properties": {
                            "query": { "type": "string", "description": "The search query" }
                        },
                        "required": ["query"]
                    }
                }
            }));
        }
        tools
    }

    /// Run one tool call and return its JSON-encoded result.
    #[instrument(level = "info", skip(self, arguments))]
    pub async fn call(&self, name: &str, arguments: &str) -> String {
        let result = match name {
            EXTRACT_URL_CONTENT => match serde_json::from_str::<ExtractArgs>(arguments) {
                Ok(args) => {
                    let record = self.extractor.extract(&args.url).await;
                    if record.is_error() {
                        warn!(url = %args.url, "Extraction tool returned an error record");
                    }
                    serde_json::to_value(record).unwrap_or_else(|e| error_value(&e.to_string()))
                }
                Err(e) => error_value(&format!("invalid arguments: {e}")),
            },
            WEB_SEARCH => match (&self.search, serde_json::from_str::<SearchArgs>(arguments)) {
                (None, _) => error_value("web search is not configured"),
                (Some(_), Err(e)) => error_value(&format!("invalid arguments: {e}")),
                (Some(search), Ok(args)) => match search.search(&args.query).await {
                    Ok(hits) => json!({ "results": hits }),
                    Err(e) => {
                        warn!(error = %e, "Web search failed");
                        error_value(&e.to_string())
                    }
                },
            },
            other => {
                warn!(tool = other, "Model requested an unknown tool");
                error_value(&format!("unknown tool: {other}"))
            }
        };
        result.to_string()
    }
}

fn error_value(message: &str) -> Value {
    json!({ "error": message })
}
