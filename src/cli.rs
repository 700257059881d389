//! Command-line interface definitions for News Cluster.
//!
//! This module defines the CLI arguments and options using the `clap` crate.
//! Credentials and model selection can also come from environment variables.

use clap::Parser;
use url::Url;

/// Command-line arguments for the News Cluster application.
///
/// # Examples
///
/// ```sh
/// # Cluster two articles, print the result to stdout
/// news_cluster https://example.com/a https://example.org/b
///
/// # Reuse an existing cluster id and write the JSON to a directory
/// news_cluster --cluster-id cluster-42 -j ./json https://example.com/a
///
/// # Agent settings from a YAML file
/// news_cluster -c ./config.yaml https://example.com/a
/// ```
#[derive(Parser, Debug)]
#[command(author, version, about)]
pub struct Cli {
    /// Article URLs to resolve into one cluster
    #[arg(required = true, num_args = 1.., value_parser = parse_article_url)]
    pub urls: Vec<String>,

    /// Existing cluster identifier to reuse (a new one is minted when absent or empty)
    #[arg(long, value_parser = parse_cluster_id)]
    pub cluster_id: Option<String>,

    /// Optional path to config.yaml file
    #[arg(short, long)]
    pub config: Option<String>,

    /// Output directory for the JSON response (stdout when absent)
    #[arg(short, long)]
    pub json_output_dir: Option<String>,

    /// API key for the OpenAI-compatible model endpoint
    #[arg(long, env = "OPENROUTER_API_KEY", hide_env_values = true)]
    pub api_key: Option<String>,

    /// Model identifier to request
    #[arg(long, env = "NEWS_CLUSTER_MODEL")]
    pub model: Option<String>,

    /// Base URL of the chat completions API
    #[arg(long, env = "NEWS_CLUSTER_API_BASE")]
    pub api_base: Option<String>,

    /// Exa API key; enables the web search tool
    #[arg(long, env = "EXA_API_KEY", hide_env_values = true)]
    pub exa_api_key: Option<String>,
}

/// Accept only absolute `http`/`https` URLs.
fn parse_article_url(raw: &str) -> Result<String, String> {
    let url = Url::parse(raw).map_err(|e| format!("invalid URL '{raw}': {e}"))?;
    match url.scheme() {
        "http" | "https" => Ok(raw.to_string()),
        other => Err(format!("unsupported URL scheme '{other}' in '{raw}'")),
    }
}

/// Reject ids that would act as a path once used as the output file name.
fn parse_cluster_id(raw: &str) -> Result<String, String> {
    if raw.contains(['/', '\\']) {
        return Err(format!("cluster id '{raw}' must not contain path separators"));
    }
    Ok(raw.to_string())
}
