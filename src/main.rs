//! # News Cluster
//!
//! Turns a list of article URLs into one summarized "cluster" record. Each
//! URL is handed to an LLM agent that can fetch pages through a content
//! extraction tool; the agent's free-form answers are parsed with layered
//! fallbacks, summarized together, and assembled into a single JSON record.
//!
//! ## Usage
//!
//! ```sh
//! OPENROUTER_API_KEY=... news_cluster https://example.com/a https://example.org/b
//! news_cluster -c ./config.yaml -j ./json --cluster-id cluster-42 https://example.com/a
//! ```
//!
//! ## Architecture
//!
//! The application follows a pipeline architecture:
//! 1. **Resolving**: Two agent round-trips per URL, sequentially, parsed into a `Source`
//! 2. **Aggregating**: Every URL's recovered content is concatenated
//! 3. **Summarizing**: One agent call produces the cluster title and summary
//! 4. **Formatting**: Sources are ordered newest first and the cluster id is assigned
//! 5. **Output**: The `{ success, data | error }` envelope is written as JSON

use std::error::Error;
use std::sync::Arc;

use clap::Parser;
use tracing::{debug, error, info, instrument};
use tracing_subscriber::{EnvFilter, fmt as tfmt};

mod api;
mod cli;
mod config;
mod dates;
mod error;
mod extractor;
mod formatter;
mod models;
mod outputs;
mod pipeline;
mod resolver;
mod summarizer;
mod tools;
mod utils;

use api::NewsAgent;
use cli::Cli;
use config::AgentConfig;
use dates::{Clock, SystemClock};
use extractor::ContentExtractor;
use models::ProcessNewsResponse;
use outputs::json;
use pipeline::ClusterPipeline;
use tools::{Toolbox, WebSearch};
use utils::ensure_writable_dir;

#[tokio::main]
#[instrument]
async fn main() -> Result<(), Box<dyn Error>> {
    // --- Tracing init ---
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tfmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_file(false)
        .with_line_number(false)
        .with_writer(std::io::stderr)
        .with_timer(tracing_subscriber::fmt::time::UtcTime::rfc_3339())
        .init();

    let start_time = std::time::Instant::now();
    info!("news_cluster starting up");

    let args = Cli::parse();
    debug!(urls = ?args.urls, cluster_id = ?args.cluster_id, "Parsed CLI arguments");

    // ---- Config ----
    let config = AgentConfig::load(args.config.as_deref()).await?.merge_cli(&args);
    info!(model = %config.model, api_base = %config.api_base, max_tool_steps = config.max_tool_steps, "Loaded configuration");

    if let Some(dir) = &args.json_output_dir {
        if let Err(e) = ensure_writable_dir(dir).await {
            error!(path = %dir, error = %e, "JSON output directory is not writable");
            return Err(e);
        }
    }

    // ---- Wire up the agent ----
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let http = reqwest::Client::new();
    let extractor = ContentExtractor::new(http.clone(), Arc::clone(&clock));
    let search = config
        .exa_api_key
        .clone()
        .map(|key| WebSearch::new(http.clone(), key));
    let agent = NewsAgent::new(http, config, Toolbox::new(extractor, search))?;
    let pipeline = ClusterPipeline::new(agent, Arc::clone(&clock));

    // ---- Run ----
    let result = pipeline
        .process_urls(&args.urls, args.cluster_id.as_deref(), &mut rand::rng())
        .await;
    let (response, failure) = match result {
        Ok(cluster) => (ProcessNewsResponse::ok(cluster), None),
        Err(e) => {
            error!(error = %e, "Pipeline failed");
            (ProcessNewsResponse::failed(e.to_string()), Some(e))
        }
    };

    // ---- Output ----
    match &args.json_output_dir {
        Some(dir) => {
            json::write_response(&response, dir, clock.now().timestamp_millis()).await?;
        }
        None => println!("{}", json::to_pretty_json(&response)?),
    }

    let elapsed = start_time.elapsed();
    info!(
        ?elapsed,
        secs = elapsed.as_secs(),
        millis = elapsed.subsec_millis(),
        success = response.success,
        "Execution complete"
    );

    match failure {
        Some(e) => Err(e.into()),
        None => Ok(()),
    }
}
