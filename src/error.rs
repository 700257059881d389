//! Error types for the gateway, configuration and pipeline.
//!
//! Only failures that are allowed to leave their component get a type
//! here. Fetch and per-URL failures are folded into records instead.

use thiserror::Error;

/// Failure of a single text-intelligence gateway call.
#[derive(Debug, Error)]
pub enum GatewayError {
    /// Transport-level failure talking to the model endpoint.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The model endpoint answered with a non-success status.
    #[error("model endpoint returned {status}: {body}")]
    Status { status: u16, body: String },

    /// The completion payload did not have the expected shape.
    #[error("malformed completion response: {0}")]
    MalformedResponse(String),

    /// JSON encoding or decoding error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Failure while assembling the agent configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config file {path}: {source}")]
    Yaml {
        path: String,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("no API key configured (set OPENROUTER_API_KEY, --api-key, or api_key in the config file)")]
    MissingApiKey,
}

/// Failure of the pipeline as a whole.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// The cross-article summary call failed. This is not recovered.
    #[error("summary generation failed: {0}")]
    Summary(#[source] GatewayError),
}
