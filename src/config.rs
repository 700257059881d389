//! Agent configuration loaded from YAML and overridden from the CLI.
//!
//! ```yaml
//! api_base: https://openrouter.ai/api/v1
//! api_key: sk-or-...
//! model: xiaomi/mimo-v2-flash:free
//! max_tool_steps: 10
//! temperature: 0.2
//! exa_api_key: ...
//! ```
//!
//! Every key is optional in the file. Values given on the command line or
//! through the environment win over the file.

use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use crate::cli::Cli;
use crate::error::ConfigError;

pub const DEFAULT_API_BASE: &str = "https://openrouter.ai/api/v1";
pub const DEFAULT_MODEL: &str = "xiaomi/mimo-v2-flash:free";
pub const DEFAULT_MAX_TOOL_STEPS: usize = 10;

/// Settings for the tool-loop news agent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentConfig {
    /// Base URL of an OpenAI-compatible chat completions API.
    pub api_base: String,
    pub api_key: Option<String>,
    pub model: String,
    /// Upper bound on model calls per `generate`, tool turns included.
    pub max_tool_steps: usize,
    pub max_tokens: Option<u32>,
    pub temperature: Option<f32>,
    /// Enables the `webSearch` tool when present.
    pub exa_api_key: Option<String>,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            api_base: DEFAULT_API_BASE.to_string(),
            api_key: None,
            model: DEFAULT_MODEL.to_string(),
            max_tool_steps: DEFAULT_MAX_TOOL_STEPS,
            max_tokens: None,
            temperature: None,
            exa_api_key: None,
        }
    }
}

impl AgentConfig {
    /// Parse a YAML document.
    pub fn from_yaml(yaml: &str, path: &str) -> Result<Self, ConfigError> {
        serde_yaml::from_str(yaml).map_err(|source| ConfigError::Yaml {
            path: path.to_string(),
            source,
        })
    }

    /// Load from `path`, or start from defaults when no path is given.
    #[instrument(level = "info")]
    pub async fn load(path: Option<&str>) -> Result<Self, ConfigError> {
        let Some(path) = path else {
            debug!("No config file given; using defaults");
            return Ok(Self::default());
        };
        let yaml = tokio::fs::read_to_string(path)
            .await
            .map_err(|source| ConfigError::Io {
                path: path.to_string(),
                source,
            })?;
        Self::from_yaml(&yaml, path)
    }

    /// Apply command-line and environment overrides.
    pub fn merge_cli(mut self, cli: &Cli) -> Self {
        if let Some(key) = &cli.api_key {
            self.api_key = Some(key.clone());
        }
        if let Some(model) = &cli.model {
            self.model = model.clone();
        }
        if let Some(base) = &cli.api_base {
            self.api_base = base.clone();
        }
        if let Some(key) = &cli.exa_api_key {
            self.exa_api_key = Some(key.clone());
        }
        self
    }

    /// The API key, which must be set before the agent can run.
    pub fn require_api_key(&self) -> Result<&str, ConfigError> {
        self.api_key
            .as_deref()
            .filter(|k| !k.trim().is_empty())
            .ok_or(ConfigError::MissingApiKey)
    }
}
