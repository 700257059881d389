//! Text-intelligence gateway: the trait the pipeline talks to, and the
//! OpenAI-compatible tool-loop agent that implements it.
//!
//! # Architecture
//!
//! - [`Gateway`]: prompt in, free-form text out. The pipeline assumes
//!   nothing about the shape of the text.
//! - [`NewsAgent`]: chat-completions client that lets the model call the
//!   tools in [`Toolbox`] for a bounded number of steps.
//!
//! # Agent Loop
//!
//! ```text
//! user prompt ─▶ model ─┬─ tool_calls ─▶ run tools ─▶ append results ─▶ model ...
//!                       └─ text ─▶ done
//! ```
//!
//! The loop stops at the first turn without tool calls, or after
//! `max_tool_steps` model calls, whichever comes first. There is no retry.

use std::time::Instant;

use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tracing::{debug, error, info, instrument, warn};

use crate::config::AgentConfig;
use crate::error::{ConfigError, GatewayError};
use crate::tools::Toolbox;
use crate::utils::truncate_for_log;

/// Anything that turns a natural-language prompt into natural-language text.
pub trait Gateway {
    /// Send `prompt` and return the final text answer.
    ///
    /// # Arguments
    ///
    /// * `prompt` - The user message, sent as-is
    ///
    /// # Returns
    ///
    /// Free-form text. Callers must not assume any structure in it.
    ///
    /// # Errors
    ///
    /// Returns a [`GatewayError`] when the backing model cannot be reached
    /// or answers with something other than a completion.
    async fn generate(&self, prompt: &str) -> Result<String, GatewayError>;
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: &'a [Value],
    tools: &'a [Value],
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: AssistantMessage,
}

#[derive(Debug, Deserialize)]
struct AssistantMessage {
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    tool_calls: Option<Vec<ToolCall>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct ToolCall {
    id: String,
    #[serde(rename = "type", default = "function_kind")]
    kind: String,
    function: FunctionCall,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct FunctionCall {
    name: String,
    #[serde(default)]
    arguments: Value,
}

impl FunctionCall {
    /// Arguments as a JSON string, whichever form the provider sent.
    fn arguments_json(&self) -> String {
        match &self.arguments {
            Value::String(s) => s.clone(),
            Value::Null => "{}".to_string(),
            other => other.to_string(),
        }
    }
}

fn function_kind() -> String {
    "function".to_string()
}

/// Tool-calling chat agent backed by an OpenAI-compatible endpoint.
#[derive(Debug)]
pub struct NewsAgent {
    client: Client,
    config: AgentConfig,
    api_key: String,
    toolbox: Toolbox,
}

impl NewsAgent {
    /// Build an agent from a merged configuration.
    ///
    /// # Arguments
    ///
    /// * `client` - Shared HTTP client, also used by the tools
    /// * `config` - Endpoint, model and loop settings
    /// * `toolbox` - Tools offered to the model on every turn
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::MissingApiKey`] if `config` has no usable API key.
    pub fn new(client: Client, config: AgentConfig, toolbox: Toolbox) -> Result<Self, ConfigError> {
        let api_key = config.require_api_key()?.to_string();
        Ok(Self {
            client,
            config,
            api_key,
            toolbox,
        })
    }

    fn completions_url(&self) -> String {
        format!("{}/chat/completions", self.config.api_base.trim_end_matches('/'))
    }

    async fn complete(&self, messages: &[Value], tools: &[Value]) -> Result<AssistantMessage, GatewayError> {
        let request = ChatRequest {
            model: &self.config.model,
            messages,
            tools,
            max_tokens: self.config.max_tokens,
            temperature: self.config.temperature,
        };

        let response = self
            .client
            .post(self.completions_url())
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(GatewayError::Status {
                status: status.as_u16(),
                body: truncate_for_log(&body, 500),
            });
        }

        let parsed: ChatResponse = serde_json::from_str(&body)?;
        parsed
            .choices
            .into_iter()
            .next()
            .map(|c| c.message)
            .ok_or_else(|| GatewayError::MalformedResponse("response has no choices".to_string()))
    }
}

impl Gateway for NewsAgent {
    /// Run the tool loop for one prompt.
    ///
    /// Each model turn that requests tools has them executed, and their
    /// JSON results are appended as `tool` messages before the next turn.
    ///
    /// # Returns
    ///
    /// The text of the first turn without tool calls. If `max_tool_steps`
    /// turns all request tools, the last turn's text (possibly empty) is
    /// returned and a warning is logged.
    ///
    /// # Errors
    ///
    /// - [`GatewayError::Http`] on transport failure
    /// - [`GatewayError::Status`] when the endpoint answers with a non-success status
    /// - [`GatewayError::Json`] when the body is not a completion payload
    /// - [`GatewayError::MalformedResponse`] when the payload has no choices
    #[instrument(level = "info", skip_all, fields(model = %self.config.model))]
    async fn generate(&self, prompt: &str) -> Result<String, GatewayError> {
        let t0 = Instant::now();
        let tools = self.toolbox.definitions();
        let max_steps = self.config.max_tool_steps.max(1);
        let mut messages = vec![json!({ "role": "user", "content": prompt })];
        let mut last_text = String::new();

        for step in 1..=max_steps {
            let message = match self.complete(&messages, &tools).await {
                Ok(m) => m,
                Err(e) => {
                    error!(step, elapsed_ms = t0.elapsed().as_millis() as u64, error = %e, "Model call failed");
                    return Err(e);
                }
            };

            let text = message.content.clone().unwrap_or_default();
            let calls = message.tool_calls.unwrap_or_default();
            if calls.is_empty() {
                info!(
                    step,
                    elapsed_ms = t0.elapsed().as_millis() as u64,
                    response_preview = %truncate_for_log(&text, 200),
                    "Agent finished"
                );
                return Ok(text);
            }

            messages.push(json!({
                "role": "assistant",
                "content": message.content,
                "tool_calls": calls,
            }));
            for call in &calls {
                debug!(step, tool = %call.function.name, id = %call.id, "Agent calling tool");
                let output = self
                    .toolbox
                    .call(&call.function.name, &call.function.arguments_json())
                    .await;
                messages.push(json!({
                    "role": "tool",
                    "tool_call_id": call.id,
                    "content": output,
                }));
            }
            last_text = text;
        }

        warn!(
            max_steps,
            elapsed_ms = t0.elapsed().as_millis() as u64,
            "Agent hit its step limit; returning last text"
        );
        Ok(last_text)
    }
}
