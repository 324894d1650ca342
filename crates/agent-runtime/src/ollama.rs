//! Ollama LLM Provider
//!
//! Implementation of `LlmProvider` for local Ollama inference.
//!
//! Local models get no native function calling here. Tools are described in
//! the system message and the model proposes calls as JSON blocks fenced
//! with `tool`:
//!
//! ```text
//! {"tool": "query_price_history", "arguments": {"ticker": "AAPL", ...}}
//! ```
//!
//! Every block in a reply becomes one tool call; the prose around them is
//! kept as text parts.

use std::collections::HashMap;

use agent_core::{
    error::{AgentError, Result},
    message::{Content, Part, Role},
    provider::{GenerateRequest, GenerationOptions, LlmProvider},
    tool::{prompt_section, ToolCall},
};
use async_trait::async_trait;
use ollama_rs::{
    generation::chat::{request::ChatMessageRequest, ChatMessage, MessageRole},
    models::ModelOptions,
    Ollama,
};
use serde::Deserialize;

const FENCE_OPEN: &str = "```tool";
const FENCE_CLOSE: &str = "```";

/// Ollama provider configuration
#[derive(Clone, Debug)]
pub struct OllamaConfig {
    /// Ollama host URL
    pub host: String,

    /// Ollama port
    pub port: u16,

    /// Model to chat with
    pub model: String,
}

impl Default for OllamaConfig {
    fn default() -> Self {
        Self {
            host: "http://localhost".into(),
            port: 11434,
            model: "llama3.2".into(),
        }
    }
}

impl OllamaConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        let host = std::env::var("OLLAMA_HOST").unwrap_or(defaults.host);
        let port = std::env::var("OLLAMA_PORT")
            .ok()
            .and_then(|p| p.parse().ok())
            .unwrap_or(defaults.port);
        let model = std::env::var("OLLAMA_MODEL").unwrap_or(defaults.model);

        Self { host, port, model }
    }
}

/// Ollama LLM provider
pub struct OllamaProvider {
    client: Ollama,
    config: OllamaConfig,
}

impl OllamaProvider {
    /// Create a new Ollama provider with custom host/port
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self::from_config(OllamaConfig {
            host: host.into(),
            port,
            ..Default::default()
        })
    }

    /// Create from configuration
    pub fn from_config(config: OllamaConfig) -> Self {
        Self {
            client: Ollama::new(config.host.clone(), config.port),
            config,
        }
    }

    /// Create from environment variables
    pub fn from_env() -> Self {
        Self::from_config(OllamaConfig::from_env())
    }

    /// Create with default localhost settings
    pub fn localhost() -> Self {
        Self::from_config(OllamaConfig::default())
    }

    pub fn model(&self) -> &str {
        &self.config.model
    }

    /// Flatten the request into Ollama chat messages
    fn convert_request(request: &GenerateRequest<'_>) -> Vec<ChatMessage> {
        let mut system = request.system_instruction.unwrap_or_default().to_string();
        if !request.tools.is_empty() {
            if !system.is_empty() {
                system.push_str("\n\n");
            }
            system.push_str(&prompt_section(request.tools));
        }

        let mut messages = Vec::with_capacity(request.history.len() + 1);
        if !system.is_empty() {
            messages.push(ChatMessage::new(MessageRole::System, system));
        }

        for content in request.history {
            let role = match content.role {
                Role::User => MessageRole::User,
                Role::Model => MessageRole::Assistant,
                Role::Tool => MessageRole::User, // Tools appear as user context
            };
            messages.push(ChatMessage::new(role, render_parts(&content.parts)));
        }

        messages
    }

    /// Build Ollama model options
    fn build_options(opts: &GenerationOptions) -> ModelOptions {
        ModelOptions::default()
            .temperature(opts.temperature)
            .top_k(opts.top_k)
            .top_p(opts.top_p)
            .num_predict(i32::try_from(opts.max_output_tokens).unwrap_or(i32::MAX))
    }
}

#[async_trait]
impl LlmProvider for OllamaProvider {
    fn name(&self) -> &str {
        "ollama"
    }

    async fn health_check(&self) -> Result<bool> {
        match self.client.list_local_models().await {
            Ok(models) => Ok(models.iter().any(|m| m.name.starts_with(&self.config.model))),
            Err(e) => {
                tracing::warn!("Ollama health check failed: {}", e);
                Ok(false)
            }
        }
    }

    async fn generate(&self, request: &GenerateRequest<'_>) -> Result<Content> {
        let messages = Self::convert_request(request);
        let options = Self::build_options(request.options);

        let chat = ChatMessageRequest::new(self.config.model.clone(), messages).options(options);

        let response = self
            .client
            .send_chat_messages(chat)
            .await
            .map_err(|e| AgentError::Provider(e.to_string()))?;

        Ok(Content::model(parse_reply(&response.message.content)))
    }
}

/// Render content parts as chat text, tool calls in the same fenced form
/// the model is asked to produce
fn render_parts(parts: &[Part]) -> String {
    parts
        .iter()
        .map(|part| match part {
            Part::Text(text) => text.clone(),
            Part::ToolCall(call) => {
                let block = serde_json::json!({ "tool": call.name, "arguments": call.arguments });
                format!("{FENCE_OPEN}\n{block}\n{FENCE_CLOSE}")
            }
            Part::ToolResult(result) => {
                format!("[Tool '{}' returned]\n{}", result.name, result.output)
            }
        })
        .collect::<Vec<_>>()
        .join("\n\n")
}

#[derive(Deserialize)]
struct FencedCall {
    tool: String,
    #[serde(default)]
    arguments: HashMap<String, serde_json::Value>,
}

/// Split a model reply into prose and tool calls, in order.
///
/// A block that is not a valid call is kept verbatim as text.
fn parse_reply(reply: &str) -> Vec<Part> {
    fn push_text(parts: &mut Vec<Part>, text: &str) {
        let text = text.trim();
        if !text.is_empty() {
            parts.push(Part::text(text));
        }
    }

    let mut parts = Vec::new();
    let mut rest = reply;

    while let Some(open) = rest.find(FENCE_OPEN) {
        let body_start = open + FENCE_OPEN.len();
        let Some(close) = rest[body_start..].find(FENCE_CLOSE) else {
            break;
        };
        let body = &rest[body_start..body_start + close];
        let block_end = body_start + close + FENCE_CLOSE.len();

        push_text(&mut parts, &rest[..open]);
        match serde_json::from_str::<FencedCall>(body.trim()) {
            Ok(call) => parts.push(Part::ToolCall(ToolCall::new(call.tool, call.arguments))),
            Err(e) => {
                tracing::debug!(error = %e, "Ignoring malformed tool block");
                push_text(&mut parts, &rest[open..block_end]);
            }
        }
        rest = &rest[block_end..];
    }

    push_text(&mut parts, rest);
    parts
}
