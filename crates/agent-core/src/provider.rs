//! LLM Provider Strategy Pattern
//!
//! Defines the reasoning-engine transport the agent core consumes. A provider
//! accepts the conversation so far (including previously produced tool
//! results) plus the tool descriptors, and returns one structured reply made
//! of free-text parts and/or proposed tool calls.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use agent_core::provider::{GenerateRequest, LlmProvider};
//!
//! let provider = OllamaProvider::from_env();
//! let reply = provider.generate(&request).await?;
//! for call in reply.tool_calls() { /* ... */ }
//! ```

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::message::Content;
use crate::tool::ToolDescriptor;

/// Sampling configuration for a generation
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GenerationOptions {
    /// Temperature for sampling (0.0 = deterministic)
    #[serde(default = "default_temperature")]
    pub temperature: f32,

    /// Top-k sampling
    #[serde(default = "default_top_k")]
    pub top_k: u32,

    /// Top-p nucleus sampling
    #[serde(default = "default_top_p")]
    pub top_p: f32,

    /// Maximum tokens to generate
    #[serde(default = "default_max_output_tokens")]
    pub max_output_tokens: u32,
}

const fn default_temperature() -> f32 { 0.0 }
const fn default_top_k() -> u32 { 40 }
const fn default_top_p() -> f32 { 0.95 }
const fn default_max_output_tokens() -> u32 { 8192 }

impl Default for GenerationOptions {
    fn default() -> Self {
        Self {
            temperature: default_temperature(),
            top_k: default_top_k(),
            top_p: default_top_p(),
            max_output_tokens: default_max_output_tokens(),
        }
    }
}

/// Everything an engine needs to produce its next reply
#[derive(Clone, Copy, Debug)]
pub struct GenerateRequest<'a> {
    /// Agent-level instruction, sent out of band from the history
    pub system_instruction: Option<&'a str>,

    /// Tools the engine may propose calls to
    pub tools: &'a [ToolDescriptor],

    /// Prior turns followed by the content being submitted now
    pub history: &'a [Content],

    pub options: &'a GenerationOptions,
}

/// Strategy trait for reasoning engines
///
/// Implement this trait to add support for new LLM backends.
/// The agent works exclusively through this interface.
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Provider name for logs (e.g., "ollama", "gemini")
    fn name(&self) -> &str;

    /// Check if the provider is available and configured correctly
    async fn health_check(&self) -> Result<bool>;

    /// Produce the engine's next reply (role `Model`)
    async fn generate(&self, request: &GenerateRequest<'_>) -> Result<Content>;
}
