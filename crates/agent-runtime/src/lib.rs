//! # agent-runtime
//!
//! Reasoning engine providers for agent-core.
//!
//! ## Providers
//!
//! - **Gemini**: hosted models with native function calling
//! - **Ollama**: local inference, tools proposed as fenced JSON blocks
//!
//! ## Usage
//!
//! ```rust,ignore
//! use agent_runtime::provider_from_env;
//!
//! let provider = provider_from_env()?;
//! let agent = AgentBuilder::new()
//!     .provider(provider)
//!     .build()?;
//! ```

use std::sync::Arc;

#[cfg(feature = "gemini")]
pub mod gemini;
#[cfg(feature = "ollama")]
pub mod ollama;

#[cfg(feature = "gemini")]
pub use gemini::{GeminiConfig, GeminiProvider};
#[cfg(feature = "ollama")]
pub use ollama::{OllamaConfig, OllamaProvider};

// Re-export core types for convenience
pub use agent_core::{Agent, AgentError, LlmProvider, Result};

/// Pick a provider from the environment.
///
/// Gemini is used when `GEMINI_API_KEY` is set, otherwise the local Ollama
/// server described by `OLLAMA_HOST`, `OLLAMA_PORT` and `OLLAMA_MODEL`.
pub fn provider_from_env() -> Result<Arc<dyn LlmProvider>> {
    #[cfg(feature = "gemini")]
    if std::env::var_os("GEMINI_API_KEY").is_some() {
        let provider = GeminiProvider::from_env()?;
        tracing::info!(model = provider.model(), "Using Gemini provider");
        return Ok(Arc::new(provider));
    }

    local_provider()
}

#[cfg(feature = "ollama")]
fn local_provider() -> Result<Arc<dyn LlmProvider>> {
    let provider = OllamaProvider::from_env();
    tracing::info!(model = provider.model(), "Using Ollama provider");
    Ok(Arc::new(provider))
}

#[cfg(not(feature = "ollama"))]
fn local_provider() -> Result<Arc<dyn LlmProvider>> {
    Err(AgentError::Config(
        "no reasoning engine configured: set GEMINI_API_KEY or enable the ollama feature".into(),
    ))
}
