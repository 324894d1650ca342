//! Error Types

use std::time::Duration;

use thiserror::Error;

/// Result type alias for agent operations
pub type Result<T> = std::result::Result<T, AgentError>;

/// Agent error types
///
/// Every variant aborts the `call_agent` invocation it occurs in. Domain
/// failures ("no data for this ticker") are not errors: tools report them as
/// ordinary text so the engine can react to them.
#[derive(Error, Debug)]
pub enum AgentError {
    /// No active session on the agent
    #[error("no active session: start a session before calling the agent")]
    NotReady,

    /// Turn budget exhausted without a text-only reply
    #[error("message cycles exceeded ({0} turns)")]
    CycleExceeded(usize),

    /// The engine proposed a tool that is not in the registry
    #[error("unhandled tool: {0}")]
    UnhandledTool(String),

    /// A required parameter was absent from the tool call
    #[error("tool '{tool}' is missing required argument '{parameter}'")]
    MissingArgument { tool: String, parameter: String },

    /// An argument could not be decoded as its declared type
    #[error("tool '{tool}' argument '{parameter}' is not a valid {expected}")]
    TypeMismatch {
        tool: String,
        parameter: String,
        expected: &'static str,
    },

    /// Two descriptors registered under the same name
    #[error("duplicate tool name: {0}")]
    DuplicateTool(String),

    /// A handler could not attempt its job at all
    #[error("tool '{tool}' failed: {message}")]
    Tool { tool: String, message: String },

    /// Peer unreachable or peer response unusable
    #[error("transport error: {0}")]
    Transport(String),

    /// LLM provider error
    #[error("Provider error: {0}")]
    Provider(String),

    /// Provider unavailable or not responding
    #[error("Provider unavailable: {0}")]
    ProviderUnavailable(String),

    /// The engine replied with neither text nor tool calls
    #[error("engine returned an empty reply")]
    EmptyReply,

    /// An engine round trip exceeded the configured turn timeout
    #[error("engine turn timed out after {0:?}")]
    Timeout(Duration),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// JSON serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Other/unknown error
    #[error("{0}")]
    Other(String),
}

impl AgentError {
    /// Stable snake_case identifier for logs and metrics labels
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::NotReady => "not_ready",
            Self::CycleExceeded(_) => "cycle_exceeded",
            Self::UnhandledTool(_) => "unhandled_tool",
            Self::MissingArgument { .. } => "missing_argument",
            Self::TypeMismatch { .. } => "type_mismatch",
            Self::DuplicateTool(_) => "duplicate_tool",
            Self::Tool { .. } => "tool",
            Self::Transport(_) => "transport",
            Self::Provider(_) => "provider",
            Self::ProviderUnavailable(_) => "provider_unavailable",
            Self::EmptyReply => "empty_reply",
            Self::Timeout(_) => "timeout",
            Self::Config(_) => "config",
            Self::Json(_) => "json",
            Self::Other(_) => "other",
        }
    }

    /// Structural mismatch between an engine proposal and the tool schema
    pub const fn is_protocol_violation(&self) -> bool {
        matches!(
            self,
            Self::UnhandledTool(_) | Self::MissingArgument { .. } | Self::TypeMismatch { .. }
        )
    }

    /// Check if error is retryable by the owning process
    ///
    /// Nothing in this crate retries; the flag is advisory for callers.
    pub const fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::NotReady | Self::ProviderUnavailable(_) | Self::Timeout(_)
        )
    }

    /// Convert to a user-friendly message
    pub fn user_message(&self) -> String {
        match self {
            Self::NotReady => "The agent is not ready. Start a session and try again.".into(),
            Self::CycleExceeded(_) => {
                "The request took too many steps to answer. Please try a simpler query.".into()
            }
            Self::UnhandledTool(name) => format!("The tool '{name}' is not available."),
            Self::MissingArgument { tool, parameter } => {
                format!("The tool '{tool}' was called without '{parameter}'.")
            }
            Self::TypeMismatch { tool, parameter, .. } => {
                format!("The tool '{tool}' was called with an invalid '{parameter}'.")
            }
            Self::Tool { tool, .. } => format!("The tool '{tool}' could not run."),
            Self::Transport(_) => "A downstream agent could not be reached.".into(),
            Self::Provider(msg) => format!("The AI service encountered an error: {msg}"),
            Self::ProviderUnavailable(_) | Self::Timeout(_) => {
                "The AI service is currently unavailable. Please try again.".into()
            }
            _ => "An unexpected error occurred.".into(),
        }
    }
}
