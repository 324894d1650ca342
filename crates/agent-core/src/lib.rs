//! # agent-core
//!
//! Agent orchestration core: a bounded loop alternating between asking a
//! reasoning engine what to do next and executing the tools it requests.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                          Agent                               │
//! │  ┌─────────────┐  ┌──────────────────┐  ┌─────────────────┐  │
//! │  │  Reasoning  │  │  ToolDispatcher  │  │   Session       │  │
//! │  │    Loop     │──│  (ToolRegistry)  │  │  (LlmProvider)  │  │
//! │  └─────────────┘  └──────────────────┘  └─────────────────┘  │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! The `LlmProvider` trait is the only thing an agent knows about its
//! engine; tools may themselves be other agents reached over the network
//! (see the `agent-server` crate).

pub mod provider;
pub mod tool;
pub mod reasoning;
pub mod message;
pub mod error;
pub mod session;

pub use error::{AgentError, Result};
pub use message::{Content, Part, Role};
pub use provider::{GenerateRequest, GenerationOptions, LlmProvider};
pub use reasoning::{Agent, AgentBuilder, AgentConfig, MAX_ITERATIONS};
pub use session::{Session, SessionId, SessionState};
pub use tool::{
    prompt_section, ParameterSchema, ParameterType, Tool, ToolArgs, ToolCall, ToolDescriptor, ToolDispatcher,
    ToolRegistry, ToolResult,
};
