//! Session Management
//!
//! A session is the turn history of one agent's conversation with its
//! reasoning engine. It is owned by exactly one [`Agent`](crate::Agent) and
//! is not synchronized; the agent serializes access to it.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{AgentError, Result};
use crate::message::{Content, Role};
use crate::provider::{GenerateRequest, GenerationOptions, LlmProvider};
use crate::tool::ToolDescriptor;

/// Unique session identifier
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionId(String);

impl SessionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Fixed per-session engine settings
#[derive(Clone, Debug, Default)]
pub struct SessionConfig {
    pub system_instruction: Option<String>,

    /// Descriptors offered to the engine on every turn
    pub tools: Vec<ToolDescriptor>,

    pub generation: GenerationOptions,

    /// Deadline for a single engine round trip; `None` waits indefinitely
    pub turn_timeout: Option<Duration>,
}

/// One round trip: what was sent and what the engine replied
#[derive(Clone, Copy, Debug)]
pub struct Turn<'a> {
    pub sent: &'a Content,
    pub reply: &'a Content,
}

/// Position in a session's history, used to undo an aborted exchange
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Checkpoint(usize);

/// A live conversation with a reasoning engine
pub struct Session {
    id: SessionId,
    provider: Arc<dyn LlmProvider>,
    config: SessionConfig,

    /// Alternating sent/reply contents; always even-length between submits
    history: Vec<Content>,

    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("id", &self.id)
            .field("provider", &self.provider.name())
            .field("turns", &self.turn_count())
            .finish_non_exhaustive()
    }
}

impl Session {
    /// Create a new, empty session
    pub fn new(provider: Arc<dyn LlmProvider>, config: SessionConfig) -> Self {
        let now = Utc::now();
        Self {
            id: SessionId::new(),
            provider,
            config,
            history: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    pub const fn id(&self) -> &SessionId {
        &self.id
    }

    /// Submit content and receive the engine's next reply.
    ///
    /// The turn is recorded only if the engine answered. Dropping the future
    /// mid-flight leaves `content` in the history; take a checkpoint first.
    pub async fn submit(&mut self, content: Content) -> Result<Content> {
        self.history.push(content);

        let request = GenerateRequest {
            system_instruction: self.config.system_instruction.as_deref(),
            tools: &self.config.tools,
            history: &self.history,
            options: &self.config.generation,
        };

        let outcome = match self.config.turn_timeout {
            Some(limit) => tokio::time::timeout(limit, self.provider.generate(&request))
                .await
                .unwrap_or(Err(AgentError::Timeout(limit))),
            None => self.provider.generate(&request).await,
        };

        match outcome {
            Ok(mut reply) => {
                reply.role = Role::Model;
                self.history.push(reply.clone());
                self.updated_at = Utc::now();
                tracing::debug!(
                    session = %self.id,
                    turn = self.turn_count(),
                    parts = reply.parts.len(),
                    "Engine replied"
                );
                Ok(reply)
            }
            Err(e) => {
                self.history.pop();
                Err(e)
            }
        }
    }

    /// Mark the current end of history
    pub const fn checkpoint(&self) -> Checkpoint {
        Checkpoint(self.history.len())
    }

    /// Drop every turn recorded after `checkpoint`
    pub fn rollback(&mut self, checkpoint: Checkpoint) {
        self.history.truncate(checkpoint.0);
        self.updated_at = Utc::now();
    }

    /// Completed turns, oldest first
    pub fn turns(&self) -> impl Iterator<Item = Turn<'_>> {
        self.history.chunks_exact(2).map(|pair| Turn {
            sent: &pair[0],
            reply: &pair[1],
        })
    }

    pub fn turn_count(&self) -> usize {
        self.history.len() / 2
    }

    pub fn history(&self) -> &[Content] {
        &self.history
    }

    pub const fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub const fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    /// Duration since creation
    pub fn duration(&self) -> chrono::Duration {
        self.updated_at - self.created_at
    }
}

/// Lifecycle of an agent's session slot
///
/// `Uninitialized → Active → (Active | Terminated)`; starting a new session
/// from any state yields a fresh `Active` one.
#[derive(Debug, Default)]
pub enum SessionState {
    #[default]
    Uninitialized,
    Active(Session),
    Terminated,
}

impl SessionState {
    pub const fn is_active(&self) -> bool {
        matches!(self, Self::Active(_))
    }

    /// The active session, or `NotReady`
    pub fn active_mut(&mut self) -> Result<&mut Session> {
        match self {
            Self::Active(session) => Ok(session),
            Self::Uninitialized | Self::Terminated => Err(AgentError::NotReady),
        }
    }

    pub const fn active(&self) -> Option<&Session> {
        match self {
            Self::Active(session) => Some(session),
            _ => None,
        }
    }
}
