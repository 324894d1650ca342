//! Scripted engines and agents for the peer layer tests

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;

use agent_core::{
    Agent, AgentBuilder, AgentError, Content, GenerateRequest, LlmProvider, Part, Result, Role,
    ToolCall,
};

/// Replies `echo: <text>` to whatever text it was last sent
pub struct EchoProvider;

#[async_trait]
impl LlmProvider for EchoProvider {
    fn name(&self) -> &str {
        "echo"
    }

    async fn health_check(&self) -> Result<bool> {
        Ok(true)
    }

    async fn generate(&self, request: &GenerateRequest<'_>) -> Result<Content> {
        let text = request
            .history
            .last()
            .and_then(Content::first_text)
            .unwrap_or_default();
        Ok(Content::model(vec![Part::text(format!("echo: {text}"))]))
    }
}

/// Always fails
pub struct FailingProvider;

#[async_trait]
impl LlmProvider for FailingProvider {
    fn name(&self) -> &str {
        "failing"
    }

    async fn health_check(&self) -> Result<bool> {
        Ok(false)
    }

    async fn generate(&self, _request: &GenerateRequest<'_>) -> Result<Content> {
        Err(AgentError::ProviderUnavailable("offline".into()))
    }
}

/// Forwards each request to one tool's `message`, then answers with the
/// tool's output prefixed by `label`
pub struct DelegatingProvider {
    pub tool: String,
    pub label: String,
}

#[async_trait]
impl LlmProvider for DelegatingProvider {
    fn name(&self) -> &str {
        "delegating"
    }

    async fn health_check(&self) -> Result<bool> {
        Ok(true)
    }

    async fn generate(&self, request: &GenerateRequest<'_>) -> Result<Content> {
        let last = request
            .history
            .last()
            .ok_or_else(|| AgentError::Provider("empty history".into()))?;

        let reply = match last.role {
            Role::Tool => {
                let output = last
                    .parts
                    .iter()
                    .find_map(|part| match part {
                        Part::ToolResult(result) => Some(result.output.clone()),
                        _ => None,
                    })
                    .unwrap_or_default();
                Part::text(format!("{}{output}", self.label))
            }
            _ => Part::ToolCall(
                ToolCall::new(&self.tool, HashMap::new())
                    .with_arg("message", last.first_text().unwrap_or_default()),
            ),
        };
        Ok(Content::model(vec![reply]))
    }
}

async fn ready(agent: Agent) -> Arc<Agent> {
    agent.start_session().await;
    Arc::new(agent)
}

pub async fn echo_agent() -> Arc<Agent> {
    let agent = AgentBuilder::new()
        .name("echo")
        .provider(Arc::new(EchoProvider))
        .build()
        .unwrap();
    ready(agent).await
}

pub async fn failing_agent() -> Arc<Agent> {
    let agent = AgentBuilder::new()
        .name("failing")
        .provider(Arc::new(FailingProvider))
        .build()
        .unwrap();
    ready(agent).await
}
