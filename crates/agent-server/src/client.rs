//! Peer Client
//!
//! Calls another agent's `/agent` endpoint, and wraps that call as a tool so
//! an agent can delegate to its peers.

use std::time::Duration;

use async_trait::async_trait;

use agent_core::{AgentError, ParameterType, Result, Tool, ToolArgs, ToolDescriptor};

use crate::handlers::{PeerRequest, PeerResponse};

/// Where a peer agent listens
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PeerEndpoint {
    pub hostname: String,
    pub port: u16,
}

impl PeerEndpoint {
    pub fn new(hostname: impl Into<String>, port: u16) -> Self {
        Self {
            hostname: hostname.into(),
            port,
        }
    }

    /// Read `<PREFIX>_HOSTNAME` and `<PREFIX>_PORT`
    pub fn from_env(prefix: &str) -> Result<Self> {
        let hostname = required_var(&format!("{prefix}_HOSTNAME"))?;
        let port_var = format!("{prefix}_PORT");
        let port = required_var(&port_var)?
            .parse()
            .map_err(|_| AgentError::Config(format!("environment variable {port_var} is not a port")))?;
        Ok(Self { hostname, port })
    }

    pub fn url(&self) -> String {
        format!("http://{}:{}/agent", self.hostname, self.port)
    }
}

fn required_var(name: &str) -> Result<String> {
    std::env::var(name).map_err(|_| AgentError::Config(format!("environment variable {name} not set")))
}

/// One-shot caller of a peer agent. No retries.
#[derive(Clone, Debug)]
pub struct PeerClient {
    client: reqwest::Client,
    url: String,
    timeout: Option<Duration>,
}

impl PeerClient {
    pub fn new(endpoint: &PeerEndpoint) -> Self {
        Self::with_url(endpoint.url())
    }

    /// Client for a full endpoint URL
    pub fn with_url(url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            url: url.into(),
            timeout: None,
        }
    }

    /// Give up on a call after `timeout`; by default a call waits for the peer
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Send `input` to the peer and return its answer.
    ///
    /// Anything short of a well-formed success envelope is a `Transport` error.
    pub async fn call(&self, input: &str) -> Result<String> {
        let mut request = self.client.post(&self.url).json(&PeerRequest {
            input: input.to_string(),
        });
        if let Some(timeout) = self.timeout {
            request = request.timeout(timeout);
        }

        let resp = request
            .send()
            .await
            .map_err(|e| AgentError::Transport(format!("{}: {e}", self.url)))?;

        let status = resp.status();
        if !status.is_success() {
            return Err(AgentError::Transport(format!("{} returned {status}", self.url)));
        }

        let reply: PeerResponse = resp
            .json()
            .await
            .map_err(|e| AgentError::Transport(format!("{}: malformed reply: {e}", self.url)))?;

        Ok(reply.content)
    }
}

/// A tool whose handler is another agent
pub struct PeerAgentTool {
    name: String,
    description: String,
    message_description: String,
    client: PeerClient,
}

impl PeerAgentTool {
    pub fn new(name: impl Into<String>, description: impl Into<String>, client: PeerClient) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            message_description: "The natural language request message for the agent".into(),
            client,
        }
    }

    /// Override the description of the `message` parameter
    #[must_use]
    pub fn message_description(mut self, description: impl Into<String>) -> Self {
        self.message_description = description.into();
        self
    }
}

#[async_trait]
impl Tool for PeerAgentTool {
    fn descriptor(&self) -> ToolDescriptor {
        ToolDescriptor::new(&self.name, &self.description).required(
            "message",
            ParameterType::String,
            &self.message_description,
        )
    }

    async fn call(&self, args: &ToolArgs) -> Result<String> {
        let message = args.require_str("message")?;
        tracing::info!(tool = %self.name, peer = self.client.url(), "Calling peer agent: {}", message);
        self.client.call(message).await
    }
}
