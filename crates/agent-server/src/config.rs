//! Server Configuration
//!
//! Read from the environment; `main` loads a `.env` file first.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use agent_core::{AgentError, Result};

use crate::client::PeerEndpoint;

/// Which agent this process serves
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AgentRole {
    Database,
    QuarterlyResults,
    DataCombine,
    MarketInfo,
}

impl AgentRole {
    pub const ALL: [Self; 4] = [
        Self::Database,
        Self::QuarterlyResults,
        Self::DataCombine,
        Self::MarketInfo,
    ];

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Database => "database",
            Self::QuarterlyResults => "quarterly-results",
            Self::DataCombine => "data-combine",
            Self::MarketInfo => "market-info",
        }
    }

    /// Prefix of the `<PREFIX>_HOSTNAME` / `<PREFIX>_PORT` variables naming
    /// where this agent listens
    pub const fn env_prefix(self) -> &'static str {
        match self {
            Self::Database => "DATABASE_AGENT",
            Self::QuarterlyResults => "QUARTERLY_RESULTS_AGENT",
            Self::DataCombine => "DATA_COMBINE_AGENT",
            Self::MarketInfo => "STOCK_MARKET_INFO_APP",
        }
    }
}

impl fmt::Display for AgentRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AgentRole {
    type Err = AgentError;

    fn from_str(s: &str) -> Result<Self> {
        let normalized = s.trim().to_lowercase().replace('_', "-");
        Self::ALL
            .into_iter()
            .find(|role| role.as_str() == normalized)
            .ok_or_else(|| {
                AgentError::Config(format!(
                    "unknown agent role '{s}', expected one of: database, quarterly-results, data-combine, market-info"
                ))
            })
    }
}

/// Process configuration
#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub role: AgentRole,

    /// Where this agent listens
    pub endpoint: PeerEndpoint,

    /// Deadline for calls to peer agents; `None` waits indefinitely
    pub peer_timeout: Option<Duration>,

    /// Deadline for a single engine round trip
    pub turn_timeout: Option<Duration>,
}

impl ServerConfig {
    /// `AGENT_ROLE` picks the agent. It listens on `AGENT_HOSTNAME`/`AGENT_PORT`
    /// when set, otherwise on its role's `<PREFIX>_HOSTNAME`/`<PREFIX>_PORT`.
    pub fn from_env() -> Result<Self> {
        let role: AgentRole = std::env::var("AGENT_ROLE")
            .map_err(|_| AgentError::Config("environment variable AGENT_ROLE not set".into()))?
            .parse()?;

        let endpoint = match (std::env::var("AGENT_HOSTNAME"), std::env::var("AGENT_PORT")) {
            (Ok(hostname), Ok(port)) => PeerEndpoint::new(
                hostname,
                port.parse()
                    .map_err(|_| AgentError::Config(format!("AGENT_PORT '{port}' is not a port")))?,
            ),
            _ => PeerEndpoint::from_env(role.env_prefix())?,
        };

        Ok(Self {
            role,
            endpoint,
            peer_timeout: secs_var("PEER_TIMEOUT_SECS")?,
            turn_timeout: secs_var("TURN_TIMEOUT_SECS")?,
        })
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.endpoint.hostname, self.endpoint.port)
    }
}

fn secs_var(name: &str) -> Result<Option<Duration>> {
    match std::env::var(name) {
        Ok(value) => value
            .parse::<u64>()
            .map(|secs| Some(Duration::from_secs(secs)))
            .map_err(|_| AgentError::Config(format!("{name} '{value}' is not a number of seconds"))),
        Err(_) => Ok(None),
    }
}
