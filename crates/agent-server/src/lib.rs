//! # agent-server
//!
//! Peer RPC layer: serves an agent over HTTP and lets other agents call it
//! as a tool.
//!
//! ```text
//! POST /agent  {"input": "..."}  ->  200 {"content": "..."}
//!                                ->  400 on any failure
//! ```

pub mod agents;
pub mod client;
pub mod config;
pub mod handlers;
pub mod server;
pub mod state;

#[cfg(test)]
mod testing;

pub use agents::build_agent;
pub use client::{PeerAgentTool, PeerClient, PeerEndpoint};
pub use config::{AgentRole, ServerConfig};
pub use handlers::{PeerRequest, PeerResponse};
pub use server::{router, PeerServer};
