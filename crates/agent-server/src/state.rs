//! Application State

use std::sync::Arc;

use agent_core::Agent;

/// Shared state of a peer server
#[derive(Clone)]
pub struct PeerState {
    /// The agent answering `/agent` requests; its session serializes calls
    pub agent: Arc<Agent>,
}
