//! Peer Server
//!
//! Exposes one agent at `<host>:<port>/agent`.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{routing::post, Router};
use tokio::net::{TcpListener, ToSocketAddrs};
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tower_http::trace::TraceLayer;

use agent_core::Agent;

use crate::handlers::{agent_handler, method_rejected};
use crate::state::PeerState;

/// Router serving `agent` at `/agent`
pub fn router(agent: Arc<Agent>) -> Router {
    Router::new()
        .route("/agent", post(agent_handler).fallback(method_rejected))
        .layer(TraceLayer::new_for_http())
        .with_state(PeerState { agent })
}

/// A running peer server.
///
/// The listener is bound before [`start`](Self::start) returns, so the
/// server accepts connections as soon as it exists.
pub struct PeerServer {
    addr: SocketAddr,
    shutdown: Option<oneshot::Sender<()>>,
    task: JoinHandle<std::io::Result<()>>,
}

impl PeerServer {
    pub async fn start(agent: Arc<Agent>, addr: impl ToSocketAddrs) -> std::io::Result<Self> {
        let listener = TcpListener::bind(addr).await?;
        let addr = listener.local_addr()?;
        let name = agent.name().to_string();
        let app = router(agent);
        let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();

        let task = tokio::spawn(async move {
            axum::serve(listener, app)
                .with_graceful_shutdown(async move {
                    let _ = shutdown_rx.await;
                })
                .await
        });

        tracing::info!(agent = %name, %addr, "Agent running at http://{}/agent", addr);

        Ok(Self {
            addr,
            shutdown: Some(shutdown_tx),
            task,
        })
    }

    pub const fn local_addr(&self) -> SocketAddr {
        self.addr
    }

    /// Stop accepting connections and wait for in-flight calls to finish
    pub async fn stop(mut self) -> std::io::Result<()> {
        if let Some(sender) = self.shutdown.take() {
            let _ = sender.send(());
        }
        let result = (&mut self.task).await.map_err(std::io::Error::other)?;
        tracing::info!(addr = %self.addr, "Peer server stopped");
        result
    }
}

impl Drop for PeerServer {
    fn drop(&mut self) {
        if let Some(sender) = self.shutdown.take() {
            let _ = sender.send(());
        }
    }
}
