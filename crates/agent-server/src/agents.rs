//! Agent Assembly
//!
//! Builds each market agent with its instruction and tools. The leaf
//! agents get local data tools; the composing agents get peer tools.

use std::sync::Arc;

use agent_core::{Agent, AgentBuilder, AgentError, LlmProvider, Result};
use market_agents::{
    tools::{ListTickersTool, PriceHistoryTool, QuarterlyResultsTool},
    CsvPriceHistory, PriceHistory, ResultsLibrary, DATABASE_AGENT_PROMPT,
    DATA_COMBINE_AGENT_PROMPT, MARKET_INFO_AGENT_PROMPT, QUARTERLY_RESULTS_AGENT_PROMPT,
};

use crate::client::{PeerAgentTool, PeerClient, PeerEndpoint};
use crate::config::{AgentRole, ServerConfig};

pub const DATABASE_PEER_TOOL: &str = "call_database_agent";
pub const QUARTERLY_RESULTS_PEER_TOOL: &str = "call_quarterly_results_agent";
pub const DATA_COMBINE_PEER_TOOL: &str = "call_data_combine_agent";

/// Build the agent for `config.role`, reading data roots and peer
/// endpoints from the environment
pub fn build_agent(config: &ServerConfig, provider: Arc<dyn LlmProvider>) -> Result<Agent> {
    let mut base = AgentBuilder::new().provider(provider);
    if let Some(limit) = config.turn_timeout {
        base = base.turn_timeout(limit);
    }

    let peer = |role: AgentRole| -> Result<PeerClient> {
        let client = PeerClient::new(&PeerEndpoint::from_env(role.env_prefix())?);
        Ok(match config.peer_timeout {
            Some(limit) => client.with_timeout(limit),
            None => client,
        })
    };

    match config.role {
        AgentRole::Database => {
            let history = CsvPriceHistory::from_env().map_err(|e| AgentError::Config(e.to_string()))?;
            tracing::info!(root = %history.root().display(), "Serving price history");
            database_agent(base, Arc::new(history))
        }
        AgentRole::QuarterlyResults => {
            let library = ResultsLibrary::from_env().map_err(|e| AgentError::Config(e.to_string()))?;
            tracing::info!(root = %library.root().display(), "Serving quarterly results");
            quarterly_results_agent(base, Arc::new(library))
        }
        AgentRole::DataCombine => data_combine_agent(
            base,
            peer(AgentRole::Database)?,
            peer(AgentRole::QuarterlyResults)?,
        ),
        AgentRole::MarketInfo => market_info_agent(base, peer(AgentRole::DataCombine)?),
    }
}

pub fn database_agent(base: AgentBuilder, history: Arc<dyn PriceHistory>) -> Result<Agent> {
    base.name(AgentRole::Database.as_str())
        .system_instruction(DATABASE_AGENT_PROMPT)
        .tool(PriceHistoryTool::new(history.clone()))?
        .tool(ListTickersTool::new(history))?
        .build()
}

pub fn quarterly_results_agent(base: AgentBuilder, library: Arc<ResultsLibrary>) -> Result<Agent> {
    base.name(AgentRole::QuarterlyResults.as_str())
        .system_instruction(QUARTERLY_RESULTS_AGENT_PROMPT)
        .tool(QuarterlyResultsTool::new(library))?
        .build()
}

pub fn data_combine_agent(
    base: AgentBuilder,
    database: PeerClient,
    quarterly_results: PeerClient,
) -> Result<Agent> {
    base.name(AgentRole::DataCombine.as_str())
        .system_instruction(DATA_COMBINE_AGENT_PROMPT)
        .tool(
            PeerAgentTool::new(
                DATABASE_PEER_TOOL,
                "Make a request to the database agent. The agent will perform the requested query and return the result.",
                database,
            )
            .message_description("The natural language request message for the database agent"),
        )?
        .tool(
            PeerAgentTool::new(
                QUARTERLY_RESULTS_PEER_TOOL,
                "Make a request to the quarterly results agent. The agent will extract the requested results release and return it.",
                quarterly_results,
            )
            .message_description("The natural language request message for the quarterly results agent"),
        )?
        .build()
}

pub fn market_info_agent(base: AgentBuilder, data_combine: PeerClient) -> Result<Agent> {
    base.name(AgentRole::MarketInfo.as_str())
        .system_instruction(MARKET_INFO_AGENT_PROMPT)
        .tool(
            PeerAgentTool::new(
                DATA_COMBINE_PEER_TOOL,
                "Make a request to the data combine agent. The agent will process the request using the agents it can access and return the combined result.",
                data_combine,
            )
            .message_description("The natural language request message for the data combine agent"),
        )?
        .build()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::server::PeerServer;
    use crate::testing::{DelegatingProvider, EchoProvider};
    use chrono::NaiveDate;
    use market_agents::{MemoryPriceHistory, PriceBar};
    use rust_decimal::Decimal;

    fn delegating(tool: &str, label: &str) -> AgentBuilder {
        AgentBuilder::new().provider(Arc::new(DelegatingProvider {
            tool: tool.into(),
            label: label.into(),
        }))
    }

    fn history() -> Arc<dyn PriceHistory> {
        let bar = PriceBar {
            date: NaiveDate::from_ymd_opt(2024, 11, 1).unwrap(),
            open: Decimal::from(220),
            high: Decimal::from(225),
            low: Decimal::from(219),
            close: Decimal::from(222),
        };
        Arc::new(MemoryPriceHistory::new().with_bars("AAPL", vec![bar]))
    }

    async fn serve(agent: Agent) -> (PeerServer, PeerClient) {
        agent.start_session().await;
        let server = PeerServer::start(Arc::new(agent), "127.0.0.1:0").await.unwrap();
        let client = PeerClient::new(&PeerEndpoint::new("127.0.0.1", server.local_addr().port()));
        (server, client)
    }

    #[tokio::test]
    async fn test_agent_tools() {
        let database = database_agent(AgentBuilder::new().provider(Arc::new(EchoProvider)), history()).unwrap();
        assert_eq!(database.name(), "database");
        assert_eq!(database.tools().names(), vec!["query_price_history", "list_tickers"]);

        let combine = data_combine_agent(
            AgentBuilder::new().provider(Arc::new(EchoProvider)),
            PeerClient::with_url("http://127.0.0.1:1/agent"),
            PeerClient::with_url("http://127.0.0.1:2/agent"),
        )
        .unwrap();
        assert_eq!(
            combine.tools().names(),
            vec![DATABASE_PEER_TOOL, QUARTERLY_RESULTS_PEER_TOOL]
        );
        assert_eq!(combine.config().system_instruction.as_deref(), Some(DATA_COMBINE_AGENT_PROMPT));
    }

    #[tokio::test]
    async fn test_three_level_composition() {
        let (database_server, database_client) =
            serve(database_agent(delegating("list_tickers", "tickers -> "), history()).unwrap()).await;

        let (combine_server, combine_client) = serve(
            data_combine_agent(
                delegating(DATABASE_PEER_TOOL, "combined: "),
                database_client,
                PeerClient::with_url("http://127.0.0.1:1/agent"),
            )
            .unwrap(),
        )
        .await;

        let market_info = market_info_agent(delegating(DATA_COMBINE_PEER_TOOL, "Final Answer: "), combine_client).unwrap();
        market_info.start_session().await;

        let answer = market_info.call_agent("which tickers do you know?").await.unwrap();
        assert_eq!(answer, "Final Answer: combined: tickers -> 1 tickers: AAPL");

        combine_server.stop().await.unwrap();
        database_server.stop().await.unwrap();
    }

    #[tokio::test]
    async fn test_unreachable_peer_aborts_call() {
        let market_info = market_info_agent(
            delegating(DATA_COMBINE_PEER_TOOL, "Final Answer: "),
            PeerClient::with_url("http://127.0.0.1:1/agent"),
        )
        .unwrap();
        market_info.start_session().await;

        let err = market_info.call_agent("anything").await.unwrap_err();
        assert!(matches!(err, AgentError::Transport(_)));
        assert_eq!(market_info.turn_count().await, 0);
    }
}
