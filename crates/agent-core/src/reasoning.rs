//! Reasoning Loop
//!
//! The agent core: one session plus one tool dispatcher, driven by a bounded
//! loop. Each turn submits content to the engine; a reply made only of text
//! ends the call, otherwise every proposed tool call is dispatched and the
//! results go back to the engine as a single batch.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;

use crate::error::{AgentError, Result};
use crate::message::Content;
use crate::provider::{GenerationOptions, LlmProvider};
use crate::session::{Checkpoint, Session, SessionConfig, SessionId, SessionState};
use crate::tool::{Tool, ToolDispatcher, ToolRegistry};

/// Maximum engine round trips per `call_agent`
pub const MAX_ITERATIONS: usize = 25;

/// Agent configuration
#[derive(Clone, Debug)]
pub struct AgentConfig {
    /// Name used in logs
    pub name: String,

    /// System instruction sent with every turn
    pub system_instruction: Option<String>,

    /// Maximum reasoning iterations before giving up
    pub max_iterations: usize,

    /// Generation options
    pub generation: GenerationOptions,

    /// Optional deadline per engine round trip
    pub turn_timeout: Option<Duration>,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            name: "agent".into(),
            system_instruction: None,
            max_iterations: MAX_ITERATIONS,
            generation: GenerationOptions::default(),
            turn_timeout: None,
        }
    }
}

/// The main Agent struct
pub struct Agent {
    provider: Arc<dyn LlmProvider>,
    dispatcher: ToolDispatcher,
    config: AgentConfig,

    /// Held for the whole of `call_agent`: one invocation in flight at a time
    session: Mutex<SessionState>,
}

impl std::fmt::Debug for Agent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Agent")
            .field("name", &self.config.name)
            .field("provider", &self.provider.name())
            .field("tools", self.dispatcher.registry())
            .finish_non_exhaustive()
    }
}

impl Agent {
    /// Create a new agent with no session
    pub fn new(
        provider: Arc<dyn LlmProvider>,
        tools: Arc<ToolRegistry>,
        config: AgentConfig,
    ) -> Self {
        Self {
            provider,
            dispatcher: ToolDispatcher::new(tools),
            config,
            session: Mutex::new(SessionState::Uninitialized),
        }
    }

    /// Create with default configuration
    pub fn with_defaults(provider: Arc<dyn LlmProvider>, tools: Arc<ToolRegistry>) -> Self {
        Self::new(provider, tools, AgentConfig::default())
    }

    pub fn name(&self) -> &str {
        &self.config.name
    }

    fn session_config(&self) -> SessionConfig {
        SessionConfig {
            system_instruction: self.config.system_instruction.clone(),
            tools: self.dispatcher.registry().descriptors().to_vec(),
            generation: self.config.generation.clone(),
            turn_timeout: self.config.turn_timeout,
        }
    }

    /// Start a fresh session, discarding any previous history.
    ///
    /// Waits for an in-flight call to finish first.
    pub async fn start_session(&self) -> SessionId {
        let session = Session::new(self.provider.clone(), self.session_config());
        let id = session.id().clone();
        *self.session.lock().await = SessionState::Active(session);
        tracing::info!(agent = %self.config.name, session = %id, "Session started");
        id
    }

    /// End the current session; calls fail with `NotReady` until a new one starts
    pub async fn end_session(&self) {
        *self.session.lock().await = SessionState::Terminated;
        tracing::info!(agent = %self.config.name, "Session ended");
    }

    pub async fn is_ready(&self) -> bool {
        self.session.lock().await.is_active()
    }

    /// Completed turns in the current session (0 without one)
    pub async fn turn_count(&self) -> usize {
        self.session
            .lock()
            .await
            .active()
            .map_or(0, Session::turn_count)
    }

    /// Drive a request to a final text answer.
    ///
    /// On any error, or if the returned future is dropped before it
    /// completes, the session is rolled back to where it was before the
    /// call, so an aborted exchange never leaves unanswered tool calls in
    /// the history.
    pub async fn call_agent(&self, request: &str) -> Result<String> {
        let mut state = self.session.lock().await;
        let mut guard = RollbackGuard::new(state.active_mut()?);

        tracing::info!(agent = %self.config.name, session = %guard.session.id(), "Handling request");

        let outcome = self.run_loop(&mut *guard.session, request).await;
        match &outcome {
            Ok(answer) => {
                guard.commit();
                tracing::info!(agent = %self.config.name, bytes = answer.len(), "Agent replied");
            }
            Err(e) => {
                tracing::warn!(agent = %self.config.name, kind = e.kind(), error = %e, "Agent call failed");
            }
        }
        outcome
    }

    async fn run_loop(&self, session: &mut Session, request: &str) -> Result<String> {
        let max = self.config.max_iterations;
        let mut content = Content::user(request);

        for iteration in 1..=max {
            let reply = session.submit(content).await?;
            let calls = reply.tool_calls();

            if calls.is_empty() {
                return reply
                    .first_text()
                    .map(str::to_owned)
                    .ok_or(AgentError::EmptyReply);
            }

            tracing::debug!(
                agent = %self.config.name,
                iteration,
                tools = calls.len(),
                "Engine requested tools"
            );

            // The last permitted reply gets no dispatch: its results could never be submitted
            if iteration == max {
                break;
            }

            let results = self.dispatcher.dispatch_batch(&calls).await?;
            content = Content::tool_results(results);
        }

        Err(AgentError::CycleExceeded(max))
    }

    /// Get the tool registry
    pub fn tools(&self) -> &ToolRegistry {
        self.dispatcher.registry()
    }

    /// Get configuration
    pub const fn config(&self) -> &AgentConfig {
        &self.config
    }
}

/// Rolls a session back to its checkpoint unless committed
struct RollbackGuard<'a> {
    session: &'a mut Session,
    checkpoint: Checkpoint,
    committed: bool,
}

impl<'a> RollbackGuard<'a> {
    fn new(session: &'a mut Session) -> Self {
        let checkpoint = session.checkpoint();
        Self {
            session,
            checkpoint,
            committed: false,
        }
    }

    const fn commit(&mut self) {
        self.committed = true;
    }
}

impl Drop for RollbackGuard<'_> {
    fn drop(&mut self) {
        if !self.committed {
            self.session.rollback(self.checkpoint);
            tracing::debug!(session = %self.session.id(), "Session rolled back");
        }
    }
}

/// Builder for Agent configuration
pub struct AgentBuilder {
    provider: Option<Arc<dyn LlmProvider>>,
    tools: ToolRegistry,
    config: AgentConfig,
}

impl Default for AgentBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl AgentBuilder {
    pub fn new() -> Self {
        Self {
            provider: None,
            tools: ToolRegistry::new(),
            config: AgentConfig::default(),
        }
    }

    #[must_use]
    pub fn provider(mut self, provider: Arc<dyn LlmProvider>) -> Self {
        self.provider = Some(provider);
        self
    }

    /// Register a tool; a duplicate name is rejected immediately
    pub fn tool<T: Tool + 'static>(self, tool: T) -> Result<Self> {
        self.tool_arc(Arc::new(tool))
    }

    pub fn tool_arc(mut self, tool: Arc<dyn Tool>) -> Result<Self> {
        self.tools.register_arc(tool)?;
        Ok(self)
    }

    #[must_use]
    pub fn tools(mut self, tools: ToolRegistry) -> Self {
        self.tools = tools;
        self
    }

    #[must_use]
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.config.name = name.into();
        self
    }

    #[must_use]
    pub fn system_instruction(mut self, instruction: impl Into<String>) -> Self {
        self.config.system_instruction = Some(instruction.into());
        self
    }

    #[must_use]
    pub fn temperature(mut self, temp: f32) -> Self {
        self.config.generation.temperature = temp;
        self
    }

    #[must_use]
    pub const fn max_iterations(mut self, max: usize) -> Self {
        self.config.max_iterations = max;
        self
    }

    #[must_use]
    pub const fn turn_timeout(mut self, limit: Duration) -> Self {
        self.config.turn_timeout = Some(limit);
        self
    }

    pub fn build(self) -> Result<Agent> {
        let provider = self
            .provider
            .ok_or_else(|| AgentError::Config("Provider is required".into()))?;

        if self.config.max_iterations == 0 {
            return Err(AgentError::Config("max_iterations must be at least 1".into()));
        }

        Ok(Agent::new(provider, Arc::new(self.tools), self.config))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::Part;
    use crate::provider::GenerateRequest;
    use crate::tool::{ParameterType, ToolArgs, ToolCall, ToolDescriptor};
    use async_trait::async_trait;
    use std::collections::{HashMap, VecDeque};
    use std::sync::Mutex as StdMutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Plays back a fixed list of replies and records what it was sent
    #[derive(Default)]
    struct ScriptedProvider {
        replies: StdMutex<VecDeque<Vec<Part>>>,
        /// Repeats this reply once the script runs out
        fallback: Option<Vec<Part>>,
        seen: StdMutex<Vec<Content>>,
        round_trips: AtomicUsize,
    }

    impl ScriptedProvider {
        fn new(replies: Vec<Vec<Part>>) -> Self {
            Self {
                replies: StdMutex::new(replies.into()),
                ..Default::default()
            }
        }

        fn looping(reply: Vec<Part>) -> Self {
            Self {
                fallback: Some(reply),
                ..Default::default()
            }
        }

        fn round_trips(&self) -> usize {
            self.round_trips.load(Ordering::SeqCst)
        }

        fn last_submission(&self) -> Content {
            self.seen.lock().unwrap().last().cloned().unwrap()
        }
    }

    #[async_trait]
    impl LlmProvider for ScriptedProvider {
        fn name(&self) -> &str {
            "scripted"
        }

        async fn health_check(&self) -> Result<bool> {
            Ok(true)
        }

        async fn generate(&self, request: &GenerateRequest<'_>) -> Result<Content> {
            self.round_trips.fetch_add(1, Ordering::SeqCst);
            if let Some(last) = request.history.last() {
                self.seen.lock().unwrap().push(last.clone());
            }
            let parts = self
                .replies
                .lock()
                .unwrap()
                .pop_front()
                .or_else(|| self.fallback.clone())
                .ok_or_else(|| AgentError::Provider("script exhausted".into()))?;
            Ok(Content::model(parts))
        }
    }

    /// Answers "ok", but takes its time over a request reading "slow"
    #[derive(Default)]
    struct SlowProvider {
        history_lens: StdMutex<Vec<usize>>,
    }

    impl SlowProvider {
        fn history_lens(&self) -> Vec<usize> {
            self.history_lens.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl LlmProvider for SlowProvider {
        fn name(&self) -> &str {
            "slow"
        }

        async fn health_check(&self) -> Result<bool> {
            Ok(true)
        }

        async fn generate(&self, request: &GenerateRequest<'_>) -> Result<Content> {
            self.history_lens.lock().unwrap().push(request.history.len());
            if request.history.last().and_then(Content::first_text) == Some("slow") {
                tokio::time::sleep(Duration::from_secs(5)).await;
            }
            Ok(Content::model(vec![Part::text("ok")]))
        }
    }

    struct Lookup {
        name: &'static str,
        calls: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl Tool for Lookup {
        fn descriptor(&self) -> ToolDescriptor {
            ToolDescriptor::new(self.name, "Look something up")
                .required("query", ParameterType::String, "What to look up")
        }

        async fn call(&self, args: &ToolArgs) -> Result<String> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(format!("{}({})", self.name, args.require_str("query")?))
        }
    }

    fn call(name: &str, query: &str) -> Part {
        Part::ToolCall(ToolCall::new(name, HashMap::new()).with_arg("query", query))
    }

    async fn agent_with(provider: Arc<ScriptedProvider>, names: &[&'static str]) -> (Agent, Arc<AtomicUsize>) {
        let calls = Arc::new(AtomicUsize::new(0));
        let mut builder = AgentBuilder::new().provider(provider).name("test");
        for &name in names {
            builder = builder
                .tool(Lookup {
                    name,
                    calls: calls.clone(),
                })
                .unwrap();
        }
        let agent = builder.build().unwrap();
        agent.start_session().await;
        (agent, calls)
    }

    #[tokio::test]
    async fn test_not_ready_without_session() {
        let provider = Arc::new(ScriptedProvider::new(vec![vec![Part::text("hi")]]));
        let agent = AgentBuilder::new().provider(provider.clone()).build().unwrap();

        let err = agent.call_agent("hello").await.unwrap_err();
        assert!(matches!(err, AgentError::NotReady));
        assert_eq!(provider.round_trips(), 0);
    }

    #[tokio::test]
    async fn test_not_ready_after_end_session() {
        let provider = Arc::new(ScriptedProvider::new(vec![vec![Part::text("hi")]]));
        let (agent, _) = agent_with(provider, &[]).await;
        agent.end_session().await;

        assert!(!agent.is_ready().await);
        assert!(matches!(agent.call_agent("x").await, Err(AgentError::NotReady)));
    }

    #[tokio::test]
    async fn test_terminates_on_nth_text_reply() {
        let provider = Arc::new(ScriptedProvider::new(vec![
            vec![call("lookup", "a")],
            vec![call("lookup", "b")],
            vec![Part::text("answer"), Part::text("ignored")],
        ]));
        let (agent, calls) = agent_with(provider.clone(), &["lookup"]).await;

        let answer = agent.call_agent("question").await.unwrap();
        assert_eq!(answer, "answer");
        assert_eq!(provider.round_trips(), 3);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert_eq!(agent.turn_count().await, 3);
    }

    #[tokio::test]
    async fn test_cycle_bound() {
        let provider = Arc::new(ScriptedProvider::looping(vec![call("lookup", "again")]));
        let (agent, calls) = agent_with(provider.clone(), &["lookup"]).await;

        let err = agent.call_agent("loop forever").await.unwrap_err();
        assert!(matches!(err, AgentError::CycleExceeded(MAX_ITERATIONS)));
        assert_eq!(provider.round_trips(), MAX_ITERATIONS);
        assert_eq!(calls.load(Ordering::SeqCst), MAX_ITERATIONS - 1);
    }

    #[tokio::test]
    async fn test_text_on_last_permitted_turn_succeeds() {
        let mut replies = vec![vec![call("lookup", "x")]; MAX_ITERATIONS - 1];
        replies.push(vec![Part::text("just in time")]);
        let provider = Arc::new(ScriptedProvider::new(replies));
        let (agent, _) = agent_with(provider.clone(), &["lookup"]).await;

        assert_eq!(agent.call_agent("q").await.unwrap(), "just in time");
        assert_eq!(provider.round_trips(), MAX_ITERATIONS);
    }

    #[tokio::test]
    async fn test_mixed_reply_is_not_final() {
        let provider = Arc::new(ScriptedProvider::new(vec![
            vec![Part::text("Let me check."), call("lookup", "a")],
            vec![Part::text("Final Answer: 42")],
        ]));
        let (agent, calls) = agent_with(provider.clone(), &["lookup"]).await;

        assert_eq!(agent.call_agent("q").await.unwrap(), "Final Answer: 42");
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_batches_results_into_one_round_trip() {
        let provider = Arc::new(ScriptedProvider::new(vec![
            vec![call("prices", "AAPL"), call("results", "AAPL"), call("news", "AAPL")],
            vec![Part::text("combined")],
        ]));
        let (agent, calls) = agent_with(provider.clone(), &["prices", "results", "news"]).await;

        assert_eq!(agent.call_agent("q").await.unwrap(), "combined");
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        assert_eq!(provider.round_trips(), 2);

        let batch = provider.last_submission();
        let names: Vec<_> = batch
            .parts
            .iter()
            .map(|p| match p {
                Part::ToolResult(r) => r.name.as_str(),
                other => panic!("unexpected part {other:?}"),
            })
            .collect();
        assert_eq!(names, ["prices", "results", "news"]);
    }

    #[tokio::test]
    async fn test_missing_argument_aborts_call() {
        let provider = Arc::new(ScriptedProvider::new(vec![
            vec![Part::ToolCall(ToolCall::new("lookup", HashMap::new()))],
            vec![Part::text("never reached")],
        ]));
        let (agent, calls) = agent_with(provider.clone(), &["lookup"]).await;

        let err = agent.call_agent("q").await.unwrap_err();
        assert!(matches!(err, AgentError::MissingArgument { .. }));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
        assert_eq!(provider.round_trips(), 1);
    }

    #[tokio::test]
    async fn test_unknown_tool_aborts_and_rolls_back() {
        let provider = Arc::new(ScriptedProvider::new(vec![
            vec![Part::text("hello")],
            vec![call("ghost", "x")],
        ]));
        let (agent, calls) = agent_with(provider, &["lookup"]).await;

        agent.call_agent("first").await.unwrap();
        let err = agent.call_agent("second").await.unwrap_err();

        assert!(matches!(err, AgentError::UnhandledTool(name) if name == "ghost"));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
        assert_eq!(agent.turn_count().await, 1);
    }

    #[tokio::test]
    async fn test_empty_reply() {
        let provider = Arc::new(ScriptedProvider::new(vec![vec![]]));
        let (agent, _) = agent_with(provider, &[]).await;
        assert!(matches!(agent.call_agent("q").await, Err(AgentError::EmptyReply)));
    }

    #[tokio::test]
    async fn test_session_reused_across_requests() {
        let provider = Arc::new(ScriptedProvider::new(vec![
            vec![Part::text("one")],
            vec![Part::text("two")],
        ]));
        let (agent, _) = agent_with(provider, &[]).await;

        assert_eq!(agent.call_agent("a").await.unwrap(), "one");
        assert_eq!(agent.call_agent("b").await.unwrap(), "two");
        assert_eq!(agent.turn_count().await, 2);

        agent.start_session().await;
        assert_eq!(agent.turn_count().await, 0);
    }

    #[tokio::test]
    async fn test_concurrent_calls_are_serialized() {
        let provider = Arc::new(ScriptedProvider::looping(vec![Part::text("ok")]));
        let (agent, _) = agent_with(provider, &[]).await;
        let agent = Arc::new(agent);

        let handles: Vec<_> = (0..8)
            .map(|i| {
                let agent = agent.clone();
                tokio::spawn(async move { agent.call_agent(&format!("req {i}")).await })
            })
            .collect();
        for handle in handles {
            assert_eq!(handle.await.unwrap().unwrap(), "ok");
        }

        // Every turn is a (request, reply) pair: no interleaving
        assert_eq!(agent.turn_count().await, 8);
    }

    #[tokio::test]
    async fn test_aborted_call_rolls_back() {
        let provider = Arc::new(SlowProvider::default());
        let agent = Arc::new(AgentBuilder::new().provider(provider.clone()).build().unwrap());
        agent.start_session().await;

        assert_eq!(agent.call_agent("fast").await.unwrap(), "ok");

        let handle = tokio::spawn({
            let agent = agent.clone();
            async move { agent.call_agent("slow").await }
        });
        tokio::time::sleep(Duration::from_millis(100)).await;
        handle.abort();
        assert!(handle.await.unwrap_err().is_cancelled());

        assert_eq!(agent.call_agent("fast").await.unwrap(), "ok");
        assert_eq!(agent.turn_count().await, 2);
        // The aborted request left nothing in the history
        assert_eq!(provider.history_lens(), [1, 3, 3]);
    }

    #[tokio::test]
    async fn test_turn_timeout() {
        let provider = Arc::new(SlowProvider::default());
        let agent = AgentBuilder::new()
            .provider(provider.clone())
            .turn_timeout(Duration::from_millis(20))
            .build()
            .unwrap();
        agent.start_session().await;

        assert_eq!(agent.call_agent("fast").await.unwrap(), "ok");

        let err = agent.call_agent("slow").await.unwrap_err();
        assert!(matches!(err, AgentError::Timeout(limit) if limit == Duration::from_millis(20)));
        assert_eq!(agent.turn_count().await, 1);

        assert_eq!(agent.call_agent("fast").await.unwrap(), "ok");
        assert_eq!(provider.history_lens(), [1, 3, 3]);
    }

    #[test]
    fn test_builder_requires_provider() {
        assert!(matches!(AgentBuilder::new().build(), Err(AgentError::Config(_))));
    }
}
