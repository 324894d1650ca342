//! Google Gemini Provider
//!
//! Implementation of `LlmProvider` over the Gemini `generateContent` REST
//! endpoint, using native function calling.

use std::collections::HashMap;

use agent_core::{
    error::{AgentError, Result},
    message::{Content, Part, Role},
    provider::{GenerateRequest, GenerationOptions, LlmProvider},
    tool::{ToolCall, ToolDescriptor},
};
use async_trait::async_trait;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use serde_json::Value;

const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Gemini provider configuration
#[derive(Clone, Debug)]
pub struct GeminiConfig {
    pub api_key: String,

    /// Model name, without the `models/` prefix
    pub model: String,

    /// API root; overridable for tests
    pub base_url: String,
}

impl GeminiConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            model: "gemini-2.0-flash".into(),
            base_url: DEFAULT_BASE_URL.into(),
        }
    }

    /// `GEMINI_API_KEY` (required), `GEMINI_MODEL`, `GEMINI_BASE_URL`
    pub fn from_env() -> Result<Self> {
        let api_key = std::env::var("GEMINI_API_KEY")
            .map_err(|_| AgentError::Config("GEMINI_API_KEY not set".into()))?;

        let mut config = Self::new(api_key);
        if let Ok(model) = std::env::var("GEMINI_MODEL") {
            config.model = model;
        }
        if let Ok(base_url) = std::env::var("GEMINI_BASE_URL") {
            config.base_url = base_url;
        }
        Ok(config)
    }

    #[must_use]
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }
}

/// Gemini LLM provider
pub struct GeminiProvider {
    client: reqwest::Client,
    config: GeminiConfig,
}

impl GeminiProvider {
    pub fn new(config: GeminiConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            config,
        }
    }

    pub fn from_env() -> Result<Self> {
        GeminiConfig::from_env().map(Self::new)
    }

    pub fn model(&self) -> &str {
        &self.config.model
    }

    fn endpoint(&self, method: &str) -> String {
        format!(
            "{}/models/{}:{method}",
            self.config.base_url.trim_end_matches('/'),
            self.config.model
        )
    }

    fn build_body(request: &GenerateRequest<'_>) -> WireRequest {
        let contents = request.history.iter().map(WireContent::from_content).collect();

        let tools = if request.tools.is_empty() {
            Vec::new()
        } else {
            vec![WireTool {
                function_declarations: request.tools.iter().map(declaration).collect(),
            }]
        };

        WireRequest {
            contents,
            system_instruction: request.system_instruction.map(|text| WireContent {
                role: None,
                parts: vec![WirePart::text(text)],
            }),
            tools,
            generation_config: WireGenerationConfig::from(request.options),
        }
    }

    fn map_transport(e: &reqwest::Error) -> AgentError {
        if e.is_connect() || e.is_timeout() {
            AgentError::ProviderUnavailable(e.to_string())
        } else {
            AgentError::Provider(e.to_string())
        }
    }
}

#[async_trait]
impl LlmProvider for GeminiProvider {
    fn name(&self) -> &str {
        "gemini"
    }

    async fn health_check(&self) -> Result<bool> {
        let url = format!(
            "{}/models/{}",
            self.config.base_url.trim_end_matches('/'),
            self.config.model
        );
        match self
            .client
            .get(&url)
            .header("x-goog-api-key", &self.config.api_key)
            .send()
            .await
        {
            Ok(resp) => Ok(resp.status().is_success()),
            Err(e) => {
                tracing::warn!("Gemini health check failed: {}", e);
                Ok(false)
            }
        }
    }

    async fn generate(&self, request: &GenerateRequest<'_>) -> Result<Content> {
        let body = Self::build_body(request);

        let resp = self
            .client
            .post(self.endpoint("generateContent"))
            .header("x-goog-api-key", &self.config.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| Self::map_transport(&e))?;

        let status = resp.status();
        if !status.is_success() {
            let error_text = resp.text().await.unwrap_or_default();
            let message = format!("Gemini API error {status}: {error_text}");
            return Err(
                if status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error() {
                    AgentError::ProviderUnavailable(message)
                } else {
                    AgentError::Provider(message)
                },
            );
        }

        let reply: WireResponse = resp
            .json()
            .await
            .map_err(|e| AgentError::Provider(format!("Failed to parse response: {e}")))?;

        let candidate = reply
            .candidates
            .into_iter()
            .next()
            .ok_or_else(|| AgentError::Provider("Gemini returned no candidates".into()))?;

        let parts = candidate
            .content
            .map(|content| content.parts.into_iter().filter_map(WirePart::into_part).collect())
            .unwrap_or_default();

        Ok(Content::model(parts))
    }
}

/// Function declaration; Gemini rejects an object schema with no properties
fn declaration(descriptor: &ToolDescriptor) -> Value {
    if descriptor.parameters.is_empty() {
        serde_json::json!({
            "name": descriptor.name,
            "description": descriptor.description,
        })
    } else {
        descriptor.to_json_schema()
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct WireRequest {
    contents: Vec<WireContent>,
    #[serde(skip_serializing_if = "Option::is_none")]
    system_instruction: Option<WireContent>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    tools: Vec<WireTool>,
    generation_config: WireGenerationConfig,
}

#[derive(Serialize, Deserialize)]
struct WireContent {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    role: Option<String>,
    #[serde(default)]
    parts: Vec<WirePart>,
}

impl WireContent {
    fn from_content(content: &Content) -> Self {
        let role = match content.role {
            Role::Model => "model",
            Role::User | Role::Tool => "user",
        };
        Self {
            role: Some(role.into()),
            parts: content.parts.iter().map(WirePart::from_part).collect(),
        }
    }
}

#[derive(Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WirePart {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    function_call: Option<WireFunctionCall>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    function_response: Option<WireFunctionResponse>,
}

impl WirePart {
    fn text(text: &str) -> Self {
        Self {
            text: Some(text.to_string()),
            ..Default::default()
        }
    }

    fn from_part(part: &Part) -> Self {
        match part {
            Part::Text(text) => Self::text(text),
            Part::ToolCall(call) => Self {
                function_call: Some(WireFunctionCall {
                    name: call.name.clone(),
                    args: call.arguments.clone(),
                }),
                ..Default::default()
            },
            Part::ToolResult(result) => Self {
                function_response: Some(WireFunctionResponse {
                    name: result.name.clone(),
                    response: serde_json::json!({ "result": result.output }),
                }),
                ..Default::default()
            },
        }
    }

    /// Reply parts the agent understands; anything else is dropped
    fn into_part(self) -> Option<Part> {
        if let Some(call) = self.function_call {
            return Some(Part::ToolCall(ToolCall::new(call.name, call.args)));
        }
        self.text.filter(|t| !t.is_empty()).map(Part::Text)
    }
}

#[derive(Serialize, Deserialize)]
struct WireFunctionCall {
    name: String,
    #[serde(default)]
    args: HashMap<String, Value>,
}

#[derive(Serialize, Deserialize)]
struct WireFunctionResponse {
    name: String,
    response: Value,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct WireTool {
    function_declarations: Vec<Value>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct WireGenerationConfig {
    temperature: f32,
    top_k: u32,
    top_p: f32,
    max_output_tokens: u32,
}

impl From<&GenerationOptions> for WireGenerationConfig {
    fn from(opts: &GenerationOptions) -> Self {
        Self {
            temperature: opts.temperature,
            top_k: opts.top_k,
            top_p: opts.top_p,
            max_output_tokens: opts.max_output_tokens,
        }
    }
}

#[derive(Deserialize)]
struct WireResponse {
    #[serde(default)]
    candidates: Vec<WireCandidate>,
}

#[derive(Deserialize)]
struct WireCandidate {
    content: Option<WireContent>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use agent_core::{ParameterType, ToolResult};
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const GENERATE_PATH: &str = "/models/gemini-2.0-flash:generateContent";

    fn provider(server: &MockServer) -> GeminiProvider {
        GeminiProvider::new(GeminiConfig::new("test-key").with_base_url(server.uri()))
    }

    fn tools() -> Vec<ToolDescriptor> {
        vec![
            ToolDescriptor::new("query_price_history", "Daily prices").required(
                "ticker",
                ParameterType::String,
                "Ticker code",
            ),
            ToolDescriptor::new("list_tickers", "Known tickers"),
        ]
    }

    #[test]
    fn test_body_shape() {
        let tools = tools();
        let history = vec![
            Content::user("AAPL prices?"),
            Content::model(vec![Part::ToolCall(
                ToolCall::new("query_price_history", HashMap::new()).with_arg("ticker", "AAPL"),
            )]),
            Content::tool_results(vec![ToolResult::new("query_price_history", "[]")]),
        ];
        let options = GenerationOptions::default();
        let request = GenerateRequest {
            system_instruction: Some("Be brief."),
            tools: &tools,
            history: &history,
            options: &options,
        };

        let body = serde_json::to_value(GeminiProvider::build_body(&request)).unwrap();

        assert_eq!(body["systemInstruction"]["parts"][0]["text"], "Be brief.");
        assert_eq!(body["contents"][1]["role"], "model");
        assert_eq!(body["contents"][1]["parts"][0]["functionCall"]["args"]["ticker"], "AAPL");
        assert_eq!(body["contents"][2]["role"], "user");
        assert_eq!(
            body["contents"][2]["parts"][0]["functionResponse"]["response"]["result"],
            "[]"
        );
        let declarations = &body["tools"][0]["functionDeclarations"];
        assert_eq!(declarations[0]["parameters"]["required"][0], "ticker");
        assert!(declarations[1].get("parameters").is_none());
        assert_eq!(body["generationConfig"]["maxOutputTokens"], 8192);
    }

    #[tokio::test]
    async fn test_generate_function_calls() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(GENERATE_PATH))
            .and(header("x-goog-api-key", "test-key"))
            .and(body_partial_json(serde_json::json!({
                "contents": [{"role": "user", "parts": [{"text": "compare"}]}]
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "candidates": [{
                    "content": {
                        "role": "model",
                        "parts": [
                            {"functionCall": {"name": "query_price_history", "args": {"ticker": "AAPL"}}},
                            {"functionCall": {"name": "query_price_history", "args": {"ticker": "MSFT"}}}
                        ]
                    },
                    "finishReason": "STOP"
                }]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let tools = tools();
        let history = vec![Content::user("compare")];
        let options = GenerationOptions::default();
        let request = GenerateRequest {
            system_instruction: None,
            tools: &tools,
            history: &history,
            options: &options,
        };

        let reply = provider(&server).generate(&request).await.unwrap();
        let calls = reply.tool_calls();
        assert_eq!(reply.role, Role::Model);
        assert_eq!(calls.len(), 2);
        assert_eq!(calls[1].arguments["ticker"], "MSFT");
    }

    #[tokio::test]
    async fn test_generate_text() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(GENERATE_PATH))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "candidates": [{"content": {"role": "model", "parts": [{"text": "Final Answer: 42"}]}}]
            })))
            .mount(&server)
            .await;

        let history = vec![Content::user("?")];
        let options = GenerationOptions::default();
        let request = GenerateRequest {
            system_instruction: None,
            tools: &[],
            history: &history,
            options: &options,
        };

        let reply = provider(&server).generate(&request).await.unwrap();
        assert_eq!(reply.first_text(), Some("Final Answer: 42"));
        assert!(!reply.has_tool_calls());
    }

    #[tokio::test]
    async fn test_error_statuses() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(GENERATE_PATH))
            .respond_with(ResponseTemplate::new(429).set_body_string("quota"))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/models/bad-model:generateContent"))
            .respond_with(ResponseTemplate::new(400).set_body_string("bad model"))
            .mount(&server)
            .await;

        let history = vec![Content::user("?")];
        let options = GenerationOptions::default();
        let request = GenerateRequest {
            system_instruction: None,
            tools: &[],
            history: &history,
            options: &options,
        };

        let busy = provider(&server).generate(&request).await.unwrap_err();
        assert!(matches!(busy, AgentError::ProviderUnavailable(_)));

        let bad = GeminiProvider::new(
            GeminiConfig::new("test-key")
                .with_base_url(server.uri())
                .with_model("bad-model"),
        );
        let err = bad.generate(&request).await.unwrap_err();
        assert!(matches!(err, AgentError::Provider(msg) if msg.contains("bad model")));
    }

    #[tokio::test]
    async fn test_no_candidates() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "promptFeedback": {"blockReason": "SAFETY"}
            })))
            .mount(&server)
            .await;

        let history = vec![Content::user("?")];
        let options = GenerationOptions::default();
        let request = GenerateRequest {
            system_instruction: None,
            tools: &[],
            history: &history,
            options: &options,
        };

        let err = provider(&server).generate(&request).await.unwrap_err();
        assert!(matches!(err, AgentError::Provider(_)));
    }
}
