//! Tool System
//!
//! Tools are declared once, when an agent is built, into an explicit
//! [`ToolRegistry`]. The registry is shared read-only with a
//! [`ToolDispatcher`], which routes engine-proposed calls by name, decodes
//! their arguments against the declared schema and runs the handler.

use async_trait::async_trait;
use futures::future::try_join_all;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;

use crate::error::{AgentError, Result};

/// Tool call request from the engine
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ToolCall {
    /// Tool identifier
    pub name: String,

    /// Arguments as key-value pairs, untyped as they arrive from the engine
    #[serde(default)]
    pub arguments: HashMap<String, Value>,
}

impl ToolCall {
    pub fn new(name: impl Into<String>, arguments: HashMap<String, Value>) -> Self {
        Self {
            name: name.into(),
            arguments,
        }
    }

    /// Add a single argument
    #[must_use]
    pub fn with_arg(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.arguments.insert(key.into(), value.into());
        self
    }
}

/// Result from tool execution, keyed by tool name
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolResult {
    /// Tool that was called
    pub name: String,

    /// Opaque text payload returned by the handler
    pub output: String,
}

impl ToolResult {
    pub fn new(name: impl Into<String>, output: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            output: output.into(),
        }
    }
}

/// JSON Schema type of a parameter
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParameterType {
    String,
    Number,
    Integer,
    Boolean,
}

impl ParameterType {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::String => "string",
            Self::Number => "number",
            Self::Integer => "integer",
            Self::Boolean => "boolean",
        }
    }

    /// Decode an engine-supplied value into this type.
    ///
    /// Engines are loose about scalars ("2024" vs 2024), so scalars are
    /// converted where the conversion is lossless. Anything else is `None`.
    fn coerce(self, value: &Value) -> Option<Value> {
        match (self, value) {
            (Self::String, Value::String(_)) => Some(value.clone()),
            (Self::String, Value::Number(n)) => Some(Value::String(n.to_string())),
            (Self::String, Value::Bool(b)) => Some(Value::String(b.to_string())),
            (Self::Number, Value::Number(_)) => Some(value.clone()),
            (Self::Number, Value::String(s)) => s
                .trim()
                .parse::<f64>()
                .ok()
                .and_then(serde_json::Number::from_f64)
                .map(Value::Number),
            (Self::Integer, Value::Number(n)) => n.as_i64().map(Value::from),
            (Self::Integer, Value::String(s)) => s.trim().parse::<i64>().ok().map(Value::from),
            (Self::Boolean, Value::Bool(_)) => Some(value.clone()),
            (Self::Boolean, Value::String(s)) => s.trim().parse::<bool>().ok().map(Value::Bool),
            _ => None,
        }
    }
}

/// Parameter definition for tool schema
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParameterSchema {
    /// Parameter name
    pub name: String,

    /// JSON Schema type
    #[serde(rename = "type")]
    pub param_type: ParameterType,

    /// Human-readable description
    pub description: String,

    /// Whether this parameter is required
    #[serde(default)]
    pub required: bool,
}

/// Tool descriptor exposed to the reasoning engine
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolDescriptor {
    /// Unique tool identifier within a registry
    pub name: String,

    /// Human-readable description (shown to the engine)
    pub description: String,

    /// Parameter definitions, in declaration order
    pub parameters: Vec<ParameterSchema>,
}

impl ToolDescriptor {
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            parameters: Vec::new(),
        }
    }

    /// Declare a required parameter
    #[must_use]
    pub fn required(
        mut self,
        name: impl Into<String>,
        param_type: ParameterType,
        description: impl Into<String>,
    ) -> Self {
        self.parameters.push(ParameterSchema {
            name: name.into(),
            param_type,
            description: description.into(),
            required: true,
        });
        self
    }

    /// Declare an optional parameter
    #[must_use]
    pub fn optional(
        mut self,
        name: impl Into<String>,
        param_type: ParameterType,
        description: impl Into<String>,
    ) -> Self {
        self.parameters.push(ParameterSchema {
            name: name.into(),
            param_type,
            description: description.into(),
            required: false,
        });
        self
    }

    pub fn parameter(&self, name: &str) -> Option<&ParameterSchema> {
        self.parameters.iter().find(|p| p.name == name)
    }

    /// Object-typed parameter schema in JSON Schema form
    pub fn parameters_schema(&self) -> Value {
        let properties: serde_json::Map<String, Value> = self
            .parameters
            .iter()
            .map(|p| {
                (
                    p.name.clone(),
                    serde_json::json!({
                        "type": p.param_type.as_str(),
                        "description": p.description,
                    }),
                )
            })
            .collect();
        let required: Vec<&str> = self
            .parameters
            .iter()
            .filter(|p| p.required)
            .map(|p| p.name.as_str())
            .collect();

        serde_json::json!({
            "type": "object",
            "properties": properties,
            "required": required,
        })
    }

    /// Full descriptor in the wire form consumed by engines
    pub fn to_json_schema(&self) -> Value {
        serde_json::json!({
            "name": self.name,
            "description": self.description,
            "parameters": self.parameters_schema(),
        })
    }

    /// Validate and decode a call's arguments against this schema.
    ///
    /// Undeclared arguments are dropped; handlers only ever see declared ones.
    pub fn decode(&self, call: &ToolCall) -> Result<ToolArgs> {
        let mut values = HashMap::with_capacity(self.parameters.len());

        for param in &self.parameters {
            match call.arguments.get(&param.name) {
                None | Some(Value::Null) => {
                    if param.required {
                        return Err(AgentError::MissingArgument {
                            tool: self.name.clone(),
                            parameter: param.name.clone(),
                        });
                    }
                }
                Some(raw) => {
                    let value =
                        param
                            .param_type
                            .coerce(raw)
                            .ok_or_else(|| AgentError::TypeMismatch {
                                tool: self.name.clone(),
                                parameter: param.name.clone(),
                                expected: param.param_type.as_str(),
                            })?;
                    values.insert(param.name.clone(), value);
                }
            }
        }

        for key in call.arguments.keys() {
            if self.parameter(key).is_none() {
                tracing::debug!(tool = %self.name, argument = %key, "Dropping undeclared argument");
            }
        }

        Ok(ToolArgs {
            tool: self.name.clone(),
            values,
        })
    }
}

/// Arguments after schema validation
///
/// Every required parameter is present and every present value has its
/// declared type, so the typed getters only fail for optional parameters.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ToolArgs {
    tool: String,
    values: HashMap<String, Value>,
}

impl ToolArgs {
    /// Name of the tool these arguments were decoded for
    pub fn tool(&self) -> &str {
        &self.tool
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.values.get(name)
    }

    pub fn get_str(&self, name: &str) -> Option<&str> {
        self.values.get(name).and_then(Value::as_str)
    }

    pub fn get_i64(&self, name: &str) -> Option<i64> {
        self.values.get(name).and_then(Value::as_i64)
    }

    pub fn get_f64(&self, name: &str) -> Option<f64> {
        self.values.get(name).and_then(Value::as_f64)
    }

    pub fn get_bool(&self, name: &str) -> Option<bool> {
        self.values.get(name).and_then(Value::as_bool)
    }

    /// A string argument the handler cannot run without
    pub fn require_str(&self, name: &str) -> Result<&str> {
        match self.values.get(name) {
            Some(Value::String(s)) => Ok(s),
            Some(_) => Err(AgentError::TypeMismatch {
                tool: self.tool.clone(),
                parameter: name.to_string(),
                expected: ParameterType::String.as_str(),
            }),
            None => Err(AgentError::MissingArgument {
                tool: self.tool.clone(),
                parameter: name.to_string(),
            }),
        }
    }

    /// Stringly view for handlers that take `mapping<string,string>`
    pub fn to_string_map(&self) -> HashMap<String, String> {
        self.values
            .iter()
            .map(|(k, v)| {
                let s = match v {
                    Value::String(s) => s.clone(),
                    other => other.to_string(),
                };
                (k.clone(), s)
            })
            .collect()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Tool trait - implement to add new capabilities
///
/// Handlers report domain failures ("no rows for that range") as ordinary
/// text. An `Err` aborts the whole agent call, so reserve it for failures
/// where the handler could not even attempt its job.
#[async_trait]
pub trait Tool: Send + Sync {
    /// The tool's descriptor; read once, at registration
    fn descriptor(&self) -> ToolDescriptor;

    /// Execute the tool with validated arguments
    async fn call(&self, args: &ToolArgs) -> Result<String>;
}

/// Ordered registry of tools owned by one agent
#[derive(Default)]
pub struct ToolRegistry {
    descriptors: Vec<ToolDescriptor>,
    handlers: HashMap<String, Arc<dyn Tool>>,
}

impl std::fmt::Debug for ToolRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToolRegistry")
            .field("tools", &self.names())
            .finish()
    }
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new tool
    pub fn register<T: Tool + 'static>(&mut self, tool: T) -> Result<()> {
        self.register_arc(Arc::new(tool))
    }

    /// Register a shared tool
    pub fn register_arc(&mut self, tool: Arc<dyn Tool>) -> Result<()> {
        let descriptor = tool.descriptor();
        if self.handlers.contains_key(&descriptor.name) {
            return Err(AgentError::DuplicateTool(descriptor.name));
        }
        self.handlers.insert(descriptor.name.clone(), tool);
        self.descriptors.push(descriptor);
        Ok(())
    }

    /// Get a tool by name
    pub fn get(&self, name: &str) -> Option<Arc<dyn Tool>> {
        self.handlers.get(name).cloned()
    }

    /// Descriptor captured at registration time
    pub fn descriptor(&self, name: &str) -> Option<&ToolDescriptor> {
        self.descriptors.iter().find(|d| d.name == name)
    }

    /// All descriptors, in registration order
    pub fn descriptors(&self) -> &[ToolDescriptor] {
        &self.descriptors
    }

    /// Get tool names, in registration order
    pub fn names(&self) -> Vec<&str> {
        self.descriptors.iter().map(|d| d.name.as_str()).collect()
    }

    /// Number of registered tools
    pub fn len(&self) -> usize {
        self.descriptors.len()
    }

    /// Check if empty
    pub fn is_empty(&self) -> bool {
        self.descriptors.is_empty()
    }

    /// System prompt section for engines without native function calling
    pub fn generate_prompt_section(&self) -> String {
        prompt_section(&self.descriptors)
    }
}

/// Describe `descriptors` and the fenced `tool` block reply protocol
pub fn prompt_section(descriptors: &[ToolDescriptor]) -> String {
    let mut prompt = String::from("## Available Tools\n\n");
    prompt.push_str("You can use the following tools by responding with one JSON block per call:\n\n");
    prompt.push_str("```tool\n{\"tool\": \"tool_name\", \"arguments\": {\"arg\": \"value\"}}\n```\n\n");
    prompt.push_str("Several blocks in one reply are executed together. Reply with plain text only once you have the final answer.\n\n");

    for descriptor in descriptors {
        prompt.push_str(&format!("### {}\n", descriptor.name));
        prompt.push_str(&format!("{}\n", descriptor.description));

        if !descriptor.parameters.is_empty() {
            prompt.push_str("**Parameters:**\n");
            for param in &descriptor.parameters {
                let required = if param.required { " (required)" } else { "" };
                prompt.push_str(&format!(
                    "- `{}` ({}){}: {}\n",
                    param.name,
                    param.param_type.as_str(),
                    required,
                    param.description
                ));
            }
        }
        prompt.push('\n');
    }

    prompt
}

/// Routes tool calls to handlers of the registry it was built from
#[derive(Clone, Debug)]
pub struct ToolDispatcher {
    registry: Arc<ToolRegistry>,
}

impl ToolDispatcher {
    pub const fn new(registry: Arc<ToolRegistry>) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &ToolRegistry {
        &self.registry
    }

    /// Look up the handler and decode the arguments, without running anything
    fn resolve(&self, call: &ToolCall) -> Result<(Arc<dyn Tool>, ToolArgs)> {
        let (Some(descriptor), Some(tool)) = (
            self.registry.descriptor(&call.name),
            self.registry.get(&call.name),
        ) else {
            tracing::warn!(tool = %call.name, "Engine proposed an unregistered tool");
            return Err(AgentError::UnhandledTool(call.name.clone()));
        };

        let args = descriptor.decode(call)?;
        Ok((tool, args))
    }

    /// Validate, route and execute a single call
    pub async fn dispatch(&self, call: &ToolCall) -> Result<ToolResult> {
        let (tool, args) = self.resolve(call)?;
        invoke(&call.name, tool.as_ref(), &args).await
    }

    /// Execute every call of one engine turn.
    ///
    /// All calls are validated before any handler runs; handlers then run
    /// concurrently. Results come back in call order, and the first error
    /// aborts the batch.
    pub async fn dispatch_batch(&self, calls: &[ToolCall]) -> Result<Vec<ToolResult>> {
        let resolved = calls
            .iter()
            .map(|call| self.resolve(call).map(|(tool, args)| (call.name.as_str(), tool, args)))
            .collect::<Result<Vec<_>>>()?;

        try_join_all(
            resolved
                .iter()
                .map(|(name, tool, args)| invoke(name, tool.as_ref(), args)),
        )
        .await
    }
}

async fn invoke(name: &str, tool: &dyn Tool, args: &ToolArgs) -> Result<ToolResult> {
    tracing::debug!(tool = %name, args = args.len(), "Executing tool");

    let output = tool.call(args).await.map_err(|e| match e {
        e @ (AgentError::UnhandledTool(_)
        | AgentError::MissingArgument { .. }
        | AgentError::TypeMismatch { .. }
        | AgentError::Tool { .. }
        | AgentError::Transport(_)) => e,
        other => AgentError::Tool {
            tool: name.to_string(),
            message: other.to_string(),
        },
    })?;

    tracing::debug!(tool = %name, bytes = output.len(), "Tool returned");
    Ok(ToolResult::new(name, output))
}
