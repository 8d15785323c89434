//! Tool System
//!
//! Tools are registered once when an agent is built and are read-only
//! afterwards, so one registry can be shared by any number of concurrent
//! conversations. Every invocation goes through schema validation before the
//! handler sees its arguments.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};
use std::collections::HashMap;
use std::fmt::Write as _;
use std::sync::Arc;

use crate::error::{AgentError, Result};

/// Tool call request from the model
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ToolCall {
    /// Tool identifier
    #[serde(alias = "tool")]
    pub name: String,

    /// Arguments as decoded from model output
    #[serde(default)]
    pub arguments: Map<String, Value>,

    /// Call ID assigned by the model endpoint (or generated)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    /// Set when the model's argument text could not be decoded; the call is
    /// then answered with an invalid-argument error instead of running
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub argument_error: Option<String>,
}

impl ToolCall {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            arguments: Map::new(),
            id: None,
            argument_error: None,
        }
    }

    #[must_use]
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    #[must_use]
    pub fn with_argument(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.arguments.insert(key.into(), value.into());
        self
    }

    #[must_use]
    pub fn with_arguments(mut self, arguments: Map<String, Value>) -> Self {
        self.arguments = arguments;
        self
    }

    /// Mark the arguments as undecodable
    #[must_use]
    pub fn with_argument_error(mut self, reason: impl Into<String>) -> Self {
        self.argument_error = Some(reason.into());
        self
    }
}

/// Primitive parameter types understood by the validator
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParameterType {
    String,
    Integer,
    Number,
    Boolean,
}

impl ParameterType {
    const fn as_str(self) -> &'static str {
        match self {
            Self::String => "string",
            Self::Integer => "integer",
            Self::Number => "number",
            Self::Boolean => "boolean",
        }
    }
}

/// Parameter definition for tool schema
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ParameterSchema {
    /// Parameter name
    pub name: String,

    /// Primitive type
    #[serde(rename = "type")]
    pub param_type: ParameterType,

    /// Human-readable description
    pub description: String,

    /// Whether this parameter is required
    #[serde(default)]
    pub required: bool,

    /// Default value if not provided
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,

    /// Allowed values, making a string parameter an enumeration
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enum_values: Option<Vec<String>>,
}

impl ParameterSchema {
    fn new(name: impl Into<String>, param_type: ParameterType, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            param_type,
            description: description.into(),
            required: true,
            default: None,
            enum_values: None,
        }
    }

    /// Required string parameter
    pub fn string(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self::new(name, ParameterType::String, description)
    }

    /// Required integer parameter
    pub fn integer(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self::new(name, ParameterType::Integer, description)
    }

    /// Required floating point parameter
    pub fn number(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self::new(name, ParameterType::Number, description)
    }

    /// Required boolean parameter
    pub fn boolean(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self::new(name, ParameterType::Boolean, description)
    }

    /// Required string parameter restricted to `values`
    pub fn enumeration<I, S>(name: impl Into<String>, description: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut param = Self::new(name, ParameterType::String, description);
        param.enum_values = Some(values.into_iter().map(Into::into).collect());
        param
    }

    #[must_use]
    pub fn optional(mut self) -> Self {
        self.required = false;
        self
    }

    /// Make the parameter optional with a default filled in during validation
    #[must_use]
    pub fn with_default(mut self, default: impl Into<Value>) -> Self {
        self.required = false;
        self.default = Some(default.into());
        self
    }

    fn json_schema(&self) -> Value {
        let mut prop = json!({
            "type": self.param_type.as_str(),
            "description": self.description,
        });
        if let Some(values) = &self.enum_values {
            prop["enum"] = json!(values);
        }
        if let Some(default) = &self.default {
            prop["default"] = default.clone();
        }
        prop
    }

    /// Coerce a model-supplied value to this parameter's type.
    fn coerce(&self, value: &Value) -> std::result::Result<Value, String> {
        match self.param_type {
            ParameterType::Integer => coerce_integer(value),
            ParameterType::Number => coerce_number(value),
            ParameterType::Boolean => match value {
                Value::Bool(_) => Ok(value.clone()),
                Value::String(s) if s.eq_ignore_ascii_case("true") => Ok(Value::Bool(true)),
                Value::String(s) if s.eq_ignore_ascii_case("false") => Ok(Value::Bool(false)),
                _ => Err(format!("expected a boolean, got {value}")),
            },
            ParameterType::String => {
                let text = match value {
                    Value::String(s) => s.clone(),
                    Value::Number(n) => n.to_string(),
                    Value::Bool(b) => b.to_string(),
                    _ => return Err(format!("expected a string, got {value}")),
                };
                self.match_enum(text).map(Value::String)
            }
        }
    }

    fn match_enum(&self, text: String) -> std::result::Result<String, String> {
        let Some(allowed) = &self.enum_values else {
            return Ok(text);
        };
        allowed
            .iter()
            .find(|v| v.eq_ignore_ascii_case(text.trim()))
            .cloned()
            .ok_or_else(|| format!("'{text}' is not one of: {}", allowed.join(", ")))
    }
}

#[allow(clippy::cast_possible_truncation)]
fn coerce_integer(value: &Value) -> std::result::Result<Value, String> {
    match value {
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                return Ok(Value::from(i));
            }
            match n.as_f64() {
                Some(f) if f.fract() == 0.0 && f.abs() < 9.0e15 => Ok(Value::from(f as i64)),
                _ => Err(format!("expected an integer, got {n}")),
            }
        }
        Value::String(s) => s
            .trim()
            .parse::<i64>()
            .map(Value::from)
            .map_err(|_| format!("expected an integer, got '{s}'")),
        _ => Err(format!("expected an integer, got {value}")),
    }
}

fn coerce_number(value: &Value) -> std::result::Result<Value, String> {
    match value {
        Value::Number(_) => Ok(value.clone()),
        Value::String(s) => s
            .trim()
            .parse::<f64>()
            .ok()
            .and_then(serde_json::Number::from_f64)
            .map(Value::Number)
            .ok_or_else(|| format!("expected a number, got '{s}'")),
        _ => Err(format!("expected a number, got {value}")),
    }
}

/// Tool definition schema (for model function calling)
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ToolSchema {
    /// Unique tool identifier
    pub name: String,

    /// Human-readable description (shown to the model)
    pub description: String,

    /// Parameter definitions, in declaration order
    #[serde(default)]
    pub parameters: Vec<ParameterSchema>,
}

impl ToolSchema {
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            parameters: Vec::new(),
        }
    }

    #[must_use]
    pub fn param(mut self, param: ParameterSchema) -> Self {
        self.parameters.push(param);
        self
    }

    /// JSON Schema object describing the parameters
    pub fn json_schema(&self) -> Value {
        let properties: Map<String, Value> = self
            .parameters
            .iter()
            .map(|p| (p.name.clone(), p.json_schema()))
            .collect();
        let required: Vec<&str> = self
            .parameters
            .iter()
            .filter(|p| p.required)
            .map(|p| p.name.as_str())
            .collect();

        json!({
            "type": "object",
            "properties": properties,
            "required": required,
        })
    }

    /// Validate a call against this schema, producing typed arguments.
    ///
    /// Defaults are filled in, values are coerced to the declared primitive
    /// types, and arguments the schema does not declare are dropped.
    pub fn validate(&self, call: &ToolCall) -> Result<ToolArgs> {
        if let Some(reason) = &call.argument_error {
            return Err(AgentError::InvalidArgument {
                tool: self.name.clone(),
                parameter: "arguments".into(),
                reason: reason.clone(),
            });
        }

        let mut values = Map::new();

        for param in &self.parameters {
            let supplied = call.arguments.get(&param.name).filter(|v| !v.is_null());
            match (supplied, &param.default) {
                (Some(value), _) => {
                    let coerced = param.coerce(value).map_err(|reason| AgentError::InvalidArgument {
                        tool: self.name.clone(),
                        parameter: param.name.clone(),
                        reason,
                    })?;
                    values.insert(param.name.clone(), coerced);
                }
                (None, Some(default)) => {
                    values.insert(param.name.clone(), default.clone());
                }
                (None, None) if param.required => {
                    return Err(AgentError::InvalidArgument {
                        tool: self.name.clone(),
                        parameter: param.name.clone(),
                        reason: "missing required parameter".into(),
                    });
                }
                (None, None) => {}
            }
        }

        Ok(ToolArgs {
            tool: self.name.clone(),
            values,
        })
    }
}

/// Validated, coerced arguments handed to a tool handler
#[derive(Clone, Debug)]
pub struct ToolArgs {
    tool: String,
    values: Map<String, Value>,
}

impl ToolArgs {
    fn missing(&self, name: &str) -> AgentError {
        AgentError::InvalidArgument {
            tool: self.tool.clone(),
            parameter: name.into(),
            reason: "missing required parameter".into(),
        }
    }

    /// String argument; fails if absent
    pub fn str(&self, name: &str) -> Result<&str> {
        self.opt_str(name).ok_or_else(|| self.missing(name))
    }

    pub fn opt_str(&self, name: &str) -> Option<&str> {
        self.values.get(name).and_then(Value::as_str)
    }

    /// Integer argument; fails if absent
    pub fn i64(&self, name: &str) -> Result<i64> {
        self.values
            .get(name)
            .and_then(Value::as_i64)
            .ok_or_else(|| self.missing(name))
    }

    /// Numeric argument; fails if absent
    pub fn f64(&self, name: &str) -> Result<f64> {
        self.values
            .get(name)
            .and_then(Value::as_f64)
            .ok_or_else(|| self.missing(name))
    }

    pub fn opt_bool(&self, name: &str) -> Option<bool> {
        self.values.get(name).and_then(Value::as_bool)
    }

    /// All validated values
    pub const fn values(&self) -> &Map<String, Value> {
        &self.values
    }
}

/// Tool trait - implement to add new capabilities
#[async_trait]
pub trait Tool: Send + Sync {
    /// Get the tool's schema for function calling
    fn schema(&self) -> ToolSchema;

    /// Execute the tool with validated arguments
    async fn execute(&self, args: &ToolArgs) -> Result<String>;
}

/// Tool backed by a plain function, for lookup-table style tools
pub struct FnTool<F> {
    schema: ToolSchema,
    handler: F,
}

impl<F> FnTool<F>
where
    F: Fn(&ToolArgs) -> Result<String> + Send + Sync,
{
    pub const fn new(schema: ToolSchema, handler: F) -> Self {
        Self { schema, handler }
    }
}

#[async_trait]
impl<F> Tool for FnTool<F>
where
    F: Fn(&ToolArgs) -> Result<String> + Send + Sync,
{
    fn schema(&self) -> ToolSchema {
        self.schema.clone()
    }

    async fn execute(&self, args: &ToolArgs) -> Result<String> {
        (self.handler)(args)
    }
}

struct RegisteredTool {
    schema: ToolSchema,
    tool: Arc<dyn Tool>,
}

/// Registry for available tools
#[derive(Default)]
pub struct ToolRegistry {
    tools: Vec<RegisteredTool>,
    index: HashMap<String, usize>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new tool
    pub fn register<T: Tool + 'static>(&mut self, tool: T) -> Result<()> {
        self.register_arc(Arc::new(tool))
    }

    /// Register a shared tool. The first registration of a name wins.
    pub fn register_arc(&mut self, tool: Arc<dyn Tool>) -> Result<()> {
        let schema = tool.schema();
        if self.index.contains_key(&schema.name) {
            return Err(AgentError::DuplicateTool(schema.name));
        }
        self.index.insert(schema.name.clone(), self.tools.len());
        self.tools.push(RegisteredTool { schema, tool });
        Ok(())
    }

    /// Look up a tool by name
    pub fn resolve(&self, name: &str) -> Result<Arc<dyn Tool>> {
        self.index
            .get(name)
            .map(|&i| Arc::clone(&self.tools[i].tool))
            .ok_or_else(|| AgentError::UnknownTool(name.into()))
    }

    /// Schema captured at registration time
    pub fn schema(&self, name: &str) -> Option<&ToolSchema> {
        self.index.get(name).map(|&i| &self.tools[i].schema)
    }

    /// Validate and execute a tool call, returning the handler's text
    pub async fn invoke(&self, call: &ToolCall) -> Result<String> {
        let &i = self
            .index
            .get(&call.name)
            .ok_or_else(|| AgentError::UnknownTool(call.name.clone()))?;
        let entry = &self.tools[i];

        let args = entry.schema.validate(call)?;
        tracing::debug!(tool = %call.name, args = ?args.values(), "invoking tool");

        entry.tool.execute(&args).await.map_err(|e| match e {
            e @ (AgentError::InvalidArgument { .. } | AgentError::ToolExecution { .. }) => e,
            other => AgentError::ToolExecution {
                tool: call.name.clone(),
                message: other.to_string(),
            },
        })
    }

    /// All tool schemas, in registration order
    pub fn schemas(&self) -> Vec<ToolSchema> {
        self.tools.iter().map(|t| t.schema.clone()).collect()
    }

    /// Tool names, in registration order
    pub fn names(&self) -> Vec<&str> {
        self.tools.iter().map(|t| t.schema.name.as_str()).collect()
    }

    /// Number of registered tools
    pub fn len(&self) -> usize {
        self.tools.len()
    }

    /// Check if empty
    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    /// Generate system prompt section describing available tools, for
    /// endpoints without native function calling
    pub fn generate_prompt_section(&self) -> String {
        let mut prompt = String::from("## Available Tools\n\n");
        prompt.push_str("You can use the following tools by responding with a JSON block:\n\n");
        prompt.push_str("```tool\n{\"tool\": \"tool_name\", \"arguments\": {\"arg\": \"value\"}}\n```\n\n");

        for entry in &self.tools {
            let schema = &entry.schema;
            let _ = writeln!(prompt, "### {}", schema.name);
            let _ = writeln!(prompt, "{}", schema.description);

            if !schema.parameters.is_empty() {
                prompt.push_str("**Parameters:**\n");
                for param in &schema.parameters {
                    let required = if param.required { " (required)" } else { "" };
                    let choices = param
                        .enum_values
                        .as_ref()
                        .map(|v| format!(" One of: {}.", v.join(", ")))
                        .unwrap_or_default();
                    let _ = writeln!(
                        prompt,
                        "- `{}` ({}){}: {}{}",
                        param.name,
                        param.param_type.as_str(),
                        required,
                        param.description,
                        choices
                    );
                }
            }
            prompt.push('\n');
        }

        prompt
    }
}
