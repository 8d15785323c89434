//! OpenAI-compatible chat-completions gateway.
//!
//! Works against GitHub Models, OpenAI, and any server exposing the same
//! `/chat/completions` API (Ollama's `/v1`, LM Studio, vLLM).

use std::collections::BTreeMap;
use std::time::Duration;

use async_trait::async_trait;
use futures::StreamExt;
use serde::Deserialize;
use serde_json::{Map, Value, json};
use tracing::debug;
use turnloop_core::gateway::{
    Completion, CompletionRequest, CompletionStream, FinishReason, ModelGateway, ModelReply, ResponseFormat,
    StreamChunk, TokenUsage,
};
use turnloop_core::{AgentError, Message, Result, Role, ToolCall};

use crate::config::GatewayConfig;
use crate::http::{SseLine, bearer_headers, parse_sse_line, status_to_error, transport_error};

/// Gateway speaking the OpenAI chat-completions wire format
pub struct OpenAiCompatibleGateway {
    client: reqwest::Client,
    config: GatewayConfig,
}

impl OpenAiCompatibleGateway {
    /// Fails with `Authentication` when the endpoint needs a credential and
    /// none is configured
    pub fn new(config: GatewayConfig) -> Result<Self> {
        if config.requires_key && config.api_key.is_none() {
            return Err(AgentError::Authentication(format!(
                "no credential configured for {}; set GH_TOKEN (or GITHUB_TOKEN / OPENAI_API_KEY)",
                config.endpoint
            )));
        }

        let client = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .pool_max_idle_per_host(10)
            .build()
            .map_err(|e| AgentError::Config(format!("failed to build HTTP client: {e}")))?;

        Ok(Self { client, config })
    }

    /// Hosted endpoint from environment variables
    pub fn from_env() -> Result<Self> {
        Self::new(GatewayConfig::from_env())
    }

    pub const fn config(&self) -> &GatewayConfig {
        &self.config
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{path}", self.config.endpoint.trim_end_matches('/'))
    }

    fn build_request_body(&self, request: &CompletionRequest<'_>, stream: bool) -> Value {
        let options = request.options;
        let model = if options.model.is_empty() {
            self.config.model.as_str()
        } else {
            options.model.as_str()
        };

        let mut body = Map::new();
        body.insert("model".into(), model.into());
        body.insert("messages".into(), wire_messages(request.messages).into());
        body.insert("stream".into(), stream.into());

        if let Some(temp) = options.temperature {
            body.insert("temperature".into(), temp.into());
        }
        if let Some(max) = options.max_tokens {
            body.insert("max_tokens".into(), max.into());
        }
        if let Some(top_p) = options.top_p {
            body.insert("top_p".into(), top_p.into());
        }
        if !options.stop_sequences.is_empty() {
            body.insert("stop".into(), json!(options.stop_sequences));
        }

        if !request.tools.is_empty() {
            let tools: Vec<Value> = request
                .tools
                .iter()
                .map(|t| {
                    json!({
                        "type": "function",
                        "function": {
                            "name": t.name,
                            "description": t.description,
                            "parameters": t.json_schema(),
                        }
                    })
                })
                .collect();
            body.insert("tools".into(), tools.into());
        }

        if let ResponseFormat::JsonSchema {
            name,
            description,
            schema,
        } = request.response_format
        {
            let mut spec = json!({ "name": name, "schema": schema, "strict": true });
            if let Some(description) = description {
                spec["description"] = description.clone().into();
            }
            body.insert(
                "response_format".into(),
                json!({ "type": "json_schema", "json_schema": spec }),
            );
        }

        Value::Object(body)
    }

    async fn post(&self, body: &Value, timeout: Option<Duration>) -> Result<reqwest::Response> {
        let mut builder = self
            .client
            .post(self.url("chat/completions"))
            .headers(bearer_headers(self.config.api_key.as_deref()))
            .json(body);
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }

        let response = builder.send().await.map_err(|e| transport_error(&e))?;
        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(status_to_error(status, &text));
        }
        Ok(response)
    }
}

#[async_trait]
impl ModelGateway for OpenAiCompatibleGateway {
    fn name(&self) -> &str {
        &self.config.name
    }

    async fn health_check(&self) -> Result<bool> {
        let result = self
            .client
            .get(self.url("models"))
            .headers(bearer_headers(self.config.api_key.as_deref()))
            .timeout(Duration::from_secs(10))
            .send()
            .await;

        match result {
            Ok(response) if response.status().is_success() => Ok(true),
            Ok(response) => {
                tracing::warn!(gateway = %self.config.name, status = %response.status(), "health check failed");
                Ok(false)
            }
            Err(e) => {
                tracing::warn!(gateway = %self.config.name, error = %e, "health check failed");
                Ok(false)
            }
        }
    }

    async fn complete(&self, request: &CompletionRequest<'_>) -> Result<Completion> {
        let body = self.build_request_body(request, false);
        debug!(gateway = %self.config.name, model = %body["model"], "chat completion");

        let response = self
            .post(&body, Some(Duration::from_secs(self.config.timeout_secs)))
            .await?;
        let data: ChatResponse = response
            .json()
            .await
            .map_err(|e| AgentError::Parse(format!("unexpected completion body: {e}")))?;

        let model = data.model.unwrap_or_else(|| request.options.model.clone());
        let choice = data
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| AgentError::Parse("completion has no choices".into()))?;

        let tool_calls = choice.message.tool_calls.unwrap_or_default();
        let reply = if tool_calls.is_empty() {
            let text = choice.message.content.unwrap_or_default();
            if request.response_format.is_structured() {
                let value = serde_json::from_str(text.trim())
                    .map_err(|e| AgentError::Parse(format!("structured reply is not valid JSON: {e}")))?;
                ModelReply::Structured(value)
            } else {
                ModelReply::Text(text)
            }
        } else {
            ModelReply::ToolCalls(
                tool_calls
                    .into_iter()
                    .map(|c| decode_call(c.id, c.function.name, &c.function.arguments))
                    .collect(),
            )
        };

        Ok(Completion {
            reply,
            model,
            usage: data.usage.map(Into::into),
            finish_reason: choice.finish_reason.as_deref().and_then(parse_finish_reason),
        })
    }

    async fn complete_stream(&self, request: &CompletionRequest<'_>) -> Result<CompletionStream> {
        let body = self.build_request_body(request, true);
        debug!(gateway = %self.config.name, model = %body["model"], "streaming chat completion");

        let response = self.post(&body, None).await?;
        let byte_stream = response.bytes_stream();

        let stream = async_stream::stream! {
            let mut buffer: Vec<u8> = Vec::new();
            let mut calls: BTreeMap<usize, PartialCall> = BTreeMap::new();
            let mut usage = None;
            futures::pin_mut!(byte_stream);

            'read: while let Some(next) = byte_stream.next().await {
                let bytes = match next {
                    Ok(bytes) => bytes,
                    Err(e) => {
                        yield Err(transport_error(&e));
                        return;
                    }
                };
                buffer.extend_from_slice(&bytes);

                while let Some(end) = buffer.iter().position(|&b| b == b'\n') {
                    let raw: Vec<u8> = buffer.drain(..=end).collect();
                    let line = String::from_utf8_lossy(&raw);

                    let data = match parse_sse_line(line.trim()) {
                        SseLine::Data(data) => data,
                        SseLine::Done => break 'read,
                        SseLine::Ignored => continue,
                    };
                    let chunk: WireStreamChunk = match serde_json::from_str(data) {
                        Ok(chunk) => chunk,
                        Err(e) => {
                            yield Err(AgentError::Parse(format!("malformed stream event: {e}")));
                            return;
                        }
                    };

                    if let Some(u) = chunk.usage {
                        usage = Some(TokenUsage::from(u));
                    }
                    for choice in chunk.choices {
                        for fragment in choice.delta.tool_calls.unwrap_or_default() {
                            calls.entry(fragment.index).or_default().absorb(fragment);
                        }
                        if let Some(text) = choice.delta.content.filter(|t| !t.is_empty()) {
                            yield Ok(StreamChunk::text(text));
                        }
                    }
                }
            }

            let tool_calls: Vec<ToolCall> = calls
                .into_values()
                .map(|c| decode_call(c.id, c.name, &c.arguments))
                .collect();
            yield Ok(StreamChunk::finished(tool_calls, usage));
        };

        Ok(Box::pin(stream))
    }
}

/// Map history to wire messages. Each round's run of tool messages is
/// preceded by the assistant message that requested those calls.
fn wire_messages(messages: &[Message]) -> Vec<Value> {
    let mut wire = Vec::with_capacity(messages.len());

    let same_round =
        |a: &Message, b: &Message| a.role == Role::Tool && b.role == Role::Tool && a.round() == b.round();
    for group in messages.chunk_by(same_round) {
        if group[0].role != Role::Tool {
            wire.extend(group.iter().map(|m| json!({ "role": m.role.to_string(), "content": m.content })));
            continue;
        }

        let requested: Vec<Value> = group
            .iter()
            .filter_map(Message::tool_call)
            .map(|call| {
                json!({
                    "id": call.id,
                    "type": "function",
                    "function": {
                        "name": call.name,
                        "arguments": Value::Object(call.arguments.clone()).to_string(),
                    }
                })
            })
            .collect();
        wire.push(json!({ "role": "assistant", "content": Value::Null, "tool_calls": requested }));

        for message in group {
            let id = message.tool_call().and_then(|c| c.id.clone());
            wire.push(json!({ "role": "tool", "tool_call_id": id, "content": message.content }));
        }
    }

    wire
}

/// Decode the JSON-encoded argument string of a tool call. Arguments that
/// do not decode to an object leave the call flagged, so the model is told
/// about it in the tool result instead of the whole turn failing.
fn decode_call(id: Option<String>, name: String, arguments: &str) -> ToolCall {
    let decoded = match arguments.trim() {
        "" => Ok(Map::new()),
        raw => match serde_json::from_str::<Value>(raw) {
            Ok(Value::Object(map)) => Ok(map),
            Ok(Value::Null) => Ok(Map::new()),
            Ok(other) => Err(format!("expected a JSON object, got {other}")),
            Err(e) => Err(format!("not valid JSON: {e}")),
        },
    };

    let mut call = ToolCall::new(name);
    call.id = id;
    match decoded {
        Ok(map) => call.with_arguments(map),
        Err(reason) => {
            tracing::warn!(tool = %call.name, %reason, "undecodable tool arguments");
            call.with_argument_error(reason)
        }
    }
}

fn parse_finish_reason(s: &str) -> Option<FinishReason> {
    match s {
        "stop" => Some(FinishReason::Stop),
        "length" => Some(FinishReason::Length),
        "tool_calls" | "function_call" => Some(FinishReason::ToolUse),
        "content_filter" => Some(FinishReason::ContentFilter),
        _ => None,
    }
}

/// Tool call assembled from stream fragments
#[derive(Default)]
struct PartialCall {
    id: Option<String>,
    name: String,
    arguments: String,
}

impl PartialCall {
    fn absorb(&mut self, fragment: WireToolCallFragment) {
        if fragment.id.is_some() {
            self.id = fragment.id;
        }
        if let Some(function) = fragment.function {
            if let Some(name) = function.name {
                self.name.push_str(&name);
            }
            if let Some(arguments) = function.arguments {
                self.arguments.push_str(&arguments);
            }
        }
    }
}

// Wire types (internal)

#[derive(Deserialize)]
struct ChatResponse {
    model: Option<String>,
    choices: Vec<WireChoice>,
    usage: Option<WireUsage>,
}

#[derive(Deserialize)]
struct WireChoice {
    message: WireMessage,
    finish_reason: Option<String>,
}

#[derive(Deserialize)]
struct WireMessage {
    content: Option<String>,
    tool_calls: Option<Vec<WireToolCall>>,
}

#[derive(Deserialize)]
struct WireToolCall {
    id: Option<String>,
    function: WireFunction,
}

#[derive(Deserialize)]
struct WireFunction {
    name: String,
    #[serde(default)]
    arguments: String,
}

#[derive(Deserialize)]
struct WireUsage {
    #[serde(default)]
    prompt_tokens: u32,
    #[serde(default)]
    completion_tokens: u32,
    #[serde(default)]
    total_tokens: u32,
}

impl From<WireUsage> for TokenUsage {
    fn from(u: WireUsage) -> Self {
        Self {
            prompt_tokens: u.prompt_tokens,
            completion_tokens: u.completion_tokens,
            total_tokens: u.total_tokens,
        }
    }
}

#[derive(Deserialize)]
struct WireStreamChunk {
    #[serde(default)]
    choices: Vec<WireStreamChoice>,
    usage: Option<WireUsage>,
}

#[derive(Deserialize)]
struct WireStreamChoice {
    #[serde(default)]
    delta: WireDelta,
}

#[derive(Default, Deserialize)]
struct WireDelta {
    content: Option<String>,
    tool_calls: Option<Vec<WireToolCallFragment>>,
}

#[derive(Deserialize)]
struct WireToolCallFragment {
    #[serde(default)]
    index: usize,
    id: Option<String>,
    function: Option<WireFunctionFragment>,
}

#[derive(Deserialize)]
struct WireFunctionFragment {
    name: Option<String>,
    arguments: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_tool_messages_get_synthesized_request() {
        let messages = vec![
            Message::system("Be brief."),
            Message::user("Weather in Paris and Rome?"),
            Message::tool(
                "Sunny",
                ToolCall::new("get_weather").with_id("c1").with_argument("location", "Paris"),
            ),
            Message::tool(
                "Rainy",
                ToolCall::new("get_weather").with_id("c2").with_argument("location", "Rome"),
            ),
            Message::assistant("Paris is sunny, Rome is rainy."),
        ];

        let wire = wire_messages(&messages);
        let roles: Vec<&str> = wire.iter().map(|m| m["role"].as_str().unwrap()).collect();
        assert_eq!(roles, vec!["system", "user", "assistant", "tool", "tool", "assistant"]);

        let requested = wire[2]["tool_calls"].as_array().unwrap();
        assert_eq!(requested.len(), 2);
        assert_eq!(requested[0]["id"], "c1");
        assert_eq!(requested[1]["function"]["name"], "get_weather");
        assert_eq!(requested[1]["function"]["arguments"], r#"{"location":"Rome"}"#);
        assert_eq!(wire[3]["tool_call_id"], "c1");
        assert_eq!(wire[4]["tool_call_id"], "c2");
        assert_eq!(wire[4]["content"], "Rainy");
    }

    #[test]
    fn test_separate_tool_runs() {
        let messages = vec![
            Message::user("a"),
            Message::tool("1", ToolCall::new("t").with_id("x")),
            Message::user("b"),
            Message::tool("2", ToolCall::new("t").with_id("y")),
        ];
        let roles: Vec<String> = wire_messages(&messages)
            .iter()
            .map(|m| m["role"].as_str().unwrap().to_string())
            .collect();
        assert_eq!(roles, vec!["user", "assistant", "tool", "user", "assistant", "tool"]);
    }

    #[test]
    fn test_consecutive_rounds_get_their_own_assistant_message() {
        let messages = vec![
            Message::user("Weather in Oslo, then Rome?"),
            Message::tool("Snow", ToolCall::new("get_weather").with_id("r1")).with_round(1),
            Message::tool("Sun", ToolCall::new("get_weather").with_id("r2")).with_round(2),
        ];
        let wire = wire_messages(&messages);

        let roles: Vec<&str> = wire.iter().map(|m| m["role"].as_str().unwrap()).collect();
        assert_eq!(roles, vec!["user", "assistant", "tool", "assistant", "tool"]);
        assert_eq!(wire[1]["tool_calls"].as_array().unwrap().len(), 1);
        assert_eq!(wire[1]["tool_calls"][0]["id"], "r1");
        assert_eq!(wire[3]["tool_calls"][0]["id"], "r2");
    }

    #[test]
    fn test_decode_call() {
        let call = decode_call(Some("c".into()), "add".into(), r#"{"number1": 1, "number2": 2}"#);
        assert_eq!(call.arguments["number2"], 2);
        assert_eq!(call.id.as_deref(), Some("c"));
        assert!(call.argument_error.is_none());

        assert!(decode_call(None, "get_current_time".into(), "").arguments.is_empty());

        let broken = decode_call(Some("b".into()), "add".into(), "{number1: 1");
        assert_eq!(broken.id.as_deref(), Some("b"));
        assert!(broken.argument_error.unwrap().starts_with("not valid JSON"));

        let list = decode_call(None, "add".into(), "[1, 2]");
        assert!(list.arguments.is_empty());
        assert!(list.argument_error.unwrap().contains("expected a JSON object"));
    }

    #[test]
    fn test_partial_calls_accumulate() {
        let mut call = PartialCall::default();
        call.absorb(WireToolCallFragment {
            index: 0,
            id: Some("c1".into()),
            function: Some(WireFunctionFragment {
                name: Some("get_weather".into()),
                arguments: Some(r#"{"loca"#.into()),
            }),
        });
        call.absorb(WireToolCallFragment {
            index: 0,
            id: None,
            function: Some(WireFunctionFragment {
                name: None,
                arguments: Some(r#"tion": "Oslo"}"#.into()),
            }),
        });

        let decoded = decode_call(call.id, call.name, &call.arguments);
        assert_eq!(decoded.name, "get_weather");
        assert_eq!(decoded.arguments["location"], "Oslo");
    }
}
