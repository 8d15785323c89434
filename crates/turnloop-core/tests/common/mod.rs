//! Scripted gateway shared by the integration tests

#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use futures::StreamExt;
use turnloop_core::gateway::{Completion, CompletionRequest, CompletionStream, ModelGateway, ModelReply, StreamChunk};
use turnloop_core::tool::{FnTool, ParameterSchema, ToolRegistry, ToolSchema};
use turnloop_core::{AgentError, Message, Result};

/// One scripted model call
pub enum Step {
    Reply(ModelReply),

    /// The call fails with a transport error
    Fail(String),

    /// Streams the text, then never finishes; non-streaming calls hang
    Stall(String),

    /// Never answers, not even by opening a stream
    Hang,
}

/// What the agent sent for one model call
#[derive(Clone, Debug)]
pub struct RecordedRequest {
    pub messages: Vec<Message>,
    pub tools: Vec<String>,
    pub structured: bool,
}

/// Gateway that replays a fixed script and records every request
#[derive(Default)]
pub struct ScriptedGateway {
    steps: Mutex<VecDeque<Step>>,
    requests: Mutex<Vec<RecordedRequest>>,
}

impl ScriptedGateway {
    pub fn new(steps: impl IntoIterator<Item = Step>) -> Arc<Self> {
        Arc::new(Self {
            steps: Mutex::new(steps.into_iter().collect()),
            requests: Mutex::new(Vec::new()),
        })
    }

    /// Gateway answering each call with the given replies, in order
    pub fn replies(replies: impl IntoIterator<Item = ModelReply>) -> Arc<Self> {
        Self::new(replies.into_iter().map(Step::Reply))
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn calls(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    fn next_step(&self, request: &CompletionRequest<'_>) -> Step {
        self.requests.lock().unwrap().push(RecordedRequest {
            messages: request.messages.to_vec(),
            tools: request.tools.iter().map(|t| t.name.clone()).collect(),
            structured: request.response_format.is_structured(),
        });
        self.steps
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Step::Fail("script exhausted".into()))
    }
}

fn completion(reply: ModelReply) -> Completion {
    Completion {
        reply,
        model: "scripted".into(),
        usage: None,
        finish_reason: None,
    }
}

fn text_chunks(text: &str) -> Vec<Result<StreamChunk>> {
    let chars: Vec<char> = text.chars().collect();
    chars
        .chunks(5)
        .map(|c| Ok(StreamChunk::text(c.iter().collect::<String>())))
        .collect()
}

#[async_trait]
impl ModelGateway for ScriptedGateway {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn health_check(&self) -> Result<bool> {
        Ok(true)
    }

    async fn complete(&self, request: &CompletionRequest<'_>) -> Result<Completion> {
        match self.next_step(request) {
            Step::Reply(reply) => Ok(completion(reply)),
            Step::Fail(message) => Err(AgentError::Transport(message)),
            Step::Stall(_) | Step::Hang => futures::future::pending().await,
        }
    }

    async fn complete_stream(&self, request: &CompletionRequest<'_>) -> Result<CompletionStream> {
        let chunks = match self.next_step(request) {
            Step::Reply(ModelReply::Text(text)) => {
                let mut chunks = text_chunks(&text);
                chunks.push(Ok(StreamChunk::finished(Vec::new(), None)));
                chunks
            }
            Step::Reply(ModelReply::Structured(value)) => {
                let mut chunks = text_chunks(&value.to_string());
                chunks.push(Ok(StreamChunk::finished(Vec::new(), None)));
                chunks
            }
            Step::Reply(ModelReply::ToolCalls(calls)) => vec![Ok(StreamChunk::finished(calls, None))],
            Step::Fail(message) => return Err(AgentError::Transport(message)),
            Step::Hang => return futures::future::pending().await,
            Step::Stall(text) => {
                let head = futures::stream::iter(text_chunks(&text));
                return Ok(Box::pin(head.chain(futures::stream::pending())));
            }
        };
        Ok(Box::pin(futures::stream::iter(chunks)))
    }
}

/// Registry with a single `get_weather(location)` tool
pub fn weather_tools() -> Arc<ToolRegistry> {
    let mut registry = ToolRegistry::new();
    registry
        .register(FnTool::new(
            ToolSchema::new("get_weather", "Get the current weather for a location")
                .param(ParameterSchema::string("location", "City name")),
            |args| Ok(format!("Sunny, 24°C in {}", args.str("location")?)),
        ))
        .unwrap();
    Arc::new(registry)
}
