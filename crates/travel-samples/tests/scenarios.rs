use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use futures::stream;
use pretty_assertions::assert_eq;
use serde_json::json;
use tokio_util::sync::CancellationToken;

use travel_samples::scenario::front_desk_pipeline;
use travel_samples::tools::Preferences;
use travel_samples::{HANDOFF_SEED, Scenario, TravelPlan};
use turnloop_core::gateway::{Completion, CompletionRequest, CompletionStream, ModelGateway, ModelReply, StreamChunk};
use turnloop_core::{AgentConfig, AgentError, Message, Result, Role, StreamingUpdate, ToolCall};

/// Replays queued replies and keeps every request's messages
#[derive(Default)]
struct Replay {
    replies: Mutex<VecDeque<ModelReply>>,
    seen: Mutex<Vec<Vec<Message>>>,
}

impl Replay {
    fn new(replies: impl IntoIterator<Item = ModelReply>) -> Arc<Self> {
        Arc::new(Self {
            replies: Mutex::new(replies.into_iter().collect()),
            seen: Mutex::new(Vec::new()),
        })
    }

    fn next(&self, request: &CompletionRequest<'_>) -> Result<ModelReply> {
        self.seen.lock().unwrap().push(request.messages.to_vec());
        self.replies
            .lock()
            .unwrap()
            .pop_front()
            .ok_or_else(|| AgentError::Transport("script exhausted".into()))
    }
}

#[async_trait]
impl ModelGateway for Replay {
    fn name(&self) -> &str {
        "replay"
    }

    async fn health_check(&self) -> Result<bool> {
        Ok(true)
    }

    async fn complete(&self, request: &CompletionRequest<'_>) -> Result<Completion> {
        Ok(Completion {
            reply: self.next(request)?,
            model: "replay".into(),
            usage: None,
            finish_reason: None,
        })
    }

    async fn complete_stream(&self, request: &CompletionRequest<'_>) -> Result<CompletionStream> {
        let chunks = match self.next(request)? {
            ModelReply::Text(text) => vec![StreamChunk::text(text), StreamChunk::finished(Vec::new(), None)],
            ModelReply::Structured(value) => {
                vec![StreamChunk::text(value.to_string()), StreamChunk::finished(Vec::new(), None)]
            }
            ModelReply::ToolCalls(calls) => vec![StreamChunk::finished(calls, None)],
        };
        Ok(Box::pin(stream::iter(chunks.into_iter().map(Ok))))
    }
}

fn text(s: &str) -> ModelReply {
    ModelReply::Text(s.into())
}

#[tokio::test]
async fn tool_use_scenario_runs_real_tools() {
    let gateway = Replay::new([
        ModelReply::ToolCalls(vec![ToolCall::new("get_weather").with_argument("location", "Tokyo")]),
        text("Sunny in Tokyo."),
        ModelReply::ToolCalls(vec![
            ToolCall::new("estimate_trip_cost")
                .with_argument("destination", "Rome")
                .with_argument("days", 5)
                .with_argument("budget_level", "Luxury"),
        ]),
        text("About $4580."),
        text("Try Paris."),
    ]);
    let scenario = Scenario::find("tool-use").unwrap();
    let agent = scenario
        .build_agent(gateway.clone(), AgentConfig::default(), &Preferences::new())
        .unwrap();

    let mut streamed = String::new();
    let mut sink = |update: StreamingUpdate| streamed.push_str(&update.delta);
    let outcomes = scenario
        .run(&agent, &mut sink, &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(outcomes.len(), 3);
    assert_eq!(outcomes[1].tool_rounds, 1);
    assert_eq!(streamed, "Sunny in Tokyo.About $4580.Try Paris.");

    let seen = gateway.seen.lock().unwrap();
    let weather = seen[1].last().unwrap();
    assert_eq!(weather.role, Role::Tool);
    assert_eq!(weather.content, "Tokyo weather: Sunny, 24°C (75°F)");
    let cost = seen[3].last().unwrap();
    assert!(cost.content.starts_with("Trip cost estimate for Rome (5 days, luxury):"));

    // All three prompts share one thread
    let last_request = seen.last().unwrap();
    let users = last_request.iter().filter(|m| m.role == Role::User).count();
    assert_eq!(users, 3);
}

#[tokio::test]
async fn design_patterns_scenario_saves_preferences() {
    let gateway = Replay::new([
        text("Hello! I'm TravelAgent."),
        ModelReply::ToolCalls(vec![
            ToolCall::new("save_user_preference")
                .with_argument("preference_type", "budget")
                .with_argument("preference_value", "luxury"),
        ]),
        text("Noted."),
        text("Kyoto."),
    ]);
    let preferences = Preferences::new();
    let scenario = Scenario::find("design-patterns").unwrap();
    let agent = scenario
        .build_agent(gateway, AgentConfig::default(), &preferences)
        .unwrap();

    let mut sink = |_: StreamingUpdate| {};
    scenario
        .run(&agent, &mut sink, &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(preferences.get("budget").await.as_deref(), Some("luxury"));
}

#[tokio::test]
async fn planning_scenario_returns_a_travel_plan() {
    let plan = json!({
        "main_task": "Plan a family trip from Singapore to Melbourne",
        "subtasks": [
            {"assigned_agent": "FlightBooking", "task_details": "Book flights for 2 adults and 2 children"},
            {"assigned_agent": "HotelBooking", "task_details": "Find a family hotel"}
        ]
    });
    let gateway = Replay::new([ModelReply::Structured(plan)]);
    let scenario = Scenario::find("planning").unwrap();
    let agent = scenario
        .build_agent(gateway, AgentConfig::default(), &Preferences::new())
        .unwrap();
    assert!(agent.config().response_format.is_structured());

    let mut sink = |_: StreamingUpdate| {};
    let outcomes = scenario
        .run(&agent, &mut sink, &CancellationToken::new())
        .await
        .unwrap();

    let plan: TravelPlan = outcomes[0].parse().unwrap();
    assert_eq!(plan.subtasks.len(), 2);
    assert_eq!(plan.subtasks[0].assigned_agent, "FlightBooking");
}

#[tokio::test]
async fn multi_agent_runs_as_a_pipeline() {
    let scenario = Scenario::find("multi-agent").unwrap();
    let gateway = Replay::new([text("Visit Montmartre at dawn."), text("Approved.")]);
    assert!(scenario
        .build_agent(gateway.clone(), AgentConfig::default(), &Preferences::new())
        .is_err());

    let router = front_desk_pipeline(gateway.clone(), AgentConfig::default()).unwrap();
    let outcome = router.run(HANDOFF_SEED).await.unwrap();

    assert_eq!(outcome.final_text, "Approved.");
    let agents: Vec<_> = outcome.trace.iter().map(|t| t.agent.as_str()).collect();
    assert_eq!(agents, ["FrontDesk", "Concierge"]);

    let seen = gateway.seen.lock().unwrap();
    assert!(seen[1][0].content.contains("hotel concierge"));
    assert_eq!(seen[1][1].content, "Visit Montmartre at dawn.");
}
