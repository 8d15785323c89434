mod common;

use std::sync::{Arc, Mutex};

use common::{ScriptedGateway, Step, weather_tools};
use pretty_assertions::assert_eq;
use tokio_util::sync::CancellationToken;
use turnloop_core::{AgentDefinition, AgentError, HandoffRouter, ModelReply, Role, StreamingUpdate, ToolCall};

fn front_desk_pipeline() -> Vec<AgentDefinition> {
    vec![
        AgentDefinition::new(
            "FrontDesk",
            "Gather the traveller's destination and hand off to the concierge.",
        ),
        AgentDefinition::new("Concierge", "Recommend things to do at the destination.")
            .with_tools(weather_tools()),
    ]
}

#[tokio::test]
async fn test_two_stage_handoff() {
    let gateway = ScriptedGateway::replies([
        ModelReply::Text("Traveller wants Paris.".into()),
        ModelReply::ToolCalls(vec![ToolCall::new("get_weather").with_argument("location", "Paris")]),
        ModelReply::Text("Visit the Louvre; it is sunny.".into()),
    ]);
    let router = HandoffRouter::new(gateway.clone(), front_desk_pipeline()).unwrap();

    let outcome = router.run("I want to go to Paris.").await.unwrap();

    assert_eq!(outcome.final_text, "Visit the Louvre; it is sunny.");
    let agents: Vec<_> = outcome.trace.iter().map(|t| t.agent.as_str()).collect();
    assert_eq!(agents, vec!["FrontDesk", "Concierge"]);
    assert_eq!(outcome.trace[0].seed, "I want to go to Paris.");
    assert_eq!(outcome.trace[1].seed, "Traveller wants Paris.");
    assert_eq!(outcome.trace[0].tool_rounds, 0);
    assert_eq!(outcome.trace[1].tool_rounds, 1);

    let requests = gateway.requests();
    assert_eq!(requests.len(), 3);
    assert!(requests[0].tools.is_empty());
    assert_eq!(requests[1].tools, vec!["get_weather"]);

    // The concierge starts fresh: its own instructions and the front desk's output
    let concierge = &requests[1].messages;
    assert_eq!(concierge.len(), 2);
    assert_eq!(concierge[0].role, Role::System);
    assert!(concierge[0].content.starts_with("Recommend things to do"));
    assert_eq!(concierge[1].content, "Traveller wants Paris.");
}

#[tokio::test]
async fn test_streaming_handoff_tags_each_agent() {
    let gateway = ScriptedGateway::replies([
        ModelReply::Text("Traveller wants Paris.".into()),
        ModelReply::Text("Try a Seine cruise.".into()),
    ]);
    let router = HandoffRouter::new(gateway, front_desk_pipeline()).unwrap();

    let updates = Arc::new(Mutex::new(Vec::<StreamingUpdate>::new()));
    let collected = Arc::clone(&updates);
    let mut sink = move |update: StreamingUpdate| collected.lock().unwrap().push(update);

    let outcome = router
        .run_streaming("I want to go to Paris.", &mut sink, &CancellationToken::new())
        .await
        .unwrap();
    assert_eq!(outcome.final_text, "Try a Seine cruise.");

    let updates = updates.lock().unwrap();
    let text_for = |agent: &str| -> String {
        updates
            .iter()
            .filter(|u| u.agent == agent)
            .map(|u| u.delta.as_str())
            .collect()
    };
    assert_eq!(text_for("FrontDesk"), "Traveller wants Paris.");
    assert_eq!(text_for("Concierge"), "Try a Seine cruise.");

    let finals: Vec<_> = updates
        .iter()
        .filter(|u| u.is_final)
        .map(|u| u.agent.as_str())
        .collect();
    assert_eq!(finals, vec!["FrontDesk", "Concierge"]);
}

#[tokio::test]
async fn test_stage_failure_stops_pipeline() {
    let gateway = ScriptedGateway::new([
        Step::Reply(ModelReply::Text("Traveller wants Paris.".into())),
        Step::Fail("endpoint unavailable".into()),
    ]);
    let router = HandoffRouter::new(gateway.clone(), front_desk_pipeline()).unwrap();

    let err = router.run("I want to go to Paris.").await.unwrap_err();

    match &err {
        AgentError::Stage { agent, source } => {
            assert_eq!(agent, "Concierge");
            assert!(matches!(**source, AgentError::Transport(_)));
        }
        other => panic!("expected Stage, got {other:?}"),
    }
    assert!(err.is_retryable());
    assert_eq!(gateway.calls(), 2);
}

#[tokio::test]
async fn test_stage_round_limit_names_the_stage() {
    let gateway = ScriptedGateway::replies([
        ModelReply::Text("Traveller wants Paris.".into()),
        ModelReply::ToolCalls(vec![ToolCall::new("get_weather").with_argument("location", "Paris")]),
    ]);
    let base = turnloop_core::AgentConfig {
        max_tool_rounds: 0,
        ..Default::default()
    };
    let router = HandoffRouter::new(gateway.clone(), front_desk_pipeline())
        .unwrap()
        .with_base_config(base);

    let err = router.run("I want to go to Paris.").await.unwrap_err();

    assert!(err.to_string().contains("Concierge"), "{err}");
    match err {
        AgentError::Stage { agent, source } => {
            assert_eq!(agent, "Concierge");
            assert!(matches!(*source, AgentError::ToolLoopExceeded { limit: 0, .. }));
        }
        other => panic!("expected Stage, got {other:?}"),
    }
    assert_eq!(gateway.calls(), 2);
}

#[test]
fn test_duplicate_stage_names_rejected() {
    let gateway = ScriptedGateway::replies(Vec::new());
    let stages = vec![
        AgentDefinition::new("FrontDesk", "a"),
        AgentDefinition::new("FrontDesk", "b"),
    ];

    let result = HandoffRouter::new(gateway, stages);
    assert!(matches!(result, Err(AgentError::DuplicateAgent(name)) if name == "FrontDesk"));
}

#[test]
fn test_empty_pipeline_rejected() {
    let gateway = ScriptedGateway::replies(Vec::new());
    assert!(matches!(
        HandoffRouter::new(gateway, Vec::new()),
        Err(AgentError::Config(_))
    ));
}

#[tokio::test]
async fn test_cancelled_pipeline_stops_before_any_call() {
    let gateway = ScriptedGateway::replies([ModelReply::Text("unused".into())]);
    let router = HandoffRouter::new(gateway.clone(), front_desk_pipeline()).unwrap();
    let cancel = CancellationToken::new();
    cancel.cancel();

    let err = router.run_with_cancel("I want to go to Paris.", &cancel).await.unwrap_err();

    assert!(matches!(err, AgentError::Cancelled { .. }));
    assert_eq!(gateway.calls(), 0);
}
