//! Command Handlers

use std::io::Write;
use std::path::Path;

use anyhow::Context;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio_util::sync::CancellationToken;

use travel_samples::{Scenario, TravelPlan, front_desk_pipeline};
use turnloop_core::{
    Agent, AgentError, Conversation, Session, StreamSink, StreamingUpdate, TurnOutcome,
};

use crate::state::AppState;

/// Writes agent-tagged fragments to stdout, printing the agent name whenever
/// the speaker changes
#[derive(Default)]
struct ConsoleSink {
    speaker: Option<String>,
}

impl StreamSink for ConsoleSink {
    fn on_fragment(&mut self, update: StreamingUpdate) {
        let mut out = std::io::stdout().lock();
        if self.speaker.as_deref() != Some(update.agent.as_str()) {
            let _ = write!(out, "{}: ", update.agent);
            self.speaker = Some(update.agent);
        }
        if update.is_final {
            let _ = writeln!(out);
            self.speaker = None;
        } else {
            let _ = write!(out, "{}", update.delta);
        }
        let _ = out.flush();
    }
}

/// Cancels `token` on Ctrl-C until the returned task is aborted
fn cancel_on_ctrl_c(token: &CancellationToken) -> tokio::task::JoinHandle<()> {
    let token = token.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("interrupted, cancelling turn");
            token.cancel();
        }
    })
}

/// One turn, streamed or printed whole
async fn turn(
    state: &AppState,
    agent: &Agent,
    conversation: &mut Conversation,
    input: &str,
    cancel: &CancellationToken,
) -> turnloop_core::Result<TurnOutcome> {
    if state.stream {
        let mut sink = ConsoleSink::default();
        agent.run_streaming(conversation, input, &mut sink, cancel).await
    } else {
        let outcome = agent.run_with_cancel(conversation, input, cancel).await?;
        println!("{}: {}", agent.name(), outcome.text());
        Ok(outcome)
    }
}

pub fn list() {
    for scenario in Scenario::all() {
        println!("{:<16} {}", scenario.name, scenario.summary);
    }
}

pub async fn scenario(state: &AppState, name: &str) -> anyhow::Result<()> {
    let scenario = Scenario::find(name)?;
    println!("=== {} ===\n", scenario.name);

    if scenario.handoff {
        for prompt in scenario.prompts {
            handoff(state, prompt).await?;
        }
        return Ok(());
    }

    let agent = scenario.build_agent(state.gateway.clone(), state.base.clone(), &state.preferences)?;
    let mut conversation = agent.new_conversation();
    let cancel = CancellationToken::new();
    let watcher = cancel_on_ctrl_c(&cancel);

    for prompt in scenario.prompts {
        println!("User: {prompt}\n");
        let outcome = turn(state, &agent, &mut conversation, prompt, &cancel).await;
        let outcome = match outcome {
            Ok(outcome) => outcome,
            Err(e) => {
                watcher.abort();
                return Err(e.into());
            }
        };

        if scenario.structured {
            let plan: TravelPlan = outcome.parse()?;
            println!("\n{plan}");
        }
        println!();
    }
    watcher.abort();

    let saved = state.preferences.snapshot().await;
    if !saved.is_empty() {
        println!("Saved preferences:");
        for (kind, value) in saved {
            println!("  {kind}: {value}");
        }
    }
    Ok(())
}

pub async fn handoff(state: &AppState, seed: &str) -> anyhow::Result<()> {
    let router = front_desk_pipeline(state.gateway.clone(), state.base.clone())?;
    let cancel = CancellationToken::new();
    let watcher = cancel_on_ctrl_c(&cancel);

    println!("User: {seed}\n");
    let result = if state.stream {
        let mut sink = ConsoleSink::default();
        router.run_streaming(seed, &mut sink, &cancel).await
    } else {
        router.run_with_cancel(seed, &cancel).await
    };
    watcher.abort();
    let outcome = result?;

    if !state.stream {
        for stage in &outcome.trace {
            println!("{}: {}\n", stage.agent, stage.output);
        }
    }
    println!("\nFinal result:\n{}", outcome.final_text);
    Ok(())
}

pub async fn chat(
    state: &AppState,
    scenario: &str,
    resume: Option<&Path>,
    save: Option<&Path>,
) -> anyhow::Result<()> {
    let scenario = Scenario::find(scenario)?;
    let agent = scenario.build_agent(state.gateway.clone(), state.base.clone(), &state.preferences)?;

    let mut session = match resume {
        Some(path) => Session::load_from(path)
            .with_context(|| format!("loading session from {}", path.display()))?,
        None => Session::with_conversation(agent.new_conversation()),
    };
    session.metadata.model = Some(state.base.generation.model.clone());

    println!(
        "Chatting with {} ({} messages so far). Type `exit` to quit, `/reset` to start over.",
        agent.name(),
        session.message_count()
    );

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        print!("> ");
        std::io::stdout().flush()?;

        let line = tokio::select! {
            line = lines.next_line() => line?,
            _ = tokio::signal::ctrl_c() => None,
        };
        let Some(line) = line else { break };
        let input = line.trim();

        match input {
            "" => continue,
            "exit" | "quit" => break,
            "/reset" => {
                session.conversation.reset();
                println!("History cleared.");
                continue;
            }
            _ => {}
        }

        let cancel = CancellationToken::new();
        let watcher = cancel_on_ctrl_c(&cancel);
        let result = turn(state, &agent, &mut session.conversation, input, &cancel).await;
        watcher.abort();

        match result {
            Ok(_) => {}
            Err(AgentError::Cancelled { .. }) => println!("\n(cancelled)"),
            Err(e) if e.is_retryable() || matches!(e, AgentError::ToolLoopExceeded { .. }) => {
                eprintln!("Error: {}", e.user_message());
            }
            Err(e) => return Err(e.into()),
        }

        session.touch();
        if let Some(path) = save {
            session
                .save_to(path)
                .with_context(|| format!("saving session to {}", path.display()))?;
        }
    }

    if let Some(path) = save {
        session.save_to(path)?;
        println!("Session '{}' saved to {}", session.title(), path.display());
    }
    Ok(())
}
