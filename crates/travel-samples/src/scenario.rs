//! Sample Scenarios
//!
//! Each scenario is one agent configuration plus the user prompts run against
//! it on a single conversation thread. `multi-agent` is the exception: its
//! prompt seeds the FrontDesk → Concierge pipeline instead.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::info;

use turnloop_core::{
    Agent, AgentConfig, AgentDefinition, HandoffRouter, ModelGateway, ResponseFormat, StreamSink,
    ToolRegistry, TurnOutcome,
};

use crate::error::{Result, SampleError};
use crate::model::TravelPlan;
use crate::prompts;
use crate::svckit::{
    AddTool, CurrentTimeTool, DestinationInfoTool, Preferences, RandomDestinationTool, SavePreferenceTool,
    SubtractTool, TripCostTool, WeatherTool,
};

/// Tools a scenario's agent can call
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Toolset {
    None,

    /// Random destination only
    Destinations,

    /// Random destination and preference memory
    Preferences,

    /// Destination, weather, details and trip cost
    Travel,

    /// Clock and arithmetic
    Calculator,
}

impl Toolset {
    /// Fresh registry holding this toolset; preference tools write into
    /// `preferences`
    pub fn registry(self, preferences: &Preferences) -> turnloop_core::Result<ToolRegistry> {
        let mut tools = ToolRegistry::new();
        match self {
            Self::None => {}
            Self::Destinations => tools.register(RandomDestinationTool)?,
            Self::Preferences => {
                tools.register(RandomDestinationTool)?;
                tools.register(SavePreferenceTool::new(preferences.clone()))?;
            }
            Self::Travel => {
                tools.register(RandomDestinationTool)?;
                tools.register(WeatherTool)?;
                tools.register(DestinationInfoTool)?;
                tools.register(TripCostTool)?;
            }
            Self::Calculator => {
                tools.register(CurrentTimeTool)?;
                tools.register(AddTool)?;
                tools.register(SubtractTool)?;
            }
        }
        Ok(tools)
    }
}

/// A runnable demo
#[derive(Debug)]
pub struct Scenario {
    pub name: &'static str,
    pub summary: &'static str,
    pub agent_name: &'static str,
    pub instructions: &'static str,

    /// User prompts, run in order on one conversation
    pub prompts: &'static [&'static str],

    pub toolset: Toolset,

    /// Ask for a `TravelPlan` JSON reply
    pub structured: bool,

    /// Run as the FrontDesk → Concierge pipeline
    pub handoff: bool,
}

static SCENARIOS: [Scenario; 7] = [
    Scenario {
        name: "intro",
        summary: "single streamed turn planning a day trip to a random destination",
        agent_name: "TravelAgent",
        instructions: prompts::INTRO,
        prompts: &["Plan me a day trip"],
        toolset: Toolset::Destinations,
        structured: false,
        handoff: false,
    },
    Scenario {
        name: "threads",
        summary: "two turns on one thread; the second rejects the first suggestion",
        agent_name: "TravelAgent",
        instructions: prompts::THREADS,
        prompts: &[
            "Plan me a day trip",
            "I don't like that destination. Plan me another vacation.",
        ],
        toolset: Toolset::Destinations,
        structured: false,
        handoff: false,
    },
    Scenario {
        name: "design-patterns",
        summary: "greeting, preference saving, and a recommendation that honors it",
        agent_name: "TravelAgent",
        instructions: prompts::DESIGN_PATTERNS,
        prompts: &[
            "Hello",
            "I prefer luxury travel and cultural experiences.",
            "Recommend me a destination.",
        ],
        toolset: Toolset::Preferences,
        structured: false,
        handoff: false,
    },
    Scenario {
        name: "tool-use",
        summary: "tool selection, parameterized calls, and tool composition",
        agent_name: "TravelAgent",
        instructions: prompts::TOOL_USE,
        prompts: &[
            "What's the weather like in Tokyo?",
            "How much would a 5-day luxury trip to Rome cost?",
            "Plan me a complete trip - suggest a destination and give me all the details, \
             including the weather and the cost of 3 days on a moderate budget.",
        ],
        toolset: Toolset::Travel,
        structured: false,
        handoff: false,
    },
    Scenario {
        name: "planning",
        summary: "structured travel plan delegating subtasks to specialist agents",
        agent_name: "TravelPlanAgent",
        instructions: prompts::PLANNING,
        prompts: &["Create a travel plan for a family of 4 (2 kids) from Singapore to Melbourne"],
        toolset: Toolset::None,
        structured: true,
        handoff: false,
    },
    Scenario {
        name: "multi-agent",
        summary: "FrontDesk suggests, Concierge reviews (linear handoff)",
        agent_name: "FrontDesk",
        instructions: prompts::FRONT_DESK,
        prompts: &[HANDOFF_SEED],
        toolset: Toolset::None,
        structured: false,
        handoff: true,
    },
    Scenario {
        name: "calculator",
        summary: "plugin-style tools: current time, add and subtract",
        agent_name: "Calculator",
        instructions: prompts::CALCULATOR,
        prompts: &["What time is it?", "What is 55 + 12?", "And 100 - 42.5?"],
        toolset: Toolset::Calculator,
        structured: false,
        handoff: false,
    },
];

/// Seed message of the multi-agent pipeline
pub const HANDOFF_SEED: &str = "I want to go to Paris.";

impl Scenario {
    pub fn all() -> &'static [Self] {
        &SCENARIOS
    }

    pub fn find(name: &str) -> Result<&'static Self> {
        SCENARIOS
            .iter()
            .find(|s| s.name.eq_ignore_ascii_case(name.trim()))
            .ok_or_else(|| SampleError::UnknownScenario(name.to_string()))
    }

    /// Agent for a single-agent scenario. `base` supplies model and loop
    /// settings; name, instructions and response format come from the
    /// scenario.
    pub fn build_agent(
        &self,
        gateway: Arc<dyn ModelGateway>,
        base: AgentConfig,
        preferences: &Preferences,
    ) -> Result<Agent> {
        if self.handoff {
            return Err(SampleError::NotSingleAgent(self.name));
        }

        let response_format = if self.structured {
            ResponseFormat::json_schema("TravelPlan", TravelPlan::json_schema())
        } else {
            base.response_format.clone()
        };
        let config = AgentConfig {
            name: self.agent_name.into(),
            instructions: self.instructions.into(),
            response_format,
            ..base
        };
        let tools = self.toolset.registry(preferences)?;

        Ok(Agent::new(gateway, Arc::new(tools), config))
    }

    /// Run every prompt in order on one fresh conversation, streaming to
    /// `sink`
    pub async fn run(
        &self,
        agent: &Agent,
        sink: &mut dyn StreamSink,
        cancel: &CancellationToken,
    ) -> Result<Vec<TurnOutcome>> {
        let mut conversation = agent.new_conversation();
        let mut outcomes = Vec::with_capacity(self.prompts.len());

        for (i, prompt) in self.prompts.iter().enumerate() {
            info!(scenario = self.name, turn = i + 1, "running prompt");
            let outcome = agent
                .run_streaming(&mut conversation, *prompt, sink, cancel)
                .await?;
            outcomes.push(outcome);
        }

        Ok(outcomes)
    }
}

/// The FrontDesk → Concierge pipeline
pub fn front_desk_pipeline(gateway: Arc<dyn ModelGateway>, base: AgentConfig) -> Result<HandoffRouter> {
    let stages = vec![
        AgentDefinition::new("FrontDesk", prompts::FRONT_DESK),
        AgentDefinition::new("Concierge", prompts::CONCIERGE),
    ];
    Ok(HandoffRouter::new(gateway, stages)?.with_base_config(base))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_names_are_unique() {
        let names: HashSet<_> = Scenario::all().iter().map(|s| s.name).collect();
        assert_eq!(names.len(), Scenario::all().len());
    }

    #[test]
    fn test_find_is_case_insensitive() {
        assert_eq!(Scenario::find(" Tool-Use ").unwrap().toolset, Toolset::Travel);
        assert!(matches!(
            Scenario::find("rag"),
            Err(SampleError::UnknownScenario(name)) if name == "rag"
        ));
    }

    #[test]
    fn test_toolsets() {
        let preferences = Preferences::new();
        let names = |t: Toolset| -> Vec<String> {
            t.registry(&preferences)
                .unwrap()
                .names()
                .into_iter()
                .map(String::from)
                .collect()
        };

        assert!(names(Toolset::None).is_empty());
        assert_eq!(
            names(Toolset::Travel),
            ["get_random_destination", "get_weather", "get_destination_info", "estimate_trip_cost"]
        );
        assert_eq!(names(Toolset::Calculator), ["get_current_time", "add", "subtract"]);
        assert!(names(Toolset::Preferences).contains(&"save_user_preference".to_string()));
    }

    #[test]
    fn test_only_multi_agent_hands_off() {
        let handoffs: Vec<_> = Scenario::all().iter().filter(|s| s.handoff).map(|s| s.name).collect();
        assert_eq!(handoffs, ["multi-agent"]);
        assert_eq!(Scenario::find("multi-agent").unwrap().prompts, [HANDOFF_SEED]);
    }
}
