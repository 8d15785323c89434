//! # travel-samples
//!
//! The travel-agent demos expressed on the turnloop core: lookup-table tools,
//! agent instructions, the structured travel-plan schema, and the scenario
//! scripts the CLI runs.
//!
//! ## Scenarios
//!
//! ```text
//! intro            1 turn   get_random_destination
//! threads          2 turns  same thread, "I don't like that destination"
//! design-patterns  3 turns  save_user_preference
//! tool-use         3 turns  weather → info → cost
//! planning         1 turn   TravelPlan JSON schema
//! multi-agent      FrontDesk ──▶ Concierge
//! calculator       3 turns  get_current_time, add, subtract
//! ```

pub mod catalog;
pub mod error;
pub mod model;
pub mod prompts;
pub mod scenario;
pub mod svckit;

pub use error::{Result, SampleError};
pub use model::{BudgetLevel, Subtask, TravelPlan, TripCost};
pub use scenario::{HANDOFF_SEED, Scenario, Toolset, front_desk_pipeline};

/// Re-export tools for easy registration
pub mod tools {
    pub use crate::svckit::{
        AddTool, CurrentTimeTool, DestinationInfoTool, Preferences, RandomDestinationTool, SavePreferenceTool,
        SubtractTool, TripCostTool, WeatherTool,
    };
}
