//! Domain Models

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

/// Spending tier for cost estimates
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BudgetLevel {
    Budget,
    #[default]
    Moderate,
    Luxury,
}

impl BudgetLevel {
    pub const ALL: [&'static str; 3] = ["budget", "moderate", "luxury"];

    /// Parse a validated enum argument; unrecognized input falls back to
    /// moderate
    pub fn parse(s: &str) -> Self {
        match s.to_ascii_lowercase().as_str() {
            "budget" => Self::Budget,
            "luxury" => Self::Luxury,
            _ => Self::Moderate,
        }
    }

    /// Daily rate in USD
    pub const fn daily_rate(self) -> i64 {
        match self {
            Self::Budget => 100,
            Self::Moderate => 250,
            Self::Luxury => 500,
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Budget => "budget",
            Self::Moderate => "moderate",
            Self::Luxury => "luxury",
        }
    }
}

/// Cost breakdown for a trip
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct TripCost {
    pub accommodation: i64,
    pub food: i64,
    pub activities: i64,
}

impl TripCost {
    /// Accommodation at the daily rate, food at half and activities at a
    /// third of it (whole dollars)
    pub const fn estimate(level: BudgetLevel, days: i64) -> Self {
        let rate = level.daily_rate();
        Self {
            accommodation: rate * days,
            food: (rate / 2) * days,
            activities: (rate / 3) * days,
        }
    }

    pub const fn total(&self) -> i64 {
        self.accommodation + self.food + self.activities
    }
}

/// Specialist agents a travel plan can delegate to
pub const PLAN_AGENTS: [&str; 6] = [
    "FlightBooking",
    "HotelBooking",
    "CarRental",
    "ActivitiesBooking",
    "DestinationInfo",
    "DefaultAgent",
];

/// One delegated step of a travel plan
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subtask {
    pub assigned_agent: String,
    pub task_details: String,
}

/// Structured output of the planning scenario
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TravelPlan {
    pub main_task: String,
    pub subtasks: Vec<Subtask>,
}

impl TravelPlan {
    /// Strict JSON schema sent with the planning request
    pub fn json_schema() -> Value {
        json!({
            "type": "object",
            "properties": {
                "main_task": { "type": "string" },
                "subtasks": {
                    "type": "array",
                    "items": {
                        "type": "object",
                        "properties": {
                            "assigned_agent": { "type": "string", "enum": PLAN_AGENTS },
                            "task_details": { "type": "string" }
                        },
                        "required": ["assigned_agent", "task_details"],
                        "additionalProperties": false
                    }
                }
            },
            "required": ["main_task", "subtasks"],
            "additionalProperties": false
        })
    }
}

impl std::fmt::Display for TravelPlan {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Main task: {}", self.main_task)?;
        for (i, task) in self.subtasks.iter().enumerate() {
            writeln!(f, "  {}. [{}] {}", i + 1, task.assigned_agent, task.task_details)?;
        }
        Ok(())
    }
}
