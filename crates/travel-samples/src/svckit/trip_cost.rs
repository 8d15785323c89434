//! Trip Cost Tool
//!
//! Rough cost breakdown from a flat daily rate per budget tier.

use async_trait::async_trait;

use turnloop_core::tool::{ParameterSchema, Tool, ToolArgs, ToolSchema};
use turnloop_core::{AgentError, Result as CoreResult};

use crate::model::{BudgetLevel, TripCost};

/// Estimates total trip cost from destination, length and budget tier
pub struct TripCostTool;

#[async_trait]
impl Tool for TripCostTool {
    fn schema(&self) -> ToolSchema {
        ToolSchema::new(
            "estimate_trip_cost",
            "Estimate total trip cost based on destination, duration, and budget level. Returns a cost breakdown.",
        )
        .param(ParameterSchema::string("destination", "The destination city"))
        .param(ParameterSchema::integer("days", "Number of days for the trip"))
        .param(
            ParameterSchema::enumeration(
                "budget_level",
                "Budget level: 'budget', 'moderate', or 'luxury'",
                BudgetLevel::ALL,
            )
            .with_default("moderate"),
        )
    }

    async fn execute(&self, args: &ToolArgs) -> CoreResult<String> {
        let destination = args.str("destination")?;
        let days = args.i64("days")?;
        if !(1..=365).contains(&days) {
            return Err(AgentError::InvalidArgument {
                tool: "estimate_trip_cost".into(),
                parameter: "days".into(),
                reason: format!("expected 1 to 365 days, got {days}"),
            });
        }
        let level = BudgetLevel::parse(args.opt_str("budget_level").unwrap_or("moderate"));

        let cost = TripCost::estimate(level, days);
        Ok(format!(
            "Trip cost estimate for {destination} ({days} days, {level}):\n\
             - Accommodation: ${}\n\
             - Food: ${}\n\
             - Activities: ${}\n\
             - Estimated total: ${}",
            cost.accommodation,
            cost.food,
            cost.activities,
            cost.total(),
            level = level.as_str(),
        ))
    }
}
