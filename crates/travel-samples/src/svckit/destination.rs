//! Destination Tools
//!
//! Random destination suggestions and per-destination highlights.

use async_trait::async_trait;
use rand::seq::SliceRandom;
use serde_json::json;

use turnloop_core::tool::{ParameterSchema, Tool, ToolArgs, ToolSchema};
use turnloop_core::Result as CoreResult;

use crate::catalog::{self, DESTINATIONS};

/// Suggests a vacation destination when the user has none in mind
pub struct RandomDestinationTool;

#[async_trait]
impl Tool for RandomDestinationTool {
    fn schema(&self) -> ToolSchema {
        ToolSchema::new(
            "get_random_destination",
            "Provides a random vacation destination when the user has not specified one. Returns city and country.",
        )
    }

    async fn execute(&self, _args: &ToolArgs) -> CoreResult<String> {
        let pick = DESTINATIONS
            .choose(&mut rand::thread_rng())
            .copied()
            .unwrap_or(DESTINATIONS[0]);
        tracing::info!(destination = pick, "random destination picked");
        Ok(pick.to_string())
    }
}

/// Attractions, cuisine and practical tips for a destination
pub struct DestinationInfoTool;

const CATEGORIES: [&str; 4] = ["attractions", "cuisine", "tips", "all"];

#[async_trait]
impl Tool for DestinationInfoTool {
    fn schema(&self) -> ToolSchema {
        ToolSchema::new(
            "get_destination_info",
            "Get detailed information about a destination including attractions, cuisine, and travel tips. \
             Use after a destination is chosen to add rich detail.",
        )
        .param(ParameterSchema::string("destination", "The city to get information about"))
        .param(
            ParameterSchema::enumeration(
                "category",
                "Information category: 'attractions', 'cuisine', 'tips', or 'all'",
                CATEGORIES,
            )
            .with_default("all"),
        )
    }

    async fn execute(&self, args: &ToolArgs) -> CoreResult<String> {
        let destination = args.str("destination")?;
        let category = args.opt_str("category").unwrap_or("all");

        let Some(info) = catalog::info_for(destination) else {
            return Ok(format!(
                "{destination}: a wonderful destination with rich culture and experiences."
            ));
        };

        let detail = match category {
            "attractions" => info.attractions,
            "cuisine" => info.cuisine,
            "tips" => info.tips,
            _ => {
                let all = json!({
                    "attractions": info.attractions,
                    "cuisine": info.cuisine,
                    "tips": info.tips,
                });
                return Ok(serde_json::to_string_pretty(&all)?);
            }
        };
        Ok(format!("{category} for {destination}: {detail}"))
    }
}
