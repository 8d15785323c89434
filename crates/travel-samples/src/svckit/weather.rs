//! Weather Tool

use async_trait::async_trait;

use turnloop_core::tool::{ParameterSchema, Tool, ToolArgs, ToolSchema};
use turnloop_core::Result as CoreResult;

use crate::catalog;

/// Current weather for a location (demo data)
pub struct WeatherTool;

#[async_trait]
impl Tool for WeatherTool {
    fn schema(&self) -> ToolSchema {
        ToolSchema::new(
            "get_weather",
            "Get current weather conditions for a location. Use when planning activities or packing advice.",
        )
        .param(ParameterSchema::string(
            "location",
            "The city and country to get weather for, e.g. 'Paris, France'",
        ))
    }

    async fn execute(&self, args: &ToolArgs) -> CoreResult<String> {
        let location = args.str("location")?;
        Ok(match catalog::weather_for(location) {
            Some(w) => format!(
                "{location} weather: {}, {}°C ({}°F)",
                w.condition, w.temp_c, w.temp_f
            ),
            None => format!("{location} weather: Mild conditions, around 20°C (68°F)"),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use turnloop_core::ToolCall;

    async fn weather(location: &str) -> String {
        let call = ToolCall::new("get_weather").with_argument("location", location);
        let args = WeatherTool.schema().validate(&call).unwrap();
        WeatherTool.execute(&args).await.unwrap()
    }

    #[tokio::test]
    async fn test_known_city() {
        assert_eq!(weather("Tokyo").await, "Tokyo weather: Sunny, 24°C (75°F)");
    }

    #[tokio::test]
    async fn test_unknown_city_is_mild() {
        assert_eq!(
            weather("Reykjavik").await,
            "Reykjavik weather: Mild conditions, around 20°C (68°F)"
        );
    }

    #[test]
    fn test_location_required() {
        let err = WeatherTool.schema().validate(&ToolCall::new("get_weather")).unwrap_err();
        assert!(err.to_string().contains("location"));
    }
}
