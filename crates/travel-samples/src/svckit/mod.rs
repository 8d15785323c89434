//! Service Kit - Agent Tools
//!
//! Travel tools implementing `turnloop_core::Tool`. Each one is a thin
//! adapter from validated arguments to the catalog or a calculation.

mod calculator;
mod destination;
mod preference;
mod trip_cost;
mod weather;

pub use calculator::{AddTool, CurrentTimeTool, SubtractTool};
pub use destination::{DestinationInfoTool, RandomDestinationTool};
pub use preference::{Preferences, SavePreferenceTool};
pub use trip_cost::TripCostTool;
pub use weather::WeatherTool;
