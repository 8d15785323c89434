//! Clock and Calculator Tools

use async_trait::async_trait;
use chrono::Local;

use turnloop_core::tool::{ParameterSchema, Tool, ToolArgs, ToolSchema};
use turnloop_core::Result as CoreResult;

/// Local date and time as `YYYY-MM-DD HH:MM:SS`
pub struct CurrentTimeTool;

#[async_trait]
impl Tool for CurrentTimeTool {
    fn schema(&self) -> ToolSchema {
        ToolSchema::new("get_current_time", "Get the current time and date.")
    }

    async fn execute(&self, _args: &ToolArgs) -> CoreResult<String> {
        Ok(Local::now().format("%Y-%m-%d %H:%M:%S").to_string())
    }
}

fn operands(description: &str) -> [ParameterSchema; 2] {
    [
        ParameterSchema::number("number1", format!("The first number {description}")),
        ParameterSchema::number("number2", format!("The second number {description}")),
    ]
}

/// Adds two numbers
pub struct AddTool;

#[async_trait]
impl Tool for AddTool {
    fn schema(&self) -> ToolSchema {
        let [a, b] = operands("to add");
        ToolSchema::new("add", "Add two numbers.").param(a).param(b)
    }

    async fn execute(&self, args: &ToolArgs) -> CoreResult<String> {
        Ok((args.f64("number1")? + args.f64("number2")?).to_string())
    }
}

/// Subtracts the second number from the first
pub struct SubtractTool;

#[async_trait]
impl Tool for SubtractTool {
    fn schema(&self) -> ToolSchema {
        let [a, b] = operands("(subtract the second from the first)");
        ToolSchema::new("subtract", "Subtract two numbers.").param(a).param(b)
    }

    async fn execute(&self, args: &ToolArgs) -> CoreResult<String> {
        Ok((args.f64("number1")? - args.f64("number2")?).to_string())
    }
}
