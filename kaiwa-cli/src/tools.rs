//! Built-in demo tools for the chat REPL.
//!
//! Mock data only; `get_stock_price` always fails so the error path of the
//! agent loop can be exercised interactively.

use chrono::Utc;
use kaiwa::tool::{FnTool, ToolError, ToolRegistry};
use serde_json::json;

/// The demo tool set: weather, news, time, and a deliberately broken
/// stock-price tool.
pub fn demo_tools() -> ToolRegistry {
    ToolRegistry::new()
        .with(FnTool::new(
            "get_weather",
            "Get current weather for a city.",
            json!({
                "type": "object",
                "properties": {"city": {"type": "string"}},
                "required": ["city"]
            }),
            |args| async move {
                let city = args["city"].as_str().unwrap_or_default();
                let report = match city {
                    "London" => json!({"temp_c": 12, "condition": "Cloudy"}),
                    "New York" => json!({"temp_c": 22, "condition": "Sunny"}),
                    _ => json!({"temp_c": 20, "condition": "Unknown"}),
                };
                Ok(report.to_string())
            },
        ))
        .with(FnTool::new(
            "search_news",
            "Search recent news on a topic.",
            json!({
                "type": "object",
                "properties": {"query": {"type": "string"}},
                "required": ["query"]
            }),
            |args| async move {
                let query = args["query"].as_str().unwrap_or_default();
                Ok(json!({
                    "headlines": [
                        format!("New {query} regulations announced"),
                        format!("{query} industry update"),
                    ]
                })
                .to_string())
            },
        ))
        .with(FnTool::new(
            "get_time",
            "Get current time in a timezone.",
            json!({
                "type": "object",
                "properties": {"timezone": {"type": "string"}},
                "required": ["timezone"]
            }),
            |args| async move {
                let timezone = args["timezone"].as_str().unwrap_or("UTC").to_string();
                Ok(json!({
                    "timezone": timezone,
                    "time": Utc::now().format("%H:%M:%S").to_string(),
                })
                .to_string())
            },
        ))
        .with(FnTool::new(
            "get_stock_price",
            "Get stock price (may fail).",
            json!({
                "type": "object",
                "properties": {"symbol": {"type": "string"}},
                "required": ["symbol"]
            }),
            |args| async move {
                let symbol = args["symbol"].as_str().unwrap_or_default();
                Err(ToolError::execution(format!(
                    "Stock API unavailable for {symbol}"
                )))
            },
        ))
}
