//! Tool handlers registered with the dispatch core.
//!
//! Every handler follows the same policy: validate required parameters
//! first and fail fast with a descriptive [`ToolError`], then perform the
//! action and return a success envelope whose text communicates the result.
//! Domain handlers orchestrate calls into [`crate::music`] and never
//! re-implement conversion or device I/O themselves.

pub mod example;
pub mod music;

pub use example::register_example_tools;
pub use music::register_music_tools;

use serde_json::Value;

use crate::error::ToolError;

/// Extracts a required, non-empty string parameter.
fn required_str<'a>(arguments: &'a Value, key: &str) -> Result<&'a str, ToolError> {
    arguments
        .get(key)
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| ToolError::InvalidParams(format!("missing required parameter: {key}")))
}

/// Extracts an optional string parameter.
fn optional_str<'a>(arguments: &'a Value, key: &str) -> Option<&'a str> {
    arguments.get(key).and_then(Value::as_str)
}

/// Extracts a required, non-empty array-of-strings parameter.
fn required_str_list(arguments: &Value, key: &str) -> Result<Vec<String>, ToolError> {
    let items = arguments
        .get(key)
        .and_then(Value::as_array)
        .ok_or_else(|| {
            ToolError::InvalidParams(format!("parameter {key} must be an array of strings"))
        })?;

    if items.is_empty() {
        return Err(ToolError::InvalidParams(format!(
            "parameter {key} must not be empty"
        )));
    }

    items
        .iter()
        .map(|item| {
            item.as_str().map(str::to_string).ok_or_else(|| {
                ToolError::InvalidParams(format!("parameter {key} must contain only strings"))
            })
        })
        .collect()
}

/// Truncates long user input for inclusion in result text.
fn preview(text: &str, limit: usize) -> String {
    if text.chars().count() > limit {
        let head: String = text.chars().take(limit).collect();
        format!("{head}...")
    } else {
        text.to_string()
    }
}
