//! Exemplar tools: echo, current time and system information.
//!
//! These exist so a client can exercise the dispatch path without touching
//! any music hardware.

use std::fmt::Write as _;

use chrono::Local;
use serde_json::{json, Value};

use crate::error::ToolError;
use crate::mcp::protocol::ToolCallResult;
use crate::mcp::registry::{RegistryError, ToolDescriptor, ToolHandler, ToolRegistry};

use super::required_str;

/// Default strftime pattern for `get_current_time`.
const DEFAULT_TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Returns the input text unchanged.
struct EchoTool;

impl ToolHandler for EchoTool {
    fn invoke(&self, arguments: &Value) -> Result<ToolCallResult, ToolError> {
        let text = required_str(arguments, "text")?;
        Ok(ToolCallResult::text(text))
    }
}

/// Reports the current local time, optionally in a caller-supplied format.
struct CurrentTimeTool;

impl ToolHandler for CurrentTimeTool {
    fn invoke(&self, arguments: &Value) -> Result<ToolCallResult, ToolError> {
        let format = arguments
            .get("format")
            .and_then(Value::as_str)
            .unwrap_or(DEFAULT_TIME_FORMAT);

        // An invalid specifier surfaces as a fmt error while rendering.
        let mut rendered = String::new();
        write!(rendered, "{}", Local::now().format(format))
            .map_err(|_| ToolError::InvalidParams(format!("invalid time format: {format}")))?;

        Ok(ToolCallResult::text(format!("Current time: {rendered}")))
    }
}

/// Reports basic information about the host.
struct SystemInfoTool;

impl ToolHandler for SystemInfoTool {
    fn invoke(&self, _arguments: &Value) -> Result<ToolCallResult, ToolError> {
        let cpu_count = std::thread::available_parallelism().map_or(1, std::num::NonZeroUsize::get);
        let hostname = gethostname::gethostname().to_string_lossy().into_owned();

        let info = json!({
            "os": std::env::consts::OS,
            "arch": std::env::consts::ARCH,
            "family": std::env::consts::FAMILY,
            "hostname": hostname,
            "cpu_count": cpu_count,
        });

        let rendered = serde_json::to_string_pretty(&info)
            .map_err(|e| ToolError::Internal(e.to_string()))?;

        Ok(ToolCallResult::text(format!("System information:\n{rendered}")))
    }
}

/// Registers the exemplar tools.
///
/// # Errors
///
/// Returns [`RegistryError`] if a tool name collides with one already
/// registered.
pub fn register_example_tools(registry: &mut ToolRegistry) -> Result<(), RegistryError> {
    registry.register(ToolDescriptor::new(
        "echo",
        "Returns the input text unchanged",
        json!({
            "type": "object",
            "properties": {
                "text": {
                    "type": "string",
                    "description": "Text to echo back"
                }
            },
            "required": ["text"]
        }),
        Box::new(EchoTool),
    ))?;

    registry.register(ToolDescriptor::new(
        "get_current_time",
        "Returns the current local date and time",
        json!({
            "type": "object",
            "properties": {
                "format": {
                    "type": "string",
                    "description": "strftime pattern (e.g. '%Y-%m-%d %H:%M:%S')"
                }
            },
            "required": []
        }),
        Box::new(CurrentTimeTool),
    ))?;

    registry.register(ToolDescriptor::new(
        "get_system_info",
        "Returns basic information about the host system",
        json!({
            "type": "object",
            "properties": {},
            "required": []
        }),
        Box::new(SystemInfoTool),
    ))?;

    Ok(())
}
