//! Tool-layer tests against the assembled registry.
//!
//! Invokes handlers through the registry the way `tools/call` does, checking
//! envelope shapes, parameter validation and tool metadata without going
//! through the JSON-RPC layer.

use serde_json::json;

use mml_mcp_server::mcp::registry::ToolRegistry;
use mml_mcp_server::tools::{register_example_tools, register_music_tools};

fn full_registry() -> ToolRegistry {
    let mut registry = ToolRegistry::new();
    register_example_tools(&mut registry).unwrap();
    register_music_tools(&mut registry, None).unwrap();
    registry
}

#[test]
fn registry_holds_ten_tools() {
    let registry = full_registry();
    assert_eq!(registry.len(), 10);
}

#[test]
fn echo_returns_text_verbatim() {
    let registry = full_registry();
    let tool = registry.get("echo").unwrap();

    let result = tool.invoke(&json!({"text": "  spaced  text  "})).unwrap();
    assert!(!result.is_error);
    assert_eq!(result.first_text(), Some("  spaced  text  "));
}

#[test]
fn echo_missing_text_is_a_handler_error() {
    let registry = full_registry();
    let tool = registry.get("echo").unwrap();

    let err = tool.invoke(&json!({})).unwrap_err();
    assert!(err.to_string().contains("text"));
}

#[test]
fn current_time_honours_custom_format() {
    let registry = full_registry();
    let tool = registry.get("get_current_time").unwrap();

    let result = tool.invoke(&json!({"format": "%Y"})).unwrap();
    let text = result.first_text().unwrap();
    let year: i32 = text
        .strip_prefix("Current time: ")
        .unwrap()
        .trim()
        .parse()
        .unwrap();
    assert!(year >= 2024);
}

#[test]
fn system_info_reports_current_platform() {
    let registry = full_registry();
    let tool = registry.get("get_system_info").unwrap();

    let result = tool.invoke(&json!({})).unwrap();
    let text = result.first_text().unwrap();
    assert!(text.contains(std::env::consts::OS));
    assert!(text.contains(std::env::consts::ARCH));
}

#[test]
fn validate_mml_success_envelope() {
    let registry = full_registry();
    let tool = registry.get("validate_mml").unwrap();

    let result = tool.invoke(&json!({"mml_text": "O4L4CDEFGAB"})).unwrap();
    assert!(!result.is_error);
    assert!(result.first_text().unwrap().contains("Valid: true"));
}

#[test]
fn validate_mml_failure_envelope_names_the_token() {
    let registry = full_registry();
    let tool = registry.get("validate_mml").unwrap();

    let result = tool.invoke(&json!({"mml_text": "O4L4CZ"})).unwrap();
    assert!(result.is_error);
    let text = result.first_text().unwrap();
    assert!(text.contains("Valid: false"));
    assert!(text.contains('Z'));
}

#[test]
fn mml_to_midi_end_to_end() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("tune.mid");

    let registry = full_registry();
    let tool = registry.get("mml_to_midi").unwrap();

    let result = tool
        .invoke(&json!({
            "mml_text": "T100O4L8CCGGAAG4",
            "output_path": path.to_str().unwrap(),
        }))
        .unwrap();

    assert!(!result.is_error);
    let written = std::fs::read(&path).unwrap();
    let reported = result.first_text().unwrap();
    assert!(reported.contains(&format!("{} bytes", written.len())));
}

#[test]
fn long_mml_is_previewed_in_result_text() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("long.mid");

    let registry = full_registry();
    let tool = registry.get("mml_to_midi").unwrap();

    let mml = "CDEFGAB".repeat(40);
    let result = tool
        .invoke(&json!({
            "mml_text": mml,
            "output_path": path.to_str().unwrap(),
        }))
        .unwrap();

    let text = result.first_text().unwrap();
    assert!(text.contains("..."));
    assert!(!text.contains(&mml));
}

#[test]
fn multitrack_tool_reports_track_lines() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("duet.mid");

    let registry = full_registry();
    let tool = registry.get("mml_multitrack_to_midi").unwrap();

    let result = tool
        .invoke(&json!({
            "track_mml_list": ["O5CDEFGAB", "O3L2CEG"],
            "output_path": path.to_str().unwrap(),
        }))
        .unwrap();

    let text = result.first_text().unwrap();
    assert!(text.contains("Track 1:"));
    assert!(text.contains("Track 2:"));
    assert!(path.exists());
}

#[test]
fn empty_track_list_is_rejected() {
    let registry = full_registry();
    let tool = registry.get("mml_multitrack_to_midi").unwrap();

    let err = tool
        .invoke(&json!({"track_mml_list": [], "output_path": "x.mid"}))
        .unwrap_err();
    assert!(err.to_string().contains("track_mml_list"));
}

#[test]
fn schemas_name_their_required_params() {
    let registry = full_registry();

    let required_of = |name: &str| -> Vec<String> {
        registry
            .get(name)
            .unwrap()
            .definition()
            .input_schema["required"]
            .as_array()
            .unwrap()
            .iter()
            .map(|v| v.as_str().unwrap().to_string())
            .collect()
    };

    assert_eq!(required_of("echo"), vec!["text"]);
    assert_eq!(required_of("mml_to_midi"), vec!["mml_text", "output_path"]);
    assert_eq!(required_of("play_midi"), vec!["midi_path"]);
    assert_eq!(required_of("validate_mml"), vec!["mml_text"]);
    assert!(required_of("list_midi_devices").is_empty());
    assert_eq!(required_of("play_mml_multitrack"), vec!["track_mml_list"]);
}

#[test]
fn duplicate_registration_is_rejected() {
    let mut registry = ToolRegistry::new();
    register_example_tools(&mut registry).unwrap();
    assert!(register_example_tools(&mut registry).is_err());
}
