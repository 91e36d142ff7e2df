//! End-to-end protocol tests: wire text in, dispatched response out.
//!
//! Drives the full server (example tools + music tools) through
//! `parse_message` and `McpServer::handle`, the same path `handle_line`
//! takes, without touching stdio.

use serde_json::json;

use mml_mcp_server::mcp::protocol::{parse_message, JsonRpcError, JsonRpcResponse, RequestId};
use mml_mcp_server::mcp::registry::ToolRegistry;
use mml_mcp_server::mcp::server::{McpServer, ServerInfo};
use mml_mcp_server::tools::{register_example_tools, register_music_tools};

fn full_server() -> McpServer {
    let mut registry = ToolRegistry::new();
    register_example_tools(&mut registry).unwrap();
    register_music_tools(&mut registry, None).unwrap();
    McpServer::new(ServerInfo::default(), registry)
}

/// Feeds one wire line through parse + dispatch.
fn drive(server: &mut McpServer, line: &str) -> Option<Result<JsonRpcResponse, JsonRpcError>> {
    match parse_message(line) {
        Ok(msg) => server.handle(msg),
        Err(error) => Some(Err(error)),
    }
}

fn drive_ok(server: &mut McpServer, line: &str) -> JsonRpcResponse {
    drive(server, line).unwrap().unwrap()
}

fn drive_err(server: &mut McpServer, line: &str) -> JsonRpcError {
    drive(server, line).unwrap().unwrap_err()
}

#[test]
fn initialize_handshake() {
    let mut server = full_server();

    let response = drive_ok(
        &mut server,
        r#"{"jsonrpc": "2.0", "id": 1, "method": "initialize", "params": {"protocolVersion": "2024-11-05", "clientInfo": {"name": "test-client", "version": "0.0.1"}}}"#,
    );

    assert_eq!(response.id, RequestId::Number(1));
    assert_eq!(response.result["protocolVersion"], "2024-11-05");
    assert_eq!(response.result["serverInfo"]["name"], "mml-mcp-server");
    assert!(response.result["capabilities"].get("tools").is_some());

    // The follow-up notification produces no response at all.
    let outcome = drive(
        &mut server,
        r#"{"jsonrpc": "2.0", "method": "notifications/initialized"}"#,
    );
    assert!(outcome.is_none());
}

#[test]
fn echo_round_trip() {
    // initialize / tools/list / echo, the canonical smoke sequence.
    let mut server = full_server();

    drive_ok(
        &mut server,
        r#"{"jsonrpc": "2.0", "id": 1, "method": "initialize", "params": {}}"#,
    );

    let listing = drive_ok(&mut server, r#"{"jsonrpc": "2.0", "id": 2, "method": "tools/list"}"#);
    let tools = listing.result["tools"].as_array().unwrap();
    assert!(tools.iter().any(|t| t["name"] == "echo"));

    let response = drive_ok(
        &mut server,
        r#"{"jsonrpc": "2.0", "id": 3, "method": "tools/call", "params": {"name": "echo", "arguments": {"text": "hello"}}}"#,
    );
    assert_eq!(response.id, RequestId::Number(3));
    assert_eq!(response.result["isError"], false);
    assert_eq!(response.result["content"][0]["type"], "text");
    assert_eq!(response.result["content"][0]["text"], "hello");
}

#[test]
fn tools_list_has_all_tools_in_order() {
    let mut server = full_server();
    let response = drive_ok(&mut server, r#"{"jsonrpc": "2.0", "id": 1, "method": "tools/list"}"#);

    let names: Vec<&str> = response.result["tools"]
        .as_array()
        .unwrap()
        .iter()
        .map(|t| t["name"].as_str().unwrap())
        .collect();

    assert_eq!(
        names,
        vec![
            "echo",
            "get_current_time",
            "get_system_info",
            "mml_to_midi",
            "play_midi",
            "play_mml",
            "validate_mml",
            "list_midi_devices",
            "mml_multitrack_to_midi",
            "play_mml_multitrack",
        ]
    );

    // Every definition carries a schema with camelCase key.
    for tool in response.result["tools"].as_array().unwrap() {
        assert_eq!(tool["inputSchema"]["type"], "object");
        assert!(tool["description"].as_str().is_some_and(|d| !d.is_empty()));
    }
}

#[test]
fn malformed_json_yields_parse_error() {
    let mut server = full_server();
    let error = drive(&mut server, "{this is not json").unwrap().unwrap_err();
    assert_eq!(error.error.code, -32700);
    assert!(error.id.is_none());
}

#[test]
fn missing_method_echoes_id() {
    let mut server = full_server();
    let error = drive(&mut server, r#"{"jsonrpc": "2.0", "id": 42}"#)
        .unwrap()
        .unwrap_err();
    assert_eq!(error.error.code, -32600);
    assert_eq!(error.id, Some(RequestId::Number(42)));
}

#[test]
fn unknown_method_yields_method_not_found() {
    let mut server = full_server();
    let error = drive_err(&mut server, r#"{"jsonrpc": "2.0", "id": 5, "method": "prompts/list"}"#);
    assert_eq!(error.error.code, -32601);
    assert!(error.error.message.contains("prompts/list"));
}

#[test]
fn null_id_request_is_never_answered() {
    let mut server = full_server();
    let outcome = drive(
        &mut server,
        r#"{"jsonrpc": "2.0", "id": null, "method": "tools/list"}"#,
    );
    assert!(outcome.is_none());
}

#[test]
fn string_ids_are_echoed_verbatim() {
    let mut server = full_server();
    let response = drive_ok(
        &mut server,
        r#"{"jsonrpc": "2.0", "id": "req-007", "method": "ping"}"#,
    );
    assert_eq!(response.id, RequestId::String("req-007".to_string()));
    assert_eq!(response.result, json!({}));
}

#[test]
fn convert_save_and_report() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("song.mid");

    let mut server = full_server();
    let request = json!({
        "jsonrpc": "2.0",
        "id": 1,
        "method": "tools/call",
        "params": {
            "name": "mml_to_midi",
            "arguments": {"mml_text": "T140O5L8CDEC", "output_path": path.to_str().unwrap()},
        },
    });
    let response = drive_ok(&mut server, &request.to_string());

    assert_eq!(response.result["isError"], false);
    let text = response.result["content"][0]["text"].as_str().unwrap();
    assert!(text.contains("song.mid"));
    assert!(text.contains("bytes"));
    assert!(path.exists());
}

#[test]
fn tool_failure_stays_inside_the_envelope() {
    let mut server = full_server();
    let response = drive_ok(
        &mut server,
        r#"{"jsonrpc": "2.0", "id": 1, "method": "tools/call", "params": {"name": "mml_to_midi", "arguments": {"mml_text": "CDZ", "output_path": "/tmp/never.mid"}}}"#,
    );

    // The request itself succeeded; the failure lives in the envelope.
    assert_eq!(response.result["isError"], true);
    assert!(response.result["content"][0]["text"]
        .as_str()
        .unwrap()
        .contains('Z'));
}

#[test]
fn unknown_tool_is_a_protocol_error() {
    let mut server = full_server();
    let error = drive_err(
        &mut server,
        r#"{"jsonrpc": "2.0", "id": 6, "method": "tools/call", "params": {"name": "make_coffee", "arguments": {}}}"#,
    );
    assert_eq!(error.error.code, -32602);
    assert!(error.error.message.contains("make_coffee"));
}

#[test]
fn responses_serialise_without_embedded_newlines() {
    let mut server = full_server();
    let response = drive_ok(&mut server, r#"{"jsonrpc": "2.0", "id": 1, "method": "tools/list"}"#);
    let serialised = serde_json::to_string(&response).unwrap();
    assert!(!serialised.contains('\n'));
}

#[test]
fn unknown_notification_is_ignored() {
    let mut server = full_server();
    let outcome = drive(
        &mut server,
        r#"{"jsonrpc": "2.0", "method": "notifications/cancelled", "params": {"requestId": 1}}"#,
    );
    assert!(outcome.is_none());
}

#[test]
fn sequential_ids_map_to_their_responses() {
    let mut server = full_server();
    for id in 1..=5 {
        let line = format!(r#"{{"jsonrpc": "2.0", "id": {id}, "method": "ping"}}"#);
        let response = drive_ok(&mut server, &line);
        assert_eq!(response.id, RequestId::Number(id));
    }
}
