//! Model Context Protocol (MCP) server implementation.
//!
//! This module implements the MCP specification for exposing MML and MIDI
//! operations as tools to AI assistants. The server communicates over stdio
//! transport using JSON-RPC 2.0 messages, one per line.
//!
//! # Architecture
//!
//! ```text
//! stdin ──▶ Transport ──▶ Dispatch core ──▶ Tool registry ──▶ handlers
//!                              │                                  │
//! stdout ◀── response ◀────────┴──────── {content, isError} ◀────┘
//! ```
//!
//! The registry is constructed at startup and injected into the server;
//! there is no process-wide mutable state.
//!
//! # Protocol Version
//!
//! This implementation targets MCP protocol version 2024-11-05.

pub mod protocol;
pub mod registry;
pub mod server;
pub mod transport;

pub use protocol::{JsonRpcError, JsonRpcRequest, JsonRpcResponse, ToolCallResult, MCP_PROTOCOL_VERSION};
pub use registry::{ToolDescriptor, ToolHandler, ToolRegistry};
pub use server::{McpServer, ServerInfo};
pub use transport::StdioTransport;
