//! mml-mcp-server: MCP server exposing MML and MIDI tools to AI assistants
//!
//! This library implements a Model Context Protocol server over stdio that
//! lets an LLM client convert Music Macro Language (MML) text into Standard
//! MIDI Files, validate MML syntax, enumerate MIDI output devices, and play
//! sequences on a connected device.
//!
//! # Architecture
//!
//! The protocol shell is deliberately thin. A [`mcp::registry::ToolRegistry`]
//! is built once at startup and injected into the server; the dispatch core
//! routes each request to a registered handler and wraps the outcome into a
//! uniform `{content, isError}` envelope. All music processing lives behind
//! the narrow adapter functions in [`music`].
//!
//! # Modules
//!
//! - [`config`] — Configuration loading and validation
//! - [`error`] — Error types shared across the crate
//! - [`mcp`] — MCP protocol implementation (wire types, transport, dispatch)
//! - [`music`] — MML parsing, MIDI encoding and device playback
//! - [`tools`] — Tool handlers registered with the dispatch core

pub mod config;
pub mod error;
pub mod mcp;
pub mod music;
pub mod tools;
