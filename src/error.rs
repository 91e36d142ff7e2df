//! Error types for mml-mcp-server.
//!
//! Two error tiers exist in this server and they must never be conflated:
//!
//! - Protocol-level errors (malformed request, unknown method) are JSON-RPC
//!   error objects, produced by the dispatch core in `mcp::server`.
//! - Tool-level errors ([`ToolError`]) never escape as protocol errors; they
//!   are mapped to an `isError: true` result envelope at the dispatch
//!   boundary so the calling LLM can read the failure text and react.

use thiserror::Error;

use crate::music::MusicError;

/// Errors that can occur during configuration operations.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Configuration file could not be read.
    #[error("failed to read configuration file: {path}")]
    ReadError {
        /// Path to the configuration file.
        path: std::path::PathBuf,
        /// The underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// Configuration file could not be parsed.
    #[error("failed to parse configuration file: {path}")]
    ParseError {
        /// Path to the configuration file.
        path: std::path::PathBuf,
        /// The underlying JSON error.
        #[source]
        source: serde_json::Error,
    },

    /// Configuration file not found.
    #[error("configuration file not found: {path}")]
    NotFound {
        /// Path where the configuration file was expected.
        path: std::path::PathBuf,
    },

    /// Configuration validation failed.
    #[error("configuration validation failed: {message}")]
    ValidationError {
        /// Description of the validation failure.
        message: String,
    },
}

/// Errors a tool handler can return.
///
/// This is the typed union caught at the dispatch boundary and mapped
/// deterministically to envelope text. Handlers never panic their way out;
/// anything that goes wrong becomes one of these variants.
#[derive(Error, Debug)]
pub enum ToolError {
    /// A required parameter was missing or malformed.
    #[error("invalid parameters: {0}")]
    InvalidParams(String),

    /// A music adapter call failed.
    #[error(transparent)]
    Adapter(#[from] MusicError),

    /// An adapter call failed in a named stage of a multi-stage tool.
    ///
    /// `play_mml` composes conversion and playback; the stage prefix lets
    /// the caller tell which half failed.
    #[error("{stage}: {source}")]
    Stage {
        /// The stage that failed (e.g. "conversion", "playback").
        stage: &'static str,
        /// The underlying adapter error.
        #[source]
        source: MusicError,
    },

    /// Anything else that should not happen.
    #[error("internal error: {0}")]
    Internal(String),
}

impl ToolError {
    /// Wraps an adapter error with the name of the stage it occurred in.
    #[must_use]
    pub const fn stage(stage: &'static str, source: MusicError) -> Self {
        Self::Stage { stage, source }
    }
}
