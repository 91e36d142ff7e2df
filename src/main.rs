//! mml-mcp-server: MCP server exposing MML-to-MIDI music tools
//!
//! Speaks JSON-RPC 2.0 over stdio and provides tools for converting Music
//! Macro Language text to Standard MIDI Files, validating MML, listing MIDI
//! output devices and playing music.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use tracing::{error, info, Level};
use tracing_subscriber::EnvFilter;

use mml_mcp_server::config;
use mml_mcp_server::mcp::registry::ToolRegistry;
use mml_mcp_server::mcp::server::{McpServer, ServerInfo};
use mml_mcp_server::tools::{register_example_tools, register_music_tools};

/// MCP server exposing MML-to-MIDI music tools.
///
/// Converts Music Macro Language text to MIDI files and plays them on a
/// MIDI output device, driven by an MCP client over stdio.
#[derive(Parser, Debug)]
#[command(name = "mml-mcp-server")]
#[command(author, about, long_about = None)]
struct Args {
    /// Path to configuration file
    #[arg(value_name = "CONFIG_FILE")]
    config: Option<PathBuf>,

    /// Server name reported to clients
    #[arg(long)]
    name: Option<String>,

    /// Server version reported to clients
    #[arg(long = "version")]
    server_version: Option<String>,

    /// Server description reported to clients
    #[arg(long)]
    description: Option<String>,

    /// Increase logging verbosity (-v for info, -vv for debug, -vvv for trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Decrease logging verbosity (only show errors)
    #[arg(short, long)]
    quiet: bool,
}

/// Determines the log level from CLI arguments.
#[allow(clippy::match_same_arms)] // Explicit "warn" arm for clarity
fn get_log_level(verbose: u8, quiet: bool, config_level: &str) -> Level {
    if quiet {
        return Level::ERROR;
    }

    match verbose {
        0 => match config_level.to_lowercase().as_str() {
            "trace" => Level::TRACE,
            "debug" => Level::DEBUG,
            "info" => Level::INFO,
            "warn" => Level::WARN,
            "error" => Level::ERROR,
            _ => Level::WARN, // Default to warn for unknown levels
        },
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    }
}

/// Initialises the tracing subscriber for logging.
fn init_tracing(level: Level) {
    let filter = EnvFilter::from_default_env().add_directive(level.into());

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

/// Entry point for the mml-mcp-server binary.
fn main() -> ExitCode {
    let args = Args::parse();

    // Load configuration
    let config_path = args.config.as_deref();
    let cfg = match config::load_config(config_path) {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("Configuration error: {e}");
            return ExitCode::FAILURE;
        }
    };

    // Initialise logging
    let log_level = get_log_level(args.verbose, args.quiet, &cfg.logging.level);
    init_tracing(log_level);

    // CLI flags beat the config file, which beats compile-time defaults
    let defaults = ServerInfo::default();
    let info = ServerInfo {
        name: args.name.or(cfg.server.name).unwrap_or(defaults.name),
        version: args
            .server_version
            .or(cfg.server.version)
            .unwrap_or(defaults.version),
        description: args
            .description
            .or(cfg.server.description)
            .unwrap_or(defaults.description),
    };

    info!(
        name = %info.name,
        version = %info.version,
        "Starting MCP server"
    );

    if let Some(ref device) = cfg.midi.default_device {
        info!(device = %device, "Default MIDI output device configured");
    }

    // Register tools
    let mut registry = ToolRegistry::new();
    let registered = register_example_tools(&mut registry)
        .and_then(|()| register_music_tools(&mut registry, cfg.midi.default_device));
    if let Err(e) = registered {
        error!(error = %e, "Tool registration failed");
        return ExitCode::FAILURE;
    }

    info!(tools = registry.len(), "Tool registry ready");

    let mut server = McpServer::new(info, registry);

    info!("MCP server ready, waiting for client connection...");

    // Run the server
    let runtime = match tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            error!(error = %e, "Failed to create Tokio runtime");
            return ExitCode::FAILURE;
        }
    };

    let result = runtime.block_on(server.run());

    match result {
        Ok(()) => {
            info!("Server shut down gracefully");
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!(error = %e, "Server error");
            ExitCode::FAILURE
        }
    }
}
