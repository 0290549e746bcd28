//! widget-mcp: MCP server for tools, prompts, resources and UI widgets
//!
//! Serves the sample application over HTTP (default) or stdio.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use tracing::{error, info, Level};
use tracing_subscriber::EnvFilter;

use widget_mcp::config;
use widget_mcp::demo;
use widget_mcp::error::ServeError;
use widget_mcp::mcp::dispatcher::Dispatcher;
use widget_mcp::mcp::http::{self, HttpOptions};
use widget_mcp::mcp::transport::serve_stdio;

/// MCP server for tools, prompts, resources and UI widgets.
///
/// Serves a sample application with a widget-backed `greet` tool, a status
/// resource, a templated notes resource and a summarize prompt.
#[derive(Parser, Debug)]
#[command(name = "widget-mcp")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to configuration file
    #[arg(value_name = "CONFIG_FILE")]
    config: Option<PathBuf>,

    /// Increase logging verbosity (-v for info, -vv for debug, -vvv for trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Decrease logging verbosity (only show errors)
    #[arg(short, long)]
    quiet: bool,

    /// Serve newline-delimited JSON-RPC on stdin/stdout instead of HTTP
    #[arg(long)]
    stdio: bool,

    /// Override the HTTP bind address (IP:PORT)
    #[arg(long, value_name = "ADDRESS", conflicts_with = "stdio")]
    bind: Option<SocketAddr>,
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
///
/// Logs go to stderr so stdout stays free for the stdio transport.
fn init_tracing(level: Level) {
    let filter = EnvFilter::from_default_env().add_directive(level.into());

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

/// Serves the sample application with the chosen transport.
async fn run(
    dispatcher: Arc<Dispatcher>,
    stdio: bool,
    address: SocketAddr,
    options: HttpOptions,
) -> Result<(), ServeError> {
    if stdio {
        serve_stdio(&dispatcher).await?;
        return Ok(());
    }
    http::serve(dispatcher, address, &options).await
}

/// Entry point for the widget-mcp server.
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

    // Display GPL license notice (required by GPLv3 Section 5d)
    eprintln!(
        "widget-mcp {}  Copyright (C) 2026  The Embedded Society",
        env!("CARGO_PKG_VERSION")
    );
    eprintln!("This program comes with ABSOLUTELY NO WARRANTY.");
    eprintln!("This is free software, licensed under GPL-3.0-or-later.");
    eprintln!();

    info!(
        version = env!("CARGO_PKG_VERSION"),
        name = %cfg.server.name,
        domain = %cfg.server.domain,
        "Starting widget-mcp server"
    );

    let server = match demo::build_server(&cfg.server) {
        Ok(server) => server,
        Err(e) => {
            error!(error = %e, "Invalid capability definitions");
            return ExitCode::FAILURE;
        }
    };
    let dispatcher = Arc::new(Dispatcher::new(server));

    let address = match args.bind {
        Some(address) => address,
        None => match cfg.http.socket_addr() {
            Ok(address) => address,
            Err(e) => {
                error!(error = %e, "Invalid bind address");
                return ExitCode::FAILURE;
            }
        },
    };
    let options = HttpOptions {
        endpoint_path: cfg.http.endpoint_path,
        widgets_dir: cfg.http.widgets_dir,
    };

    // Run the server
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .expect("Failed to create Tokio runtime");

    let result = runtime.block_on(run(dispatcher, args.stdio, address, options));

    match result {
        Ok(()) => {
            info!("Server shut down gracefully");
            ExitCode::SUCCESS
        }
        Err(e) => {
            let source = std::error::Error::source(&e).map(ToString::to_string);
            error!(error = %e, source = source.as_deref().unwrap_or(""), "Server error");
            ExitCode::FAILURE
        }
    }
}
