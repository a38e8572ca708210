//! Document signing MCP server binary
//!
//! Entry point for the MCP server supporting multiple transports.

use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use mcp_server::{ServerConfig, SigningMcpServer};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Parser, Debug)]
#[command(name = "docsign-mcp-server")]
#[command(
    version,
    about = "PDF form filling and e-signature tools via Model Context Protocol"
)]
struct Args {
    /// Transport mode: stdio or http
    #[arg(short, long, default_value = "stdio")]
    transport: String,

    /// HTTP server address (only used with http transport)
    #[arg(long, default_value = "127.0.0.1:3000")]
    http_addr: String,

    /// Per tool call timeout in milliseconds
    #[arg(long)]
    timeout_ms: Option<u64>,

    /// Directory for filled and signed PDFs (overrides OUTPUT_DIR)
    #[arg(long)]
    output_dir: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    let env_file = dotenvy::dotenv().ok();

    // Initialize tracing - CRITICAL: use stderr for stdio transport
    let use_stderr = args.transport == "stdio";

    if use_stderr {
        // For stdio transport, ALL output must go to stderr
        tracing_subscriber::registry()
            .with(EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into()))
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    } else {
        tracing_subscriber::registry()
            .with(EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into()))
            .with(tracing_subscriber::fmt::layer())
            .init();
    }

    tracing::info!("Starting docsign MCP server v{}", env!("CARGO_PKG_VERSION"));
    tracing::info!("Transport: {}", args.transport);
    if let Some(path) = env_file {
        tracing::info!("Loaded environment from {}", path.display());
    }

    let mut config = ServerConfig::from_env().context("invalid configuration")?;
    if let Some(timeout_ms) = args.timeout_ms {
        config = config.with_timeout_ms(timeout_ms);
    }
    if let Some(output_dir) = args.output_dir {
        config = config.with_output_dir(output_dir);
    }
    tracing::info!(
        "Output directory: {}, timeout: {}ms, notifications: {}",
        config.output_dir.display(),
        config.timeout_ms,
        if config.notifier.is_enabled() { "on" } else { "off" }
    );

    let server = SigningMcpServer::new(config).context("failed to initialise providers")?;

    match args.transport.as_str() {
        "stdio" => {
            mcp_server::transport::stdio::run_stdio_server(server).await?;
        }
        #[cfg(feature = "http")]
        "http" => {
            mcp_server::transport::http::run_http_server(&args.http_addr, server).await?;
        }
        #[cfg(not(feature = "http"))]
        "http" => {
            eprintln!("HTTP transport not enabled. Rebuild with --features http");
            std::process::exit(1);
        }
        other => {
            eprintln!("Unknown transport: {}. Use 'stdio' or 'http'", other);
            std::process::exit(1);
        }
    }

    Ok(())
}
