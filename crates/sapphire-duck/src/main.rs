//! Sapphire Duck MCP Server
//!
//! Serves the Model Context Protocol over stdin/stdout. Diagnostics go to
//! stderr; stdout carries protocol frames only.

use std::io;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context};
use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use sapphire_duck::config::{Config, LogFormat, ServerConfig};
use sapphire_duck::protocol::codec;
use sapphire_duck::protocol::messages::ListToolsResult;
use sapphire_duck::protocol::stdio::StdioTransport;
use sapphire_duck::protocol::types::{JsonRpcNotification, JsonRpcRequest, MCP_VERSION};
use sapphire_duck::startup;
use sapphire_duck::McpServer;
use sapphire_duck_core::Mailbox;

/// MCP server exposing a local mailbox over stdio
#[derive(Parser)]
#[command(name = "sapphire-duck")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "MCP server over stdio exposing email tools to AI clients")]
struct Cli {
    /// Config file (default: platform config dir/config.toml)
    #[arg(long, env = "SAPPHIRE_DUCK_CONFIG", value_name = "PATH")]
    config: Option<PathBuf>,

    /// Mailbox directory, overrides the config file
    #[arg(long, env = "SAPPHIRE_DUCK_DATA_DIR", value_name = "PATH")]
    data_dir: Option<PathBuf>,

    /// Run an in-process handshake against the configured tools and exit
    #[arg(long)]
    self_test: bool,
}

/// Initialize logging to stderr (stdout is for JSON-RPC)
fn init_logging(server: &ServerConfig) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&server.log_level));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .with_ansi(false);

    match server.log_format {
        LogFormat::Text => builder.init(),
        LogFormat::Json => builder.json().init(),
    }
}

#[tokio::main]
async fn main() {
    // Parse CLI arguments first (before logging init, so --help/--version work cleanly)
    let cli = Cli::parse();

    let (config, source) = match Config::load(cli.config.as_deref()) {
        Ok(loaded) => loaded,
        Err(e) => {
            eprintln!("error: {}", e);
            std::process::exit(1);
        }
    };
    init_logging(&config.server);

    info!("Sapphire Duck MCP Server v{} starting...", env!("CARGO_PKG_VERSION"));
    source.log();

    if let Err(e) = run(cli, config).await {
        error!("{:#}", e);
        std::process::exit(1);
    }

    info!("Sapphire Duck MCP Server shutting down");
}

async fn run(cli: Cli, config: Config) -> anyhow::Result<()> {
    let data_dir = config.data_dir(cli.data_dir);
    let mailbox = Arc::new(Mailbox::open(data_dir).context("Failed to open mailbox")?);
    if let Some(path) = mailbox.path() {
        info!("Mailbox opened at {}", path.display());
    }

    let server = startup::build_server(mailbox, &config.accounts)?;

    if cli.self_test {
        let tools = self_test(server).await.context("Self-test failed")?;
        info!("Self-test passed, {} tool(s) available: {}", tools.len(), tools.join(", "));
        return Ok(());
    }

    info!("Starting MCP server on stdio...");
    StdioTransport::new().run(server).await?;
    Ok(())
}

/// initialize → notifications/initialized → tools/list, in process
async fn self_test(mut server: McpServer) -> anyhow::Result<Vec<String>> {
    let initialize = JsonRpcRequest::new(
        1,
        "initialize",
        Some(serde_json::json!({
            "protocolVersion": MCP_VERSION,
            "capabilities": {},
            "clientInfo": {"name": "sapphire-duck-self-test", "version": env!("CARGO_PKG_VERSION")}
        })),
    );
    let response = server
        .handle_frame(&codec::encode(&initialize)?)
        .await
        .context("initialize was not answered")?;
    if let Some(err) = response.error {
        bail!("initialize failed: {}", err);
    }

    let initialized = JsonRpcNotification::new("notifications/initialized", None);
    if server.handle_frame(&codec::encode(&initialized)?).await.is_some() {
        bail!("notifications/initialized was answered");
    }

    let list = JsonRpcRequest::new(2, "tools/list", Some(serde_json::json!({})));
    let response = server
        .handle_frame(&codec::encode(&list)?)
        .await
        .context("tools/list was not answered")?;
    if let Some(err) = response.error {
        bail!("tools/list failed: {}", err);
    }
    let result: ListToolsResult =
        serde_json::from_value(response.result.context("tools/list returned no result")?)?;

    server.close();
    Ok(result.tools.into_iter().map(|t| t.name).collect())
}
