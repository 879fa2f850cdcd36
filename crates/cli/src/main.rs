use anyhow::Result;
use clap::{Parser, Subcommand};
use dhanmcp_broker::{DhanClient, DhanConfig};
use dhanmcp_server::ToolDispatcher;
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser)]
#[command(name = "dhan-mcp")]
#[command(about = "MCP server exposing the Dhan trading API as agent-callable tools")]
#[command(version)]
struct Cli {
    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, default_value = "info")]
    log_level: String,

    /// Path to a TOML config file with credentials
    #[arg(short, long, env = "DHAN_MCP_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Serve MCP over stdin/stdout (the default)
    Serve,

    /// List the tools exposed to MCP clients
    Tools,

    /// Resolve and validate credentials without starting the server
    CheckConfig,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Protocol frames own stdout, so all diagnostics go to stderr.
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&cli.log_level));
    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    match cli.command.unwrap_or(Commands::Serve) {
        Commands::Serve => serve(cli.config.as_deref()).await,
        Commands::Tools => {
            println!("Tools exposed over MCP:");
            for tool in dhanmcp_server::registry::tool_descriptors() {
                println!("  {:28} {}", tool.name, tool.description);
            }
            Ok(())
        }
        Commands::CheckConfig => {
            let config = DhanConfig::resolve(cli.config.as_deref())?;
            println!("Configuration OK");
            println!("  Client ID:    {}", mask(&config.client_id));
            println!("  Access token: {}", mask(&config.access_token));
            println!("  Base URL:     {}", config.base_url);
            println!("  Timeout:      {}s", config.timeout_secs);
            Ok(())
        }
    }
}

async fn serve(config_path: Option<&std::path::Path>) -> Result<()> {
    let config = DhanConfig::resolve(config_path)?;
    tracing::info!(
        client_id = %mask(&config.client_id),
        base_url = %config.base_url,
        "Starting dhan-mcp server"
    );

    let client = DhanClient::new(config)?;
    let dispatcher = Arc::new(ToolDispatcher::new(Arc::new(client)));
    dhanmcp_server::serve_stdio(dispatcher).await
}

/// Keep enough of a credential to recognize it in logs, hide the rest.
fn mask(value: &str) -> String {
    if value.chars().count() <= 4 {
        "****".to_string()
    } else {
        let prefix: String = value.chars().take(4).collect();
        format!("{}…", prefix)
    }
}
