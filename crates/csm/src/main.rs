//! Codebase State Machine - entry point.
//!
//! Thin binary wrapping `csm-server`'s stdio MCP server. Lives in its own
//! facade crate separate from the library crates it wires together.

use clap::Parser;

/// Command line interface for the codebase state machine server.
#[derive(Parser, Debug)]
#[command(name = "csm")]
#[command(about = "Codebase State Machine - MCP server over stdio")]
#[command(version)]
pub struct Cli {
    /// Path to configuration file.
    #[arg(short, long)]
    pub config: Option<std::path::PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    csm_server::run_server(cli.config.as_deref()).await
}
