//! Toolgate server binary

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use toolgate_config::{ConfigLoader, ToolgateConfig};
use toolgate_server::{build_context, serve};
use toolgate_storage::DatabaseConnection;

/// Multi-tenant aggregation gateway for MCP servers
#[derive(Debug, Parser)]
#[command(name = "toolgate", version, about)]
struct Cli {
    /// Path to a YAML configuration file
    #[arg(short, long, global = true)]
    config: Option<std::path::PathBuf>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Run the gateway (default)
    Serve,
    /// Import services from a Claude-Desktop-style MCP JSON file
    Import {
        /// Path to the MCP JSON document
        file: std::path::PathBuf,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let config = ConfigLoader::new().load(cli.config.as_ref())?;

    match cli.command.unwrap_or(Command::Serve) {
        Command::Serve => serve(config).await,
        Command::Import { file } => import(config, &file).await,
    }
}

async fn import(config: ToolgateConfig, file: &std::path::Path) -> anyhow::Result<()> {
    let document = std::fs::read_to_string(file)?;
    let db = DatabaseConnection::new(
        &config.database.url,
        config.database.max_connections,
        config.database.connect_timeout,
    )
    .await?;
    db.migrate().await?;

    let ctx = build_context(&config, db.clone());
    let report = ctx
        .importer()
        .import(&document)
        .await
        .map_err(|e| anyhow::anyhow!(e.message().to_string()))?;

    println!("imported: {} created, {} failed", report.created(), report.failed());
    db.shutdown().await;
    Ok(())
}
