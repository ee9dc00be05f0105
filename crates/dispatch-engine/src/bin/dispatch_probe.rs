//! Dispatch Probe
//!
//! Runs one ticket through the dispatch engine against a SQLite database and
//! prints the resulting decision as JSON. Useful for checking a rule set
//! before it goes live.
//!
//! ```text
//! echo '{"priority":"urgent","category":"network"}' | dispatch-probe --database-url sqlite://helpdesk.db
//! ```

use std::io::Read;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;

use helpdesk_dispatch_engine::logging::init_logging;
use helpdesk_dispatch_engine::prelude::*;

#[derive(Parser, Debug)]
#[command(author, version, about = "Route a ticket and print the dispatch decision", long_about = None)]
struct Args {
    /// TOML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Database URL, overriding the configuration
    #[arg(short, long)]
    database_url: Option<String>,

    /// Ticket JSON file; reads stdin when omitted
    #[arg(short, long)]
    ticket: Option<PathBuf>,

    /// Print engine counters after the decision
    #[arg(long)]
    stats: bool,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let mut config = DispatchConfig::load(args.config.as_deref()).context("failed to load configuration")?;
    if let Some(database_url) = args.database_url {
        config.database.database_url = database_url;
    }
    if args.verbose {
        config.logging.level = "debug".to_string();
    }

    init_logging(&config.logging)?;

    let ticket_json = match &args.ticket {
        Some(path) => std::fs::read_to_string(path)
            .with_context(|| format!("failed to read ticket from {}", path.display()))?,
        None => {
            let mut buffer = String::new();
            std::io::stdin()
                .read_to_string(&mut buffer)
                .context("failed to read ticket from stdin")?;
            buffer
        }
    };
    let ticket: TicketSnapshot = serde_json::from_str(&ticket_json).context("ticket is not valid JSON")?;

    info!("🔌 Connecting to {}", config.database.database_url);
    let store = SqliteDispatchStore::connect(&config.database).await?;

    // Wait for the usage increment instead of racing process exit
    config.routing.record_usage_in_background = false;
    let engine = DispatchEngine::new(Arc::new(store), config).await?;

    let decision = engine.dispatch(&ticket).await;
    println!("{}", serde_json::to_string_pretty(&decision)?);

    if args.stats {
        println!("{}", serde_json::to_string_pretty(&engine.stats())?);
    }

    Ok(())
}
