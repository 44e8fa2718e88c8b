//! # Tillbook CLI
//!
//! Reads commands from stdin, one per line, and prints the ledger's reply.
//!
//! ## Startup Sequence
//! 1. Initialize tracing (logging, to stderr)
//! 2. Load `LedgerConfig` from `tillbook.toml` and `TILLBOOK_*` variables
//! 3. Connect to the database and apply migrations
//! 4. Answer lines until EOF or Ctrl-C
//!
//! ## Usage
//! ```bash
//! tillbook
//! tillbook --config ./shop.toml --shop corner-store
//! echo "sell 3 bread" | tillbook
//! ```

use anyhow::Context;
use std::env;
use std::path::PathBuf;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use tillbook_core::ReplyPayload;
use tillbook_db::Database;
use tillbook_ledger::{Ledger, LedgerConfig};

#[derive(Debug, Default)]
struct Args {
    config: Option<PathBuf>,
    shop: Option<String>,
    help: bool,
}

fn parse_args() -> Args {
    let argv: Vec<String> = env::args().collect();
    let mut args = Args::default();

    let mut i = 1;
    while i < argv.len() {
        match argv[i].as_str() {
            "--config" | "-c" => {
                if let Some(path) = argv.get(i + 1) {
                    args.config = Some(PathBuf::from(path));
                    i += 1;
                }
            }
            "--shop" | "-s" => {
                if let Some(shop) = argv.get(i + 1) {
                    args.shop = Some(shop.clone());
                    i += 1;
                }
            }
            "--help" | "-h" => args.help = true,
            other => warn!(argument = other, "Ignoring unknown argument"),
        }
        i += 1;
    }
    args
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    let args = parse_args();
    if args.help {
        println!("Tillbook - text-command shop ledger");
        println!();
        println!("Usage: tillbook [OPTIONS]");
        println!();
        println!("Options:");
        println!("  -c, --config <PATH>  Config file (default: ./tillbook.toml)");
        println!("  -s, --shop <ID>      Shop to act for (default: from config)");
        println!("  -h, --help           Show this help message");
        println!();
        println!("Send 'help' once running to list the commands.");
        return Ok(());
    }

    let config = LedgerConfig::load(args.config.as_deref()).context("loading configuration")?;
    let shop = args.shop.unwrap_or_else(|| config.default_shop.clone());

    let db = Database::new(config.db_config())
        .await
        .with_context(|| format!("opening database {}", config.database_path.display()))?;
    let status = db.migration_status().await?;
    info!(applied = status.applied, available = status.available, "Database ready");

    let ledger = Ledger::new(db.clone(), &config);
    info!(shop = %shop, "Listening on stdin");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdout = tokio::io::stdout();

    loop {
        let line = tokio::select! {
            line = lines.next_line() => line.context("reading stdin")?,
            _ = tokio::signal::ctrl_c() => {
                info!("Interrupted");
                break;
            }
        };
        let Some(line) = line else { break };
        if line.trim().is_empty() {
            continue;
        }

        let out = match ledger.handle_incoming_text(&shop, &line).await {
            ReplyPayload::Text { text } => text,
            ReplyPayload::Document { path, caption } => {
                format!("{caption}\n[report saved to {}]", path.display())
            }
        };
        stdout.write_all(out.as_bytes()).await?;
        stdout.write_all(b"\n\n").await?;
        stdout.flush().await?;
    }

    db.close().await;
    info!("Shutdown complete");
    Ok(())
}

/// Logs go to stderr so replies on stdout stay clean.
///
/// `RUST_LOG` overrides the default `info,tillbook=debug,sqlx=warn`.
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,tillbook=debug,sqlx=warn"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}
