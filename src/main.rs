//! Cursor-on-Target intake server.
//!
//! # Architecture Overview
//!
//! ```text
//!                      ┌──────────────────────────────────────────────┐
//!                      │                  COT INTAKE                   │
//!                      │                                               │
//!   TCP client         │  ┌──────────┐   ┌─────────┐   ┌───────────┐  │
//!   ───────────────────┼─▶│ acceptor │──▶│ framing │──▶│  record   │  │
//!                      │  │ (thread) │   │ + probe │   │  builder  │  │
//!                      │  └──────────┘   └─────────┘   └─────┬─────┘  │
//!                      │                                     │        │
//!                      │                                     ▼        │
//!                      │                              ┌────────────┐  │
//!                      │                              │  session   │  │
//!                      │                              │  (tokio)   │  │
//!                      │                              └────────────┘  │
//!                      │                                               │
//!                      │  config · observability · lifecycle           │
//!                      └──────────────────────────────────────────────┘
//! ```

use std::path::PathBuf;

use clap::Parser;

use cot_intake::config::{self, IntakeConfig, ListenerConfig};
use cot_intake::lifecycle::{signals, Shutdown};
use cot_intake::observability::{logging, metrics};
use cot_intake::IntakeService;

#[derive(Parser)]
#[command(name = "cot-intake")]
#[command(about = "Accepts Cursor-on-Target event connections over TCP", long_about = None)]
struct Cli {
    /// TOML configuration file; built-in defaults when omitted.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Listen on these addresses instead of the configured listeners.
    #[arg(short, long)]
    bind: Vec<String>,

    /// Validate the configuration and exit.
    #[arg(long)]
    check: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => config::load_config(path)?,
        None => IntakeConfig::default(),
    };
    if !cli.bind.is_empty() {
        config.listeners = cli
            .bind
            .iter()
            .enumerate()
            .map(|(i, address)| ListenerConfig {
                name: format!("cli-{i}"),
                bind_address: address.clone(),
            })
            .collect();
        config::validate_config(&config).map_err(config::ConfigError::Validation)?;
    }

    if cli.check {
        println!("configuration ok: {} listener(s)", config.listeners.len());
        return Ok(());
    }

    logging::init_logging(&config.observability)?;
    tracing::info!("cot-intake v{} starting", env!("CARGO_PKG_VERSION"));
    tracing::info!(
        listeners = config.listeners.len(),
        first_byte_timeout_ms = config.receive.first_byte_timeout_ms,
        receive_deadline_ms = config.receive.receive_deadline_ms,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        let addr = config.observability.metrics_address.parse()?;
        metrics::init_metrics(addr)?;
    }

    let shutdown = Shutdown::new();
    signals::spawn_signal_handler(shutdown.clone());

    IntakeService::run(&config, shutdown).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
