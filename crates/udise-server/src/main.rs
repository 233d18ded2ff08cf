//! udise-server binary.
//!
//! Reads `config.toml` (or the path given with `--config`), opens both SQLite
//! backends and serves the admin ingestion API over HTTP.
//!
//! ```
//! udise-server --config config.toml serve
//! udise-server reconcile --repair
//! ```

use std::{path::PathBuf, sync::Arc};

use anyhow::Context as _;
use clap::{Parser, Subcommand};
use tokio::net::TcpListener;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;
use udise_api::{BatchIngestor, reconcile};
use udise_server::{ServerConfig, app, open_backends};

#[derive(Parser)]
#[command(author, version, about = "UDISE admin ingestion server")]
struct Cli {
  /// Path to the TOML configuration file.
  #[arg(short, long, default_value = "config.toml")]
  config: PathBuf,

  #[command(subcommand)]
  command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
  /// Serve the HTTP API (the default).
  Serve,
  /// Compare the primary keys of both backends.
  Reconcile {
    /// Copy one-sided records into the backend that lacks them.
    #[arg(long)]
    repair: bool,
  },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
  tracing_subscriber::fmt()
    .with_env_filter(
      EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy(),
    )
    .init();

  let cli = Cli::parse();

  let cfg = ServerConfig::load(&cli.config).context("failed to load server configuration")?;

  let (state, rvsk) = open_backends(&cfg)
    .await
    .context("failed to open admin databases")?;

  match cli.command.unwrap_or(Command::Serve) {
    Command::Serve => {
      let ingestor =
        BatchIngestor::new(Arc::new(state), Arc::new(rvsk)).with_batch_size(cfg.batch_size);
      let address = cfg.address();

      tracing::info!("Listening on http://{address}");
      let listener = TcpListener::bind(&address)
        .await
        .with_context(|| format!("failed to bind {address}"))?;

      axum::serve(listener, app(Arc::new(ingestor)))
        .await
        .context("server error")?;
    }
    Command::Reconcile { repair } => {
      let report = reconcile(&state, &rvsk, repair)
        .await
        .context("reconciliation failed")?;
      println!(
        "missing in state: {:?}\nmissing in rvsk: {:?}\nrepaired: {}",
        report.missing_in_primary, report.missing_in_secondary, report.repaired
      );
    }
  }

  Ok(())
}
