//! udise-sync binary.
//!
//! Copies `admin` rows newer than the target's watermark from the source
//! database into the target database.
//!
//! ```
//! udise-sync --config sync.toml
//! udise-sync --source state.db --target sync.db
//! ```

use std::path::PathBuf;

use anyhow::Context as _;
use clap::Parser;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;
use udise_store_sqlite::SqliteStore;
use udise_sync::{SyncConfig, SyncJob, SyncMode};

#[derive(Parser)]
#[command(author, version, about = "Incremental UDISE admin table sync")]
struct Cli {
  /// Path to the TOML configuration file.
  #[arg(short, long, default_value = "sync.toml")]
  config: PathBuf,

  /// Source database; overrides the configuration.
  #[arg(long)]
  source: Option<PathBuf>,

  /// Target database; overrides the configuration.
  #[arg(long)]
  target: Option<PathBuf>,
}

impl Cli {
  /// Path flags win over the configuration.
  fn override_paths(&self, cfg: &mut SyncConfig) {
    if let Some(source) = &self.source {
      cfg.source_path = source.clone();
    }
    if let Some(target) = &self.target {
      cfg.target_path = target.clone();
    }
  }
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

  let mut cfg = SyncConfig::load(&cli.config).context("failed to load sync configuration")?;
  cli.override_paths(&mut cfg);

  let source = SqliteStore::connect(&cfg.source_path)
    .await
    .with_context(|| format!("failed to open source at {:?}", cfg.source_path))?;
  let target = SqliteStore::connect(&cfg.target_path)
    .await
    .with_context(|| format!("failed to open target at {:?}", cfg.target_path))?;

  let report = SyncJob::new(&source, &target, cfg.options())
    .run()
    .await
    .context("sync failed")?;

  match report.mode {
    SyncMode::RowByRow { failed_at: Some(index) } => {
      tracing::warn!(
        inserted = report.inserted,
        fetched = report.fetched,
        failed_at = index,
        "sync stopped early"
      );
    }
    _ => {
      tracing::info!(
        inserted = report.inserted,
        fetched = report.fetched,
        mode = ?report.mode,
        "sync finished"
      );
    }
  }

  Ok(())
}
