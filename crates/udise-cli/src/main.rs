//! `udise-post`: push a JSON file of admin records to the ingestion API.
//!
//! # Usage
//!
//! ```
//! udise-post --file admins.json --url http://localhost:8000 --batch-size 1000
//! udise-post --file admins.json --config ~/.config/udise/post.toml
//! ```

mod client;
mod driver;

use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use clap::Parser;
use client::{ApiClient, ApiConfig};
use serde::Deserialize;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

const DEFAULT_URL: &str = "http://127.0.0.1:8000";
const DEFAULT_BATCH_SIZE: usize = 1000;

// ─── CLI args ─────────────────────────────────────────────────────────────────

#[derive(Parser, Debug)]
#[command(name = "udise-post", about = "Post admin records to the ingestion API in batches")]
struct Args {
  /// JSON file holding an array of records.
  #[arg(short, long, value_name = "FILE")]
  file: PathBuf,

  /// Path to a TOML config file (url, batch_size).
  #[arg(short, long, value_name = "FILE")]
  config: Option<PathBuf>,

  /// Base URL of the ingestion server (default: http://127.0.0.1:8000).
  #[arg(long, env = "UDISE_URL")]
  url: Option<String>,

  /// Records per request (default: 1000).
  #[arg(short, long, env = "UDISE_BATCH_SIZE")]
  batch_size: Option<usize>,
}

// ─── Config file ──────────────────────────────────────────────────────────────

/// Shape of the optional TOML config file.
#[derive(Deserialize, Default)]
struct ConfigFile {
  #[serde(default)]
  url:        String,
  #[serde(default)]
  batch_size: Option<usize>,
}

// ─── Entry point ──────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> Result<()> {
  tracing_subscriber::fmt()
    .with_env_filter(
      EnvFilter::builder()
        .with_default_directive(LevelFilter::WARN.into())
        .from_env_lossy(),
    )
    .init();

  let args = Args::parse();

  let file_cfg: ConfigFile = if let Some(path) = &args.config {
    let raw = std::fs::read_to_string(path)
      .with_context(|| format!("reading config file {}", path.display()))?;
    toml::from_str(&raw).context("parsing config file")?
  } else {
    ConfigFile::default()
  };

  // CLI flags override config file, which overrides defaults.
  let base_url = args
    .url
    .or_else(|| (!file_cfg.url.is_empty()).then(|| file_cfg.url.clone()))
    .unwrap_or_else(|| DEFAULT_URL.to_string());
  let batch_size = args
    .batch_size
    .or(file_cfg.batch_size)
    .unwrap_or(DEFAULT_BATCH_SIZE);

  let records = driver::load_records(&args.file)?;
  let client = ApiClient::new(ApiConfig { base_url })?;

  let summary = driver::post_all(&client, &records, batch_size).await;
  if let Some(batch) = summary.failed_batch {
    bail!("stopped at batch {batch}");
  }
  Ok(())
}
