//! Configuration for the `udise-sync` binary.

use std::{
  path::{Path, PathBuf},
  time::Duration,
};

use serde::Deserialize;

use crate::{
  coerce::CoercionMode,
  job::{DEFAULT_CHUNK_SIZE, DEFAULT_LEASE_TTL, SyncOptions},
};

/// Deserialised from an optional TOML file layered under `UDISE_SYNC_*`
/// environment variables.
#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct SyncConfig {
  pub source_path:    PathBuf,
  pub target_path:    PathBuf,
  pub chunk_size:     usize,
  pub coercion:       CoercionMode,
  pub lease_ttl_secs: u64,
}

impl Default for SyncConfig {
  fn default() -> Self {
    Self {
      source_path:    PathBuf::from("state.db"),
      target_path:    PathBuf::from("sync.db"),
      chunk_size:     DEFAULT_CHUNK_SIZE,
      coercion:       CoercionMode::Lenient,
      lease_ttl_secs: DEFAULT_LEASE_TTL.as_secs(),
    }
  }
}

impl SyncConfig {
  pub fn load(path: &Path) -> Result<Self, config::ConfigError> {
    Self::from_file_source(config::File::from(path).required(false))
  }

  fn from_file_source<S>(file: S) -> Result<Self, config::ConfigError>
  where
    S: config::Source + Send + Sync + 'static,
  {
    config::Config::builder()
      .add_source(file)
      .add_source(config::Environment::with_prefix("UDISE_SYNC"))
      .build()?
      .try_deserialize()
  }

  pub fn options(&self) -> SyncOptions {
    SyncOptions {
      chunk_size: self.chunk_size.max(1),
      mode:       self.coercion,
      lease_ttl:  Duration::from_secs(self.lease_ttl_secs),
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn from_toml(raw: &str) -> SyncConfig {
    SyncConfig::from_file_source(config::File::from_str(raw, config::FileFormat::Toml)).unwrap()
  }

  #[test]
  fn defaults() {
    let cfg = from_toml("");
    assert_eq!(cfg, SyncConfig::default());
    assert_eq!(cfg.options().chunk_size, 50_000);
    assert_eq!(cfg.options().lease_ttl, Duration::from_secs(3600));
  }

  #[test]
  fn coercion_mode_is_lowercase() {
    let cfg = from_toml("coercion = \"strict\"\nchunk_size = 0\n");
    assert_eq!(cfg.coercion, CoercionMode::Strict);
    assert_eq!(cfg.options().chunk_size, 1);
  }
}
