//! Wiring for the `udise-server` binary: configuration, backend startup and
//! the top-level router.

use std::{
  path::{Path, PathBuf},
  sync::Arc,
};

use axum::Router;
use serde::Deserialize;
use tower_http::trace::TraceLayer;
use udise_api::{BatchIngestor, DEFAULT_BATCH_SIZE, api_router};
use udise_store_sqlite::SqliteStore;

// ─── Configuration ────────────────────────────────────────────────────────────

/// Runtime server configuration, deserialised from `config.toml` and
/// `UDISE_*` environment variables.
#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct ServerConfig {
  pub host:          String,
  pub port:          u16,
  /// Primary backend; reads are served from here.
  pub state_db_path: PathBuf,
  /// Secondary backend.
  pub rvsk_db_path:  PathBuf,
  pub batch_size:    usize,
}

impl Default for ServerConfig {
  fn default() -> Self {
    Self {
      host:          "0.0.0.0".to_string(),
      port:          8000,
      state_db_path: PathBuf::from("state.db"),
      rvsk_db_path:  PathBuf::from("rvsk.db"),
      batch_size:    DEFAULT_BATCH_SIZE,
    }
  }
}

impl ServerConfig {
  /// Layer the optional TOML file at `path` under the environment.
  pub fn load(path: &Path) -> Result<Self, config::ConfigError> {
    Self::from_file_source(config::File::from(path).required(false))
  }

  fn from_file_source<S>(file: S) -> Result<Self, config::ConfigError>
  where
    S: config::Source + Send + Sync + 'static,
  {
    config::Config::builder()
      .add_source(file)
      .add_source(config::Environment::with_prefix("UDISE"))
      .build()?
      .try_deserialize()
  }

  pub fn address(&self) -> String { format!("{}:{}", self.host, self.port) }
}

// ─── Startup ──────────────────────────────────────────────────────────────────

/// Open both backends, creating the `admin` table in each if needed.
pub async fn open_backends(
  cfg: &ServerConfig,
) -> udise_store_sqlite::Result<(SqliteStore, SqliteStore)> {
  let state = SqliteStore::open(expand_tilde(&cfg.state_db_path)).await?;
  let rvsk = SqliteStore::open(expand_tilde(&cfg.rvsk_db_path)).await?;
  tracing::info!("admin tables ensured in both databases");
  Ok((state, rvsk))
}

/// The API router wrapped in request tracing.
pub fn app(ingestor: Arc<BatchIngestor<SqliteStore>>) -> Router {
  api_router(ingestor).layer(TraceLayer::new_for_http())
}

/// Expand a leading `~` to the user's home directory.
pub fn expand_tilde(path: &Path) -> PathBuf {
  let s = path.to_string_lossy();
  if let Some(rest) = s.strip_prefix("~/")
    && let Ok(home) = std::env::var("HOME")
  {
    return PathBuf::from(home).join(rest);
  }
  path.to_path_buf()
}

#[cfg(test)]
mod tests {
  use axum::{
    body::Body,
    http::{Request, StatusCode},
  };
  use tower::ServiceExt as _;

  use super::*;

  fn from_toml(raw: &str) -> ServerConfig {
    ServerConfig::from_file_source(config::File::from_str(raw, config::FileFormat::Toml)).unwrap()
  }

  #[test]
  fn empty_file_gives_defaults() {
    let cfg = from_toml("");
    assert_eq!(cfg.port, 8000);
    assert_eq!(cfg.state_db_path, PathBuf::from("state.db"));
    assert_eq!(cfg.rvsk_db_path, PathBuf::from("rvsk.db"));
    assert_eq!(cfg.batch_size, 1000);
  }

  #[test]
  fn file_overrides_defaults() {
    let cfg = from_toml("host = \"127.0.0.1\"\nport = 9100\nbatch_size = 250\n");
    assert_eq!(cfg.address(), "127.0.0.1:9100");
    assert_eq!(cfg.batch_size, 250);
    assert_eq!(cfg.rvsk_db_path, PathBuf::from("rvsk.db"));
  }

  #[test]
  fn tilde_is_expanded_only_as_a_prefix() {
    assert_eq!(expand_tilde(Path::new("data/state.db")), PathBuf::from("data/state.db"));
    assert_eq!(expand_tilde(Path::new("/a/~/b")), PathBuf::from("/a/~/b"));
  }

  #[tokio::test]
  async fn traced_app_serves_the_api() {
    let state = SqliteStore::open_in_memory().await.unwrap();
    let rvsk = SqliteStore::open_in_memory().await.unwrap();
    let ingestor = Arc::new(BatchIngestor::new(Arc::new(state), Arc::new(rvsk)));

    let resp = app(ingestor)
      .oneshot(Request::get("/admin").body(Body::empty()).unwrap())
      .await
      .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
  }
}
