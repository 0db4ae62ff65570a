//! silverwatch server binary.
//!
//! Reads `config.toml` (or the path given with `--config`), opens the
//! SQLite store, starts the change observer, and serves the WebSocket feed
//! and REST API over HTTP until Ctrl-C.

use std::{
  path::{Path, PathBuf},
  sync::Arc,
};

use anyhow::Context as _;
use clap::Parser;
use silverwatch_core::store::MonitorStore as _;
use silverwatch_server::{AppState, ServerConfig, hub::BroadcastHub, observer::ChangeObserver};
use silverwatch_store_sqlite::SqliteStore;
use tokio::net::TcpListener;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about = "silverwatch notification server")]
struct Cli {
  /// Path to the TOML configuration file.
  #[arg(short, long, default_value = "config.toml")]
  config: PathBuf,
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

  let settings = config::Config::builder()
    .add_source(config::File::from(cli.config).required(false))
    .add_source(config::Environment::with_prefix("SILVERWATCH"))
    .build()
    .context("failed to read config file")?;

  let server_cfg: ServerConfig = settings
    .try_deserialize()
    .context("failed to deserialise ServerConfig")?;

  let store_path = expand_tilde(&server_cfg.store_path);
  if let Some(parent) = store_path.parent()
    && !parent.as_os_str().is_empty()
  {
    std::fs::create_dir_all(parent)
      .with_context(|| format!("failed to create {parent:?}"))?;
  }

  let store = SqliteStore::open(&store_path)
    .await
    .with_context(|| format!("failed to open store at {store_path:?}"))?;

  store
    .prune_changes(server_cfg.journal_retention)
    .await
    .context("failed to prune change journal")?;

  let state = AppState {
    store: Arc::new(store),
    hub:   Arc::new(BroadcastHub::new(server_cfg.session_queue)),
  };

  let observer = ChangeObserver::new(
    state.store.clone(),
    state.hub.clone(),
    server_cfg.observer_config(),
  )
  .spawn()
  .await
  .context("failed to start change observer")?;

  let hub = state.hub.clone();
  let app = silverwatch_server::router(state);
  let address = format!("{}:{}", server_cfg.host, server_cfg.port);

  tracing::info!("Listening on http://{address}");
  let listener = TcpListener::bind(&address)
    .await
    .with_context(|| format!("failed to bind {address}"))?;

  axum::serve(listener, app)
    .with_graceful_shutdown(async move {
      if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %e, "failed to listen for Ctrl-C");
      }
      tracing::info!("shutting down");
      hub.close_all().await;
    })
    .await
    .context("server error")?;

  observer.shutdown(server_cfg.shutdown_timeout()).await;
  Ok(())
}

/// Expand a leading `~` to the user's home directory.
fn expand_tilde(path: &Path) -> PathBuf {
  let s = path.to_string_lossy();
  if let Some(rest) = s.strip_prefix("~/")
    && let Ok(home) = std::env::var("HOME")
  {
    return PathBuf::from(home).join(rest);
  }
  path.to_path_buf()
}
