//! Real-time notification server for silverwatch.
//!
//! Watches the status store for severity changes, records each one in the
//! alert log, and pushes it to every connected dashboard over WebSocket.
//! The REST API from `silverwatch-api` is mounted under `/api`.

pub mod error;
pub mod hub;
pub mod observer;
pub mod session;

pub use error::Error;

use std::{path::PathBuf, sync::Arc, time::Duration};

use axum::{
  Router,
  extract::{State, WebSocketUpgrade},
  response::Response,
  routing::get,
};
use serde::Deserialize;
use silverwatch_core::store::MonitorStore;
use tower_http::trace::TraceLayer;

use hub::BroadcastHub;
use observer::ObserverConfig;

// ─── Configuration ────────────────────────────────────────────────────────────

/// Runtime server configuration, deserialised from `config.toml` and
/// `SILVERWATCH_*` environment variables. Every field has a default.
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ServerConfig {
  pub host:                String,
  pub port:                u16,
  pub store_path:          PathBuf,
  /// Idle sleep between change-feed polls.
  pub poll_interval_ms:    u64,
  /// Back-off after a failed poll.
  pub retry_delay_ms:      u64,
  /// How long shutdown waits for the observer before aborting it.
  pub shutdown_timeout_ms: u64,
  /// Outbound frames buffered per session before it is dropped.
  pub session_queue:       usize,
  /// Journal entries kept when pruning at startup.
  pub journal_retention:   u64,
  pub consumer:            String,
}

impl Default for ServerConfig {
  fn default() -> Self {
    Self {
      host:                "127.0.0.1".to_owned(),
      port:                8000,
      store_path:          PathBuf::from("~/.local/share/silverwatch/silverwatch.db"),
      poll_interval_ms:    250,
      retry_delay_ms:      2_000,
      shutdown_timeout_ms: 5_000,
      session_queue:       64,
      journal_retention:   10_000,
      consumer:            "severity-observer".to_owned(),
    }
  }
}

impl ServerConfig {
  pub fn observer_config(&self) -> ObserverConfig {
    ObserverConfig {
      consumer:      self.consumer.clone(),
      poll_interval: Duration::from_millis(self.poll_interval_ms),
      retry_delay:   Duration::from_millis(self.retry_delay_ms),
    }
  }

  pub fn shutdown_timeout(&self) -> Duration { Duration::from_millis(self.shutdown_timeout_ms) }
}

// ─── Application state ────────────────────────────────────────────────────────

/// Shared state threaded through all axum handlers.
pub struct AppState<S> {
  pub store: Arc<S>,
  pub hub:   Arc<BroadcastHub>,
}

impl<S> Clone for AppState<S> {
  fn clone(&self) -> Self {
    Self {
      store: self.store.clone(),
      hub:   self.hub.clone(),
    }
  }
}

// ─── Router ───────────────────────────────────────────────────────────────────

/// Build the full HTTP surface: `/ws`, `/healthz`, and the REST API under
/// `/api`.
pub fn router<S>(state: AppState<S>) -> Router
where
  S: MonitorStore + 'static,
{
  let api = silverwatch_api::api_router(state.store.clone());
  Router::new()
    .route("/ws", get(ws_handler::<S>))
    .route("/healthz", get(healthz))
    .with_state(state)
    .nest("/api", api)
    .layer(TraceLayer::new_for_http())
}

async fn ws_handler<S>(State(state): State<AppState<S>>, upgrade: WebSocketUpgrade) -> Response
where
  S: MonitorStore + 'static,
{
  upgrade.on_upgrade(move |socket| session::run(socket, state.hub, state.store))
}

async fn healthz() -> &'static str { "ok" }

#[cfg(test)]
mod tests {
  use super::*;

  use axum::{
    body::Body,
    http::{Request, StatusCode},
  };
  use silverwatch_store_sqlite::SqliteStore;
  use tower::ServiceExt as _;

  async fn app() -> Router {
    let store = Arc::new(SqliteStore::open_in_memory().await.unwrap());
    router(AppState {
      store,
      hub: Arc::new(BroadcastHub::new(8)),
    })
  }

  async fn get_path(path: &str) -> (StatusCode, String) {
    let resp = app()
      .await
      .oneshot(Request::builder().uri(path).body(Body::empty()).unwrap())
      .await
      .unwrap();
    let status = resp.status();
    let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    (status, String::from_utf8(bytes.to_vec()).unwrap())
  }

  #[tokio::test]
  async fn healthz_responds_ok() {
    assert_eq!(get_path("/healthz").await, (StatusCode::OK, "ok".to_owned()));
  }

  #[tokio::test]
  async fn api_is_mounted_under_prefix() {
    let (status, body) = get_path("/api/alerts/unread").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, "[]");
  }

  #[tokio::test]
  async fn ws_rejects_plain_get() {
    let (status, _) = get_path("/ws").await;
    assert!(status.is_client_error());
  }

  #[test]
  fn partial_config_falls_back_to_defaults() {
    let cfg: ServerConfig = serde_json::from_str(r#"{"port": 9100}"#).unwrap();
    assert_eq!(cfg.port, 9100);
    assert_eq!(cfg.session_queue, 64);
    assert_eq!(cfg.observer_config().poll_interval, Duration::from_millis(250));
  }
}
