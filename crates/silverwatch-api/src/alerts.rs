//! Handlers for `/alerts` endpoints.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `GET`  | `/alerts/unread` | Unread alerts in wire shape, oldest first |
//! | `POST` | `/alerts/:id/read` | Always `{"ok":true}`; unknown ids are a no-op |

use std::sync::Arc;

use axum::{
  Json,
  extract::State,
};
use serde_json::{Value, json};
use silverwatch_core::{
  alert::{AlertEvent, WireAlert},
  store::MonitorStore,
};
use uuid::Uuid;

use crate::{error::ApiError, extract::ApiPath};

/// `GET /alerts/unread`
pub async fn unread<S>(
  State(store): State<Arc<S>>,
) -> Result<Json<Vec<WireAlert>>, ApiError>
where
  S: MonitorStore,
{
  let alerts = store.unread().await.map_err(ApiError::store)?;
  let wire = alerts
    .iter()
    .map(AlertEvent::to_wire)
    .collect::<Result<Vec<_>, _>>()?;
  Ok(Json(wire))
}

/// `POST /alerts/:id/read`
pub async fn mark_read<S>(
  State(store): State<Arc<S>>,
  ApiPath(id): ApiPath<Uuid>,
) -> Result<Json<Value>, ApiError>
where
  S: MonitorStore,
{
  store.mark_read(id).await.map_err(ApiError::store)?;
  Ok(Json(json!({ "ok": true })))
}
