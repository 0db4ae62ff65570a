//! Handlers for `/statuses` endpoints (the admin dashboard's view of the
//! status store).

use std::sync::Arc;

use axum::{
  Json,
  extract::State,
};
use silverwatch_core::{status::StatusRecord, store::MonitorStore};
use uuid::Uuid;

use crate::{error::ApiError, extract::ApiPath};

/// `GET /statuses`
pub async fn list<S>(
  State(store): State<Arc<S>>,
) -> Result<Json<Vec<StatusRecord>>, ApiError>
where
  S: MonitorStore,
{
  let statuses = store.list_statuses().await.map_err(ApiError::store)?;
  Ok(Json(statuses))
}

/// `GET /statuses/:user_id`
pub async fn get_one<S>(
  State(store): State<Arc<S>>,
  ApiPath(user_id): ApiPath<Uuid>,
) -> Result<Json<StatusRecord>, ApiError>
where
  S: MonitorStore,
{
  let status = store
    .get_status(user_id)
    .await
    .map_err(ApiError::store)?
    .ok_or_else(|| ApiError::NotFound(format!("no status for user {user_id}")))?;
  Ok(Json(status))
}
