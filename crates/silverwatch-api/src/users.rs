//! Handlers for `/users` endpoints.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `POST` | `/users` | Body: [`CreateBody`]; returns 201 + public profile |
//! | `GET`  | `/users/:id` | 404 if not found |
//!
//! Credentials are not accepted here; the auth service writes its own
//! columns.

use std::sync::Arc;

use axum::{
  Json,
  extract::State,
  http::StatusCode,
  response::IntoResponse,
};
use serde::Deserialize;
use silverwatch_core::{
  store::MonitorStore,
  user::{NewUser, UserProfile},
};
use uuid::Uuid;

use crate::{
  error::ApiError,
  extract::{ApiJson, ApiPath},
};

#[derive(Debug, Deserialize)]
pub struct CreateBody {
  pub name:        String,
  pub gender:      Option<String>,
  pub birth:       Option<String>,
  pub address:     Option<String>,
  pub phonenumber: Option<String>,
}

/// `POST /users`
pub async fn create<S>(
  State(store): State<Arc<S>>,
  ApiJson(body): ApiJson<CreateBody>,
) -> Result<impl IntoResponse, ApiError>
where
  S: MonitorStore,
{
  let name = body.name.trim();
  if name.is_empty() {
    return Err(ApiError::BadRequest("name must not be empty".into()));
  }

  let profile = store
    .create_user(NewUser {
      name: name.to_owned(),
      gender: body.gender,
      birth: body.birth,
      address: body.address,
      phonenumber: body.phonenumber,
      ..NewUser::default()
    })
    .await
    .map_err(ApiError::store)?;
  Ok((StatusCode::CREATED, Json(profile)))
}

/// `GET /users/:id`
pub async fn get_one<S>(
  State(store): State<Arc<S>>,
  ApiPath(id): ApiPath<Uuid>,
) -> Result<Json<UserProfile>, ApiError>
where
  S: MonitorStore,
{
  let profile = store
    .get_user_public(id)
    .await
    .map_err(ApiError::store)?
    .ok_or_else(|| ApiError::NotFound(format!("user {id} not found")))?;
  Ok(Json(profile))
}
