//! Handlers for `/chat` endpoints.
//!
//! The chat collaborator runs sentiment inference and the LLM, then reports
//! each finished turn here. Recording a turn is what drives the status
//! store, and through it the change feed.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `POST` | `/chat/turns` | Body: [`TurnBody`]; returns the written status |
//! | `GET`  | `/chat/:user_id/history` | Messages in recording order |

use std::sync::Arc;

use axum::{
  Json,
  extract::State,
};
use serde::Deserialize;
use silverwatch_core::{
  conversation::{ChatMessage, NewChatMessage},
  status::{StatusRecord, StatusUpdate},
  store::MonitorStore,
};
use uuid::Uuid;

use crate::{
  error::ApiError,
  extract::{ApiJson, ApiPath},
};

// ─── Record a turn ────────────────────────────────────────────────────────────

/// One processed chat turn.
#[derive(Debug, Deserialize)]
pub struct TurnBody {
  pub user_id:          Uuid,
  pub user_input:       String,
  pub ai_response:      String,
  pub sentiment_label:  Option<String>,
  /// 0.0–1.0.
  pub sentiment_score:  Option<f64>,
  /// 0–10; absent when the LLM reply could not be parsed.
  pub depression_score: Option<i32>,
  pub disease:          Option<String>,
}

impl TurnBody {
  fn validate(&self) -> Result<(), ApiError> {
    if let Some(score) = self.sentiment_score
      && !(0.0..=1.0).contains(&score)
    {
      return Err(ApiError::BadRequest(format!(
        "sentiment_score must be within 0..=1, got {score}"
      )));
    }
    if let Some(score) = self.depression_score
      && !(0..=10).contains(&score)
    {
      return Err(ApiError::BadRequest(format!(
        "depression_score must be within 0..=10, got {score}"
      )));
    }
    Ok(())
  }
}

/// `POST /chat/turns`
pub async fn record_turn<S>(
  State(store): State<Arc<S>>,
  ApiJson(body): ApiJson<TurnBody>,
) -> Result<Json<StatusRecord>, ApiError>
where
  S: MonitorStore,
{
  body.validate()?;

  let user_id = body.user_id;
  store
    .get_user_public(user_id)
    .await
    .map_err(ApiError::store)?
    .ok_or_else(|| ApiError::NotFound(format!("user {user_id} not found")))?;

  store
    .append_conversation(
      user_id,
      vec![
        NewChatMessage::user(body.user_input),
        NewChatMessage::assistant(body.ai_response),
      ],
    )
    .await
    .map_err(ApiError::store)?;

  let status = store
    .upsert_status(user_id, StatusUpdate {
      sentiment_label:  body.sentiment_label,
      sentiment_score:  body.sentiment_score,
      depression_score: body.depression_score,
      disease:          body.disease,
    })
    .await
    .map_err(ApiError::store)?;

  tracing::info!(%user_id, tier = %status.severity_tier, "chat turn recorded");
  Ok(Json(status))
}

// ─── History ──────────────────────────────────────────────────────────────────

/// `GET /chat/:user_id/history`
pub async fn history<S>(
  State(store): State<Arc<S>>,
  ApiPath(user_id): ApiPath<Uuid>,
) -> Result<Json<Vec<ChatMessage>>, ApiError>
where
  S: MonitorStore,
{
  let messages = store.conversation(user_id).await.map_err(ApiError::store)?;
  Ok(Json(messages))
}
