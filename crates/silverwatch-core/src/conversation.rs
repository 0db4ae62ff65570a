//! Per-user conversation history.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Who produced a chat message.
#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize,
  strum::Display, strum::EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum ChatRole {
  System,
  User,
  Assistant,
}

/// One stored message. Messages are append-only and returned in the order
/// they were recorded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
  pub role:        ChatRole,
  pub content:     String,
  pub recorded_at: DateTime<Utc>,
}

/// Input to [`crate::store::MonitorStore::append_conversation`].
#[derive(Debug, Clone)]
pub struct NewChatMessage {
  pub role:    ChatRole,
  pub content: String,
}

impl NewChatMessage {
  pub fn user(content: impl Into<String>) -> Self {
    Self { role: ChatRole::User, content: content.into() }
  }

  pub fn assistant(content: impl Into<String>) -> Self {
    Self { role: ChatRole::Assistant, content: content.into() }
  }
}
