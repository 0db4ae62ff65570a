//! The change feed over the status store.
//!
//! Every insert and update of a status record is journalled in order. A
//! [`ChangeFeed`] is a cursor over that journal, narrowed by a
//! [`ChangeFilter`] to the mutations a consumer cares about.

use std::future::Future;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Column name of the severity tier as reported in `changed_fields`.
pub const SEVERITY_FIELD: &str = "severity_tier";

/// The kind of mutation that produced a change.
#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize,
  strum::Display, strum::EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum OperationType {
  Insert,
  Update,
}

/// One journalled mutation of the status store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusChange {
  /// Position in the journal; strictly increasing.
  pub seq:            u64,
  pub operation:      OperationType,
  pub user_id:        Uuid,
  /// Columns whose value differed between the old and new row. `None` for
  /// inserts.
  pub changed_fields: Option<Vec<String>>,
  pub observed_at:    DateTime<Utc>,
}

impl StatusChange {
  pub fn touches(&self, field: &str) -> bool {
    self
      .changed_fields
      .as_ref()
      .is_some_and(|fields| fields.iter().any(|f| f == field))
  }
}

/// Which changes a feed yields, and under which name it checkpoints.
///
/// A feed yields every insert, and every update whose changed-field set
/// contains `field`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeFilter {
  /// Checkpoint key; one consumer name per observer.
  pub consumer: String,
  pub field:    String,
}

impl ChangeFilter {
  /// Inserts plus updates that touch the severity tier.
  pub fn severity(consumer: impl Into<String>) -> Self {
    Self { consumer: consumer.into(), field: SEVERITY_FIELD.to_owned() }
  }

  pub fn accepts(&self, change: &StatusChange) -> bool {
    match change.operation {
      OperationType::Insert => true,
      OperationType::Update => change.touches(&self.field),
    }
  }
}

/// Outcome of a single non-blocking [`ChangeFeed::poll`].
#[derive(Debug, Clone, PartialEq)]
pub enum FeedPoll {
  Change(StatusChange),
  /// Nothing new past the cursor right now.
  Empty,
  /// The journal no longer holds the entries following the cursor. The
  /// consumer must [`reset_to_now`](ChangeFeed::reset_to_now) to continue.
  Invalidated,
}

/// An open cursor over the change journal.
///
/// `close` persists the consumer's checkpoint so a later `open_feed` with
/// the same consumer name resumes after the last change handed out.
pub trait ChangeFeed: Send {
  type Error: std::error::Error + Send + Sync + 'static;

  /// Return the next qualifying change after the cursor without waiting.
  fn poll(
    &mut self,
  ) -> impl Future<Output = Result<FeedPoll, Self::Error>> + Send + '_;

  /// Move the cursor to the current end of the journal.
  fn reset_to_now(
    &mut self,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  /// The sequence number of the last change handed out (or skipped to).
  fn position(&self) -> u64;

  /// Persist the checkpoint and release the handle.
  fn close(self) -> impl Future<Output = Result<(), Self::Error>> + Send;
}

#[cfg(test)]
mod tests {
  use super::*;

  fn change(operation: OperationType, fields: Option<&[&str]>) -> StatusChange {
    StatusChange {
      seq: 1,
      operation,
      user_id: Uuid::new_v4(),
      changed_fields: fields.map(|f| f.iter().map(|s| s.to_string()).collect()),
      observed_at: Utc::now(),
    }
  }

  #[test]
  fn severity_filter_accepts_inserts() {
    let filter = ChangeFilter::severity("observer");
    assert!(filter.accepts(&change(OperationType::Insert, None)));
  }

  #[test]
  fn severity_filter_accepts_tier_updates_only() {
    let filter = ChangeFilter::severity("observer");
    assert!(filter.accepts(&change(
      OperationType::Update,
      Some(&["sentiment_score", "severity_tier", "last_updated"]),
    )));
    assert!(!filter.accepts(&change(
      OperationType::Update,
      Some(&["sentiment_score", "last_updated"]),
    )));
    assert!(!filter.accepts(&change(OperationType::Update, None)));
  }
}
