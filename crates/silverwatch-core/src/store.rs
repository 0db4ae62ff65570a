//! The `MonitorStore` trait.
//!
//! The trait is implemented by storage backends (e.g.
//! `silverwatch-store-sqlite`). The API router and the notification server
//! depend on this abstraction, not on any concrete backend.

use std::future::Future;

use uuid::Uuid;

use crate::{
  alert::{AlertEvent, NewAlert},
  change::{ChangeFeed, ChangeFilter},
  conversation::{ChatMessage, NewChatMessage},
  status::{StatusRecord, StatusUpdate},
  user::{NewUser, UserProfile},
};

/// Abstraction over the persistence layer.
///
/// The store owns four tables: users, the status store (one row per user),
/// the change journal that feeds observers, and the append-only alert log.
/// Single-row writes are atomic; nothing spans rows transactionally.
///
/// All methods return `Send` futures so the trait can be used in
/// multi-threaded async runtimes (e.g. tokio with `axum`).
pub trait MonitorStore: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;
  type Feed: ChangeFeed<Error = Self::Error> + 'static;

  // ── Users ─────────────────────────────────────────────────────────────

  /// Persist a new user and return its public profile.
  fn create_user(
    &self,
    input: NewUser,
  ) -> impl Future<Output = Result<UserProfile, Self::Error>> + Send + '_;

  /// Look up a user's profile. Secret columns are never read.
  fn get_user_public(
    &self,
    user_id: Uuid,
  ) -> impl Future<Output = Result<Option<UserProfile>, Self::Error>> + Send + '_;

  // ── Status store ──────────────────────────────────────────────────────

  /// Insert or overwrite the status record for `user_id`. The severity tier
  /// is computed from `update`; `last_updated` is set by the store.
  fn upsert_status(
    &self,
    user_id: Uuid,
    update: StatusUpdate,
  ) -> impl Future<Output = Result<StatusRecord, Self::Error>> + Send + '_;

  fn get_status(
    &self,
    user_id: Uuid,
  ) -> impl Future<Output = Result<Option<StatusRecord>, Self::Error>> + Send + '_;

  fn list_statuses(
    &self,
  ) -> impl Future<Output = Result<Vec<StatusRecord>, Self::Error>> + Send + '_;

  // ── Change feed ───────────────────────────────────────────────────────

  /// Open a cursor over the change journal, resuming from the consumer's
  /// checkpoint if one exists and from the journal tail otherwise.
  fn open_feed(
    &self,
    filter: ChangeFilter,
  ) -> impl Future<Output = Result<Self::Feed, Self::Error>> + Send + '_;

  /// Drop all but the newest `keep_latest` journal entries. Returns the
  /// number removed.
  fn prune_changes(
    &self,
    keep_latest: u64,
  ) -> impl Future<Output = Result<u64, Self::Error>> + Send + '_;

  // ── Alert log ─────────────────────────────────────────────────────────

  /// Append an alert. Returns `None` when an alert for the same change was
  /// already logged.
  fn append_alert(
    &self,
    input: NewAlert,
  ) -> impl Future<Output = Result<Option<AlertEvent>, Self::Error>> + Send + '_;

  fn get_alert(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Option<AlertEvent>, Self::Error>> + Send + '_;

  /// Mark an alert read. Unknown or already-read ids are a no-op.
  fn mark_read(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  /// Every unread alert, in insertion order, as of the call.
  fn unread(
    &self,
  ) -> impl Future<Output = Result<Vec<AlertEvent>, Self::Error>> + Send + '_;

  // ── Conversations ─────────────────────────────────────────────────────

  fn append_conversation(
    &self,
    user_id: Uuid,
    messages: Vec<NewChatMessage>,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  /// The user's conversation in recording order; empty if none.
  fn conversation(
    &self,
    user_id: Uuid,
  ) -> impl Future<Output = Result<Vec<ChatMessage>, Self::Error>> + Send + '_;
}
