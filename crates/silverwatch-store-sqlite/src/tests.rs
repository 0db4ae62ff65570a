//! Integration tests for `SqliteStore` against an in-memory database.

use chrono::Utc;
use silverwatch_core::{
  alert::{AlertSnapshot, NewAlert},
  change::{ChangeFeed, ChangeFilter, FeedPoll, OperationType, StatusChange},
  conversation::{ChatRole, NewChatMessage},
  status::{SeverityTier, StatusUpdate},
  store::MonitorStore,
  user::{NewUser, UserProfile},
};
use uuid::Uuid;

use crate::{Error, SqliteStore};

async fn store() -> SqliteStore {
  SqliteStore::open_in_memory()
    .await
    .expect("in-memory store")
}

async fn user(s: &SqliteStore, name: &str) -> UserProfile {
  s.create_user(NewUser::named(name)).await.unwrap()
}

fn update(depression: Option<i32>, sentiment: Option<f64>) -> StatusUpdate {
  StatusUpdate {
    sentiment_label:  Some("neutral".into()),
    sentiment_score:  sentiment,
    depression_score: depression,
    disease:          None,
  }
}

async fn next_change(feed: &mut crate::SqliteFeed) -> StatusChange {
  match feed.poll().await.unwrap() {
    FeedPoll::Change(c) => c,
    other => panic!("expected a change, got {other:?}"),
  }
}

// ─── Users ───────────────────────────────────────────────────────────────────

#[tokio::test]
async fn create_and_get_user() {
  let s = store().await;
  let created = s
    .create_user(NewUser {
      name: "Oh Junsik".into(),
      address: Some("Busan".into()),
      password_hash: Some("$argon2id$secret".into()),
      refresh_token: Some("refresh-secret".into()),
      ..NewUser::default()
    })
    .await
    .unwrap();

  let fetched = s.get_user_public(created.user_id).await.unwrap().unwrap();
  assert_eq!(fetched, created);

  let json = serde_json::to_string(&fetched).unwrap();
  assert!(!json.contains("secret"), "secrets leaked: {json}");
}

#[tokio::test]
async fn get_missing_user_returns_none() {
  let s = store().await;
  assert!(s.get_user_public(Uuid::new_v4()).await.unwrap().is_none());
}

// ─── Status store ────────────────────────────────────────────────────────────

#[tokio::test]
async fn upsert_classifies_and_overwrites() {
  let s = store().await;
  let u = user(&s, "Lee Sunja").await;

  let first = s.upsert_status(u.user_id, update(Some(9), Some(0.5))).await.unwrap();
  assert_eq!(first.severity_tier, SeverityTier::High);

  let second = s.upsert_status(u.user_id, update(Some(3), Some(0.2))).await.unwrap();
  assert_eq!(second.severity_tier, SeverityTier::None);

  let stored = s.get_status(u.user_id).await.unwrap().unwrap();
  assert_eq!(stored.severity_tier, SeverityTier::None);
  assert_eq!(stored.depression_score, Some(3));
  assert_eq!(s.list_statuses().await.unwrap().len(), 1);
}

#[tokio::test]
async fn upsert_for_unknown_user_fails() {
  let s = store().await;
  let id = Uuid::new_v4();
  let err = s.upsert_status(id, update(Some(1), None)).await.unwrap_err();
  assert!(matches!(err, Error::UserNotFound(missing) if missing == id));
}

#[tokio::test]
async fn missing_scores_round_trip_as_none() {
  let s = store().await;
  let u = user(&s, "Jung Mansu").await;
  s.upsert_status(u.user_id, StatusUpdate::default()).await.unwrap();

  let stored = s.get_status(u.user_id).await.unwrap().unwrap();
  assert_eq!(stored.depression_score, None);
  assert_eq!(stored.sentiment_score, None);
  assert_eq!(stored.severity_tier, SeverityTier::None);
}

// ─── Change feed ─────────────────────────────────────────────────────────────

#[tokio::test]
async fn feed_starts_at_now() {
  let s = store().await;
  let u = user(&s, "Before").await;
  s.upsert_status(u.user_id, update(Some(9), None)).await.unwrap();

  let mut feed = s.open_feed(ChangeFilter::severity("test")).await.unwrap();
  assert_eq!(feed.poll().await.unwrap(), FeedPoll::Empty);
}

#[tokio::test]
async fn feed_yields_inserts_and_tier_updates_only() {
  let s = store().await;
  let u = user(&s, "Kim").await;
  let mut feed = s.open_feed(ChangeFilter::severity("test")).await.unwrap();

  s.upsert_status(u.user_id, update(Some(2), Some(0.1))).await.unwrap();
  // Same tier: the update is journalled but filtered out.
  s.upsert_status(u.user_id, update(Some(3), Some(0.2))).await.unwrap();
  s.upsert_status(u.user_id, update(Some(9), Some(0.2))).await.unwrap();

  let insert = next_change(&mut feed).await;
  assert_eq!(insert.operation, OperationType::Insert);
  assert_eq!(insert.user_id, u.user_id);
  assert!(insert.changed_fields.is_none());

  let tier_change = next_change(&mut feed).await;
  assert_eq!(tier_change.operation, OperationType::Update);
  let fields = tier_change.changed_fields.unwrap();
  assert!(fields.contains(&"severity_tier".to_string()), "{fields:?}");
  assert!(fields.contains(&"depression_score".to_string()), "{fields:?}");
  assert!(!fields.contains(&"sentiment_score".to_string()), "{fields:?}");

  assert_eq!(feed.poll().await.unwrap(), FeedPoll::Empty);
}

#[tokio::test]
async fn feed_preserves_order_across_users() {
  let s = store().await;
  let a = user(&s, "A").await;
  let b = user(&s, "B").await;
  let mut feed = s.open_feed(ChangeFilter::severity("test")).await.unwrap();

  s.upsert_status(a.user_id, update(Some(9), None)).await.unwrap();
  s.upsert_status(b.user_id, update(Some(1), None)).await.unwrap();

  let first = next_change(&mut feed).await;
  let second = next_change(&mut feed).await;
  assert_eq!(first.user_id, a.user_id);
  assert_eq!(second.user_id, b.user_id);
  assert!(first.seq < second.seq);
}

#[tokio::test]
async fn closed_feed_resumes_from_checkpoint() {
  let s = store().await;
  let u = user(&s, "Resume").await;

  let mut feed = s.open_feed(ChangeFilter::severity("observer")).await.unwrap();
  s.upsert_status(u.user_id, update(Some(1), None)).await.unwrap();
  let seen = next_change(&mut feed).await;
  feed.close().await.unwrap();

  // Written while no feed was open.
  s.upsert_status(u.user_id, update(Some(9), None)).await.unwrap();

  let mut reopened = s.open_feed(ChangeFilter::severity("observer")).await.unwrap();
  assert_eq!(reopened.position(), seen.seq);
  let missed = next_change(&mut reopened).await;
  assert_eq!(missed.operation, OperationType::Update);
}

#[tokio::test]
async fn pruned_history_invalidates_lagging_feed() {
  let s = store().await;
  let u = user(&s, "Lagging").await;
  let mut feed = s.open_feed(ChangeFilter::severity("test")).await.unwrap();

  for score in [1, 9, 1, 9] {
    s.upsert_status(u.user_id, update(Some(score), None)).await.unwrap();
  }
  assert_eq!(s.prune_changes(1).await.unwrap(), 3);

  assert_eq!(feed.poll().await.unwrap(), FeedPoll::Invalidated);
  feed.reset_to_now().await.unwrap();
  assert_eq!(feed.poll().await.unwrap(), FeedPoll::Empty);

  s.upsert_status(u.user_id, update(Some(1), None)).await.unwrap();
  assert_eq!(next_change(&mut feed).await.operation, OperationType::Update);
}

#[tokio::test]
async fn prune_on_empty_journal_is_noop() {
  let s = store().await;
  assert_eq!(s.prune_changes(0).await.unwrap(), 0);
}

// ─── Alert log ───────────────────────────────────────────────────────────────

async fn new_alert(s: &SqliteStore, change_seq: u64) -> NewAlert {
  let u = user(s, "Alerted").await;
  let status = s.upsert_status(u.user_id, update(Some(9), None)).await.unwrap();
  NewAlert {
    change_seq,
    operation_type: OperationType::Insert,
    observed_at: Utc::now(),
    changed_fields: None,
    snapshot: AlertSnapshot { status, user: u },
  }
}

#[tokio::test]
async fn append_and_read_back_alert() {
  let s = store().await;
  let input = new_alert(&s, 1).await;
  let alert = s.append_alert(input.clone()).await.unwrap().unwrap();
  assert!(!alert.is_read);

  let fetched = s.get_alert(alert.id).await.unwrap().unwrap();
  assert_eq!(fetched, alert);
  assert_eq!(fetched.snapshot.status.severity_tier, SeverityTier::High);
}

#[tokio::test]
async fn appending_same_change_twice_is_ignored() {
  let s = store().await;
  let input = new_alert(&s, 42).await;
  assert!(s.append_alert(input.clone()).await.unwrap().is_some());
  assert!(s.append_alert(input).await.unwrap().is_none());
  assert_eq!(s.unread().await.unwrap().len(), 1);
}

#[tokio::test]
async fn unread_is_in_insertion_order_and_excludes_read() {
  let s = store().await;
  let mut ids = Vec::new();
  for seq in 1..=3 {
    let alert = s.append_alert(new_alert(&s, seq).await).await.unwrap().unwrap();
    ids.push(alert.id);
  }

  s.mark_read(ids[1]).await.unwrap();

  let unread: Vec<Uuid> = s.unread().await.unwrap().into_iter().map(|a| a.id).collect();
  assert_eq!(unread, vec![ids[0], ids[2]]);
}

#[tokio::test]
async fn mark_read_is_idempotent() {
  let s = store().await;
  let a = s.append_alert(new_alert(&s, 1).await).await.unwrap().unwrap();
  let b = s.append_alert(new_alert(&s, 2).await).await.unwrap().unwrap();

  s.mark_read(a.id).await.unwrap();
  s.mark_read(a.id).await.unwrap();
  s.mark_read(Uuid::new_v4()).await.unwrap();

  assert!(s.get_alert(a.id).await.unwrap().unwrap().is_read);
  assert!(!s.get_alert(b.id).await.unwrap().unwrap().is_read);
}

// ─── Conversations ───────────────────────────────────────────────────────────

#[tokio::test]
async fn conversation_keeps_order() {
  let s = store().await;
  let u = user(&s, "Talker").await;

  s.append_conversation(
    u.user_id,
    vec![NewChatMessage::user("hello"), NewChatMessage::assistant("hi there")],
  )
  .await
  .unwrap();
  s.append_conversation(u.user_id, vec![NewChatMessage::user("my head hurts")])
    .await
    .unwrap();

  let history = s.conversation(u.user_id).await.unwrap();
  let turns: Vec<(ChatRole, &str)> =
    history.iter().map(|m| (m.role, m.content.as_str())).collect();
  assert_eq!(
    turns,
    vec![
      (ChatRole::User, "hello"),
      (ChatRole::Assistant, "hi there"),
      (ChatRole::User, "my head hurts"),
    ]
  );
}

#[tokio::test]
async fn empty_conversation_for_unknown_user() {
  let s = store().await;
  assert!(s.conversation(Uuid::new_v4()).await.unwrap().is_empty());
}
