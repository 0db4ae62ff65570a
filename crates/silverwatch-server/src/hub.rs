//! The broadcast hub: the registry of live observer sessions.
//!
//! Each registered session is represented by the sending half of its
//! bounded outbound queue. The registry lock is held only while the map is
//! read or mutated, never while a frame is being delivered.

use std::{collections::HashMap, sync::Arc};

use silverwatch_core::alert::{AlertEvent, encode_frame};
use tokio::sync::{RwLock, mpsc};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::error::Result;

/// Identity of one connection session.
pub type SessionId = Uuid;

/// A pre-encoded JSON text frame, shared between every recipient.
pub type Frame = Arc<str>;

pub struct BroadcastHub {
  sessions:   RwLock<HashMap<SessionId, mpsc::Sender<Frame>>>,
  queue_size: usize,
}

impl BroadcastHub {
  /// `queue_size` bounds how many frames may wait for a slow session before
  /// it is treated as failed.
  pub fn new(queue_size: usize) -> Self {
    Self { sessions: RwLock::new(HashMap::new()), queue_size: queue_size.max(1) }
  }

  /// Create an outbound queue sized for this hub.
  pub fn channel(&self) -> (mpsc::Sender<Frame>, mpsc::Receiver<Frame>) {
    mpsc::channel(self.queue_size)
  }

  // ── Registry ──────────────────────────────────────────────────────────────

  /// Add a session to the live set. Returns `false`, leaving the existing
  /// entry untouched, if `id` is already registered.
  pub async fn register(&self, id: SessionId, tx: mpsc::Sender<Frame>) -> bool {
    let mut sessions = self.sessions.write().await;
    if sessions.contains_key(&id) {
      debug!(session_id = %id, "duplicate registration ignored");
      return false;
    }
    sessions.insert(id, tx);
    let live = sessions.len();
    drop(sessions);

    info!(session_id = %id, live, "session registered");
    true
  }

  /// Remove a session. Returns whether it was present.
  pub async fn deregister(&self, id: SessionId) -> bool {
    let removed = self.sessions.write().await.remove(&id).is_some();
    if removed {
      info!(session_id = %id, "session deregistered");
    }
    removed
  }

  pub async fn is_registered(&self, id: SessionId) -> bool {
    self.sessions.read().await.contains_key(&id)
  }

  pub async fn live_sessions(&self) -> usize { self.sessions.read().await.len() }

  /// Drop every session. Their queues close, which ends each session task.
  pub async fn close_all(&self) {
    let mut sessions = self.sessions.write().await;
    let closed = sessions.len();
    sessions.clear();
    drop(sessions);

    info!(closed, "closed all sessions");
  }

  // ── Delivery ──────────────────────────────────────────────────────────────

  /// Encode `alert` once and push it to every live session. Returns the
  /// number of sessions that accepted it.
  pub async fn broadcast(&self, alert: &AlertEvent) -> Result<usize> {
    let frame: Frame = encode_frame(alert)?.into();
    Ok(self.broadcast_frame(frame).await)
  }

  /// Push a frame to every live session without waiting on any of them. A
  /// session whose queue is full or closed is removed.
  pub async fn broadcast_frame(&self, frame: Frame) -> usize {
    let targets: Vec<(SessionId, mpsc::Sender<Frame>)> = self
      .sessions
      .read()
      .await
      .iter()
      .map(|(id, tx)| (*id, tx.clone()))
      .collect();

    let mut failed = Vec::new();
    for (id, tx) in &targets {
      if let Err(e) = tx.try_send(frame.clone()) {
        warn!(session_id = %id, reason = %e, "dropping session after failed send");
        failed.push(*id);
      }
    }

    if !failed.is_empty() {
      let mut sessions = self.sessions.write().await;
      for id in &failed {
        sessions.remove(id);
      }
    }

    targets.len() - failed.len()
  }
}
