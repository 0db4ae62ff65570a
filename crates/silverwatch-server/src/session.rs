//! Connection sessions: one per live WebSocket observer.
//!
//! A session moves `Connecting → Open → Closing → Closed`. It is in the
//! hub's live set exactly while `Open`. Frames pushed by the hub arrive on
//! the session's queue and are written to the socket in order; text sent by
//! the client is parsed as a [`ClientRequest`].

use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket};
use serde::Deserialize;
use silverwatch_core::{alert::encode_batch, store::MonitorStore};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::{
  error::{Error, Result},
  hub::{BroadcastHub, Frame, SessionId},
};

// ─── Client requests ─────────────────────────────────────────────────────────

/// What a client can ask of its session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClientRequest {
  /// Send every unread alert as one batch.
  CatchUp,
  /// Keepalive; no reply.
  Ping,
  /// Anything unrecognised. Answered with an empty batch.
  Malformed,
}

#[derive(Deserialize)]
struct Envelope {
  kind: String,
}

impl ClientRequest {
  /// Accepts `{"kind":"catch_up"}`, `{"kind":"ping"}`, or the bare tokens
  /// `catch-up` / `ping`.
  pub fn parse(text: &str) -> Self {
    let text = text.trim();
    let kind = match serde_json::from_str::<Envelope>(text) {
      Ok(envelope) => envelope.kind,
      Err(_) => text.to_owned(),
    };
    match kind.as_str() {
      "catch_up" | "catch-up" | "catchup" => Self::CatchUp,
      "ping" => Self::Ping,
      _ => Self::Malformed,
    }
  }
}

// ─── Session ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
  Connecting,
  Open,
  Closing,
  Closed,
}

/// Bookkeeping for one connection.
#[derive(Debug)]
pub struct Session {
  id:    SessionId,
  state: SessionState,
}

impl Session {
  pub fn new() -> Self { Self { id: Uuid::new_v4(), state: SessionState::Connecting } }

  pub fn id(&self) -> SessionId { self.id }

  pub fn state(&self) -> SessionState { self.state }

  /// Register with the hub. On success the session is `Open`; a rejected
  /// registration closes it straight away.
  pub async fn open(&mut self, hub: &BroadcastHub, tx: tokio::sync::mpsc::Sender<Frame>) -> bool {
    if hub.register(self.id, tx).await {
      self.transition(SessionState::Open);
      true
    } else {
      self.transition(SessionState::Closed);
      false
    }
  }

  /// Leave the hub's live set. Idempotent.
  pub async fn close(&mut self, hub: &BroadcastHub) {
    if self.state == SessionState::Closed {
      return;
    }
    self.transition(SessionState::Closing);
    hub.deregister(self.id).await;
    self.transition(SessionState::Closed);
  }

  fn transition(&mut self, next: SessionState) {
    debug!(session_id = %self.id, from = ?self.state, to = ?next, "session state");
    self.state = next;
  }
}

impl Default for Session {
  fn default() -> Self { Self::new() }
}

/// Encode every unread alert as one array frame. Nothing is marked read.
pub async fn catch_up_batch<S>(store: &S) -> Result<Frame>
where
  S: MonitorStore,
{
  let unread = store.unread().await.map_err(|e| Error::Store(Box::new(e)))?;
  Ok(encode_batch(&unread)?.into())
}

/// Act on one text message from the client. Returns the reply to write
/// back to this session only, if any.
///
/// Replies bypass the session's outbound queue: the session task is that
/// queue's only reader, so it must never wait on it.
pub async fn handle_client_text<S>(store: &S, id: SessionId, text: &str) -> Option<Frame>
where
  S: MonitorStore,
{
  match ClientRequest::parse(text) {
    ClientRequest::CatchUp => match catch_up_batch(store).await {
      Ok(frame) => {
        debug!(session_id = %id, "catch-up batch ready");
        Some(frame)
      }
      Err(e) => {
        warn!(session_id = %id, error = %e, "catch-up failed");
        None
      }
    },
    ClientRequest::Ping => None,
    ClientRequest::Malformed => {
      debug!(session_id = %id, "malformed client message; replying with empty batch");
      Some(Arc::from("[]"))
    }
  }
}

/// Drive one WebSocket until either side goes away.
pub async fn run<S>(mut socket: WebSocket, hub: Arc<BroadcastHub>, store: Arc<S>)
where
  S: MonitorStore,
{
  let mut session = Session::new();
  let (tx, mut rx) = hub.channel();
  if !session.open(&hub, tx).await {
    return;
  }
  let id = session.id();

  loop {
    tokio::select! {
      frame = rx.recv() => match frame {
        Some(frame) => {
          if let Err(e) = socket.send(Message::Text(frame.to_string().into())).await {
            debug!(session_id = %id, error = %e, "socket send failed");
            break;
          }
        }
        // Removed by the hub, or the hub is shutting down.
        None => break,
      },
      incoming = socket.recv() => match incoming {
        Some(Ok(Message::Text(text))) => {
          let reply = handle_client_text(store.as_ref(), id, text.as_str()).await;
          if let Some(reply) = reply
            && let Err(e) = socket.send(Message::Text(reply.to_string().into())).await
          {
            debug!(session_id = %id, error = %e, "socket send failed");
            break;
          }
        }
        Some(Ok(Message::Close(_))) | None => break,
        Some(Ok(_)) => {}
        Some(Err(e)) => {
          debug!(session_id = %id, error = %e, "socket receive failed");
          break;
        }
      },
    }
  }

  session.close(&hub).await;
  let _ = socket.send(Message::Close(None)).await;
}
