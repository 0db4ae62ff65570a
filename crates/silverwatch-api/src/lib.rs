//! JSON REST API for silverwatch.
//!
//! Exposes an axum [`Router`] backed by any
//! [`silverwatch_core::store::MonitorStore`]. Auth, TLS, and transport
//! concerns are the caller's responsibility.
//!
//! # Mounting
//!
//! ```rust,ignore
//! .nest("/api", silverwatch_api::api_router(store.clone()))
//! ```

pub mod alerts;
pub mod chat;
pub mod error;
pub mod extract;
pub mod statuses;
pub mod users;

use std::sync::Arc;

use axum::{
  Router,
  routing::{get, post},
};
use silverwatch_core::store::MonitorStore;

pub use error::ApiError;

/// Build a fully-materialised API router for `store`.
///
/// The returned `Router<()>` can be nested into any parent router regardless
/// of its own state type.
pub fn api_router<S>(store: Arc<S>) -> Router<()>
where
  S: MonitorStore + 'static,
{
  Router::new()
    // Users
    .route("/users", post(users::create::<S>))
    .route("/users/{id}", get(users::get_one::<S>))
    // Chat
    .route("/chat/turns", post(chat::record_turn::<S>))
    .route("/chat/{user_id}/history", get(chat::history::<S>))
    // Status store
    .route("/statuses", get(statuses::list::<S>))
    .route("/statuses/{user_id}", get(statuses::get_one::<S>))
    // Alert log
    .route("/alerts/unread", get(alerts::unread::<S>))
    .route("/alerts/{id}/read", post(alerts::mark_read::<S>))
    .with_state(store)
}
