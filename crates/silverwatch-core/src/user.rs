//! User profiles as seen by the monitoring pipeline.
//!
//! Credentials are owned by the external auth collaborator. They can be
//! written alongside a profile but there is no type that reads them back.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// The public half of a user record: everything except password hash and
/// refresh token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
  pub user_id:     Uuid,
  pub name:        String,
  pub gender:      Option<String>,
  /// Free-text birth date as entered at signup (e.g. `1948-03-02`).
  pub birth:       Option<String>,
  pub address:     Option<String>,
  pub phonenumber: Option<String>,
  pub created_at:  DateTime<Utc>,
}

/// Input to [`crate::store::MonitorStore::create_user`].
#[derive(Debug, Clone, Default)]
pub struct NewUser {
  pub name:          String,
  pub gender:        Option<String>,
  pub birth:         Option<String>,
  pub address:       Option<String>,
  pub phonenumber:   Option<String>,
  /// Opaque hash produced by the auth collaborator; stored, never returned.
  pub password_hash: Option<String>,
  /// Opaque refresh token issued by the auth collaborator; stored, never
  /// returned.
  pub refresh_token: Option<String>,
}

impl NewUser {
  pub fn named(name: impl Into<String>) -> Self {
    Self { name: name.into(), ..Self::default() }
  }
}
