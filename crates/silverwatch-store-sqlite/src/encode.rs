//! Encoding and decoding helpers between domain types and the plain-text
//! representations stored in SQLite columns.
//!
//! Timestamps are stored as RFC 3339 strings, UUIDs as hyphenated lowercase
//! strings, enums as their lowercase names, and structured values (changed
//! field lists, alert snapshots) as compact JSON.

use std::str::FromStr;

use chrono::{DateTime, Utc};
use silverwatch_core::{
  alert::{AlertEvent, AlertSnapshot},
  change::{OperationType, StatusChange},
  conversation::{ChatMessage, ChatRole},
  status::{SeverityTier, StatusRecord},
  user::UserProfile,
};
use uuid::Uuid;

use crate::{Error, Result};

// ─── Scalars ─────────────────────────────────────────────────────────────────

pub fn encode_uuid(id: Uuid) -> String { id.hyphenated().to_string() }

pub fn decode_uuid(s: &str) -> Result<Uuid> { Ok(Uuid::parse_str(s)?) }

pub fn encode_dt(dt: DateTime<Utc>) -> String { dt.to_rfc3339() }

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::DateParse(e.to_string()))
}

/// Journal and alert sequence numbers are `INTEGER` columns; they are never
/// negative.
pub fn decode_seq(n: i64) -> u64 { n.max(0) as u64 }

pub fn encode_seq(n: u64) -> i64 { i64::try_from(n).unwrap_or(i64::MAX) }

// ─── Enums ───────────────────────────────────────────────────────────────────

fn decode_enum<T: FromStr>(
  s: &str,
  unknown: impl FnOnce(String) -> silverwatch_core::Error,
) -> Result<T> {
  s.parse().map_err(|_| Error::Core(unknown(s.to_owned())))
}

pub fn decode_tier(s: &str) -> Result<SeverityTier> {
  decode_enum(s, silverwatch_core::Error::UnknownTier)
}

pub fn decode_operation(s: &str) -> Result<OperationType> {
  decode_enum(s, silverwatch_core::Error::UnknownOperation)
}

pub fn decode_role(s: &str) -> Result<ChatRole> {
  decode_enum(s, silverwatch_core::Error::UnknownRole)
}

// ─── Field lists ─────────────────────────────────────────────────────────────

pub fn encode_fields(fields: Option<&[String]>) -> Result<Option<String>> {
  fields.map(serde_json::to_string).transpose().map_err(Error::Json)
}

pub fn decode_fields(s: Option<&str>) -> Result<Option<Vec<String>>> {
  s.map(serde_json::from_str).transpose().map_err(Error::Json)
}

// ─── Row types ───────────────────────────────────────────────────────────────

/// Public columns of a `users` row.
pub struct RawUser {
  pub user_id:     String,
  pub name:        String,
  pub gender:      Option<String>,
  pub birth:       Option<String>,
  pub address:     Option<String>,
  pub phonenumber: Option<String>,
  pub created_at:  String,
}

impl RawUser {
  pub const COLUMNS: &'static str =
    "user_id, name, gender, birth, address, phonenumber, created_at";

  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      user_id:     row.get(0)?,
      name:        row.get(1)?,
      gender:      row.get(2)?,
      birth:       row.get(3)?,
      address:     row.get(4)?,
      phonenumber: row.get(5)?,
      created_at:  row.get(6)?,
    })
  }

  pub fn into_profile(self) -> Result<UserProfile> {
    Ok(UserProfile {
      user_id:     decode_uuid(&self.user_id)?,
      name:        self.name,
      gender:      self.gender,
      birth:       self.birth,
      address:     self.address,
      phonenumber: self.phonenumber,
      created_at:  decode_dt(&self.created_at)?,
    })
  }
}

/// A `statuses` row.
pub struct RawStatus {
  pub user_id:          String,
  pub sentiment_label:  Option<String>,
  pub sentiment_score:  Option<f64>,
  pub depression_score: Option<i32>,
  pub disease:          Option<String>,
  pub severity_tier:    String,
  pub last_updated:     String,
}

impl RawStatus {
  pub const COLUMNS: &'static str = "user_id, sentiment_label, sentiment_score, \
     depression_score, disease, severity_tier, last_updated";

  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      user_id:          row.get(0)?,
      sentiment_label:  row.get(1)?,
      sentiment_score:  row.get(2)?,
      depression_score: row.get(3)?,
      disease:          row.get(4)?,
      severity_tier:    row.get(5)?,
      last_updated:     row.get(6)?,
    })
  }

  pub fn into_record(self) -> Result<StatusRecord> {
    Ok(StatusRecord {
      user_id:          decode_uuid(&self.user_id)?,
      sentiment_label:  self.sentiment_label,
      sentiment_score:  self.sentiment_score,
      depression_score: self.depression_score,
      disease:          self.disease,
      severity_tier:    decode_tier(&self.severity_tier)?,
      last_updated:     decode_dt(&self.last_updated)?,
    })
  }
}

/// A `status_changes` row.
pub struct RawChange {
  pub seq:            i64,
  pub operation:      String,
  pub user_id:        String,
  pub changed_fields: Option<String>,
  pub observed_at:    String,
}

impl RawChange {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      seq:            row.get(0)?,
      operation:      row.get(1)?,
      user_id:        row.get(2)?,
      changed_fields: row.get(3)?,
      observed_at:    row.get(4)?,
    })
  }

  pub fn into_change(self) -> Result<StatusChange> {
    Ok(StatusChange {
      seq:            decode_seq(self.seq),
      operation:      decode_operation(&self.operation)?,
      user_id:        decode_uuid(&self.user_id)?,
      changed_fields: decode_fields(self.changed_fields.as_deref())?,
      observed_at:    decode_dt(&self.observed_at)?,
    })
  }
}

/// An `alerts` row.
pub struct RawAlert {
  pub alert_id:       String,
  pub change_seq:     i64,
  pub operation:      String,
  pub observed_at:    String,
  pub changed_fields: Option<String>,
  pub snapshot_json:  String,
  pub is_read:        bool,
}

impl RawAlert {
  pub const COLUMNS: &'static str = "alert_id, change_seq, operation, observed_at, \
     changed_fields, snapshot_json, is_read";

  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      alert_id:       row.get(0)?,
      change_seq:     row.get(1)?,
      operation:      row.get(2)?,
      observed_at:    row.get(3)?,
      changed_fields: row.get(4)?,
      snapshot_json:  row.get(5)?,
      is_read:        row.get(6)?,
    })
  }

  pub fn into_alert(self) -> Result<AlertEvent> {
    let snapshot: AlertSnapshot = serde_json::from_str(&self.snapshot_json)?;
    Ok(AlertEvent {
      id:             decode_uuid(&self.alert_id)?,
      change_seq:     decode_seq(self.change_seq),
      operation_type: decode_operation(&self.operation)?,
      observed_at:    decode_dt(&self.observed_at)?,
      changed_fields: decode_fields(self.changed_fields.as_deref())?,
      snapshot,
      is_read:        self.is_read,
    })
  }
}

/// A `conversations` row.
pub struct RawMessage {
  pub role:        String,
  pub content:     String,
  pub recorded_at: String,
}

impl RawMessage {
  pub fn into_message(self) -> Result<ChatMessage> {
    Ok(ChatMessage {
      role:        decode_role(&self.role)?,
      content:     self.content,
      recorded_at: decode_dt(&self.recorded_at)?,
    })
  }
}
