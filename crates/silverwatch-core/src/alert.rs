//! Alert events, the enriched append-only record of a qualifying status
//! change, and their wire representation.
//!
//! An alert is immutable once logged except for its read flag, which only
//! ever moves from unread to read.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

use crate::{Result, change::OperationType, status::StatusRecord, user::UserProfile};

// ─── Snapshot ────────────────────────────────────────────────────────────────

/// The status record joined with the public profile of its user, captured
/// when the change was processed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlertSnapshot {
  pub status: StatusRecord,
  pub user:   UserProfile,
}

// ─── AlertEvent ──────────────────────────────────────────────────────────────

/// One logged alert.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlertEvent {
  pub id:             Uuid,
  /// Journal position of the change that produced this alert.
  pub change_seq:     u64,
  pub operation_type: OperationType,
  pub observed_at:    DateTime<Utc>,
  pub changed_fields: Option<Vec<String>>,
  pub snapshot:       AlertSnapshot,
  pub is_read:        bool,
}

/// Input to [`crate::store::MonitorStore::append_alert`]. The id and read
/// flag are assigned by the log.
#[derive(Debug, Clone)]
pub struct NewAlert {
  pub change_seq:     u64,
  pub operation_type: OperationType,
  pub observed_at:    DateTime<Utc>,
  pub changed_fields: Option<Vec<String>>,
  pub snapshot:       AlertSnapshot,
}

// ─── Wire format ─────────────────────────────────────────────────────────────

/// The JSON object pushed to observers and returned by the REST API.
///
/// `data` is a flat object: status fields merged with profile fields, every
/// non-scalar value rendered as a string.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WireAlert {
  pub id:             String,
  pub operation_type: OperationType,
  pub time:           String,
  pub updated_fields: Option<Vec<String>>,
  pub data:           Map<String, Value>,
  #[serde(rename = "isread")]
  pub is_read:        bool,
}

impl AlertEvent {
  /// Convert to the transport shape. This is the only place ids and dates
  /// are turned into strings.
  pub fn to_wire(&self) -> Result<WireAlert> {
    let mut data = Map::new();
    // Profile first so status fields win on a key clash.
    for part in [
      serde_json::to_value(&self.snapshot.user)?,
      serde_json::to_value(&self.snapshot.status)?,
    ] {
      if let Value::Object(fields) = part {
        data.extend(fields.into_iter().map(|(k, v)| (k, flatten(v))));
      }
    }

    Ok(WireAlert {
      id:             self.id.to_string(),
      operation_type: self.operation_type,
      time:           self.observed_at.to_rfc3339_opts(SecondsFormat::Millis, true),
      updated_fields: self.changed_fields.clone(),
      data,
      is_read:        self.is_read,
    })
  }
}

fn flatten(value: Value) -> Value {
  match value {
    Value::Array(_) | Value::Object(_) => Value::String(value.to_string()),
    scalar => scalar,
  }
}

/// Encode one alert as a text frame.
pub fn encode_frame(alert: &AlertEvent) -> Result<String> {
  Ok(serde_json::to_string(&alert.to_wire()?)?)
}

/// Encode a catch-up batch as a single JSON array frame.
pub fn encode_batch(alerts: &[AlertEvent]) -> Result<String> {
  let wire = alerts
    .iter()
    .map(AlertEvent::to_wire)
    .collect::<Result<Vec<_>>>()?;
  Ok(serde_json::to_string(&wire)?)
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::status::SeverityTier;

  fn sample() -> AlertEvent {
    let user_id = Uuid::new_v4();
    AlertEvent {
      id:             Uuid::new_v4(),
      change_seq:     7,
      operation_type: OperationType::Update,
      observed_at:    Utc::now(),
      changed_fields: Some(vec!["severity_tier".into(), "last_updated".into()]),
      snapshot:       AlertSnapshot {
        status: StatusRecord {
          user_id,
          sentiment_label:  Some("anxious".into()),
          sentiment_score:  Some(0.5),
          depression_score: Some(9),
          disease:          None,
          severity_tier:    SeverityTier::High,
          last_updated:     Utc::now(),
        },
        user:   UserProfile {
          user_id,
          name:        "Kim Younghee".into(),
          gender:      Some("female".into()),
          birth:       None,
          address:     Some("Seoul".into()),
          phonenumber: None,
          created_at:  Utc::now(),
        },
      },
      is_read:        false,
    }
  }

  #[test]
  fn wire_shape_uses_expected_keys() {
    let alert = sample();
    let value = serde_json::to_value(alert.to_wire().unwrap()).unwrap();

    assert_eq!(value["operationType"], "update");
    assert_eq!(value["isread"], false);
    assert_eq!(value["id"], alert.id.to_string());
    assert_eq!(value["updatedFields"][0], "severity_tier");
    assert!(value["time"].as_str().unwrap().ends_with('Z'));
  }

  #[test]
  fn wire_data_merges_status_and_profile() {
    let alert = sample();
    let wire = alert.to_wire().unwrap();

    assert_eq!(wire.data["type"], "high");
    assert_eq!(wire.data["name"], "Kim Younghee");
    assert_eq!(wire.data["user_id"], alert.snapshot.status.user_id.to_string());
    assert_eq!(wire.data["depression_score"], 9);
    assert!(wire.data["last_updated"].is_string());
    assert!(wire.data["disease"].is_null());
  }

  #[test]
  fn insert_has_null_updated_fields() {
    let mut alert = sample();
    alert.operation_type = OperationType::Insert;
    alert.changed_fields = None;
    let value: Value = serde_json::from_str(&encode_frame(&alert).unwrap()).unwrap();
    assert!(value["updatedFields"].is_null());
    assert_eq!(value["operationType"], "insert");
  }

  #[test]
  fn batch_is_a_json_array() {
    let frame = encode_batch(&[sample(), sample()]).unwrap();
    let value: Value = serde_json::from_str(&frame).unwrap();
    assert_eq!(value.as_array().map(Vec::len), Some(2));
    assert_eq!(encode_batch(&[]).unwrap(), "[]");
  }
}
