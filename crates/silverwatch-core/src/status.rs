//! Status records and the severity classifier.
//!
//! A status record is the latest classification state for one user. It is
//! overwritten on every chat turn; the change journal keeps the history.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ─── Severity ────────────────────────────────────────────────────────────────

/// Urgency tier derived from a status record's fields by [`classify`].
#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize,
  strum::Display, strum::EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum SeverityTier {
  #[default]
  None,
  Middle,
  High,
}

/// Classify a status into a [`SeverityTier`]. First matching rule wins:
///
/// 1. `high`: depression score ≥ 8, or sentiment score ≥ 0.8.
/// 2. `middle`: depression score in 6..=7 together with sentiment score in
///    `[0.6, 0.8)`, or any non-blank disease.
/// 3. `none`: everything else.
///
/// A missing score fails every comparison it takes part in; it is never
/// treated as zero.
pub fn classify(
  depression_score: Option<i32>,
  sentiment_score: Option<f64>,
  disease: Option<&str>,
) -> SeverityTier {
  let depression_at_least = |min: i32| depression_score.is_some_and(|d| d >= min);
  let sentiment_in = |lo: f64, hi: f64| sentiment_score.is_some_and(|s| s >= lo && s < hi);

  if depression_at_least(8) || sentiment_score.is_some_and(|s| s >= 0.8) {
    return SeverityTier::High;
  }

  let moderate_depression = depression_score.is_some_and(|d| (6..=7).contains(&d));
  let has_disease = disease.is_some_and(|d| !d.trim().is_empty());

  if (moderate_depression && sentiment_in(0.6, 0.8)) || has_disease {
    SeverityTier::Middle
  } else {
    SeverityTier::None
  }
}

// ─── StatusRecord ────────────────────────────────────────────────────────────

/// Latest classification state for a user. At most one exists per user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusRecord {
  pub user_id:          Uuid,
  pub sentiment_label:  Option<String>,
  /// Model confidence for `sentiment_label`, 0.0–1.0.
  pub sentiment_score:  Option<f64>,
  /// LLM-assigned depression score, 0–10.
  pub depression_score: Option<i32>,
  pub disease:          Option<String>,
  /// Serialised as `type` to match what dashboards consume.
  #[serde(rename = "type")]
  pub severity_tier:    SeverityTier,
  pub last_updated:     DateTime<Utc>,
}

/// Input to [`crate::store::MonitorStore::upsert_status`]. The severity tier
/// is not accepted from callers; the store derives it with [`classify`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StatusUpdate {
  pub sentiment_label:  Option<String>,
  pub sentiment_score:  Option<f64>,
  pub depression_score: Option<i32>,
  pub disease:          Option<String>,
}

impl StatusUpdate {
  pub fn tier(&self) -> SeverityTier {
    classify(
      self.depression_score,
      self.sentiment_score,
      self.disease.as_deref(),
    )
  }
}
