//! [`SqliteStore`], the SQLite implementation of [`MonitorStore`].

use std::path::Path;

use chrono::Utc;
use rusqlite::OptionalExtension as _;
use uuid::Uuid;

use silverwatch_core::{
  alert::{AlertEvent, NewAlert},
  change::ChangeFilter,
  conversation::{ChatMessage, NewChatMessage},
  status::{StatusRecord, StatusUpdate},
  store::MonitorStore,
  user::{NewUser, UserProfile},
};

use crate::{
  Error, Result,
  encode::{
    RawAlert, RawMessage, RawStatus, RawUser, encode_dt, encode_fields, encode_seq,
    encode_uuid,
  },
  feed::SqliteFeed,
  schema::SCHEMA,
};

// ─── Store ───────────────────────────────────────────────────────────────────

/// A monitoring store backed by a single SQLite file.
///
/// Cloning is cheap; the inner connection is reference-counted.
#[derive(Clone)]
pub struct SqliteStore {
  conn: tokio_rusqlite::Connection,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  /// Open an in-memory store for tests.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  async fn init_schema(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    Ok(())
  }
}

// ─── MonitorStore impl ───────────────────────────────────────────────────────

impl MonitorStore for SqliteStore {
  type Error = Error;
  type Feed = SqliteFeed;

  // ── Users ─────────────────────────────────────────────────────────────────

  async fn create_user(&self, input: NewUser) -> Result<UserProfile> {
    let profile = UserProfile {
      user_id:     Uuid::new_v4(),
      name:        input.name,
      gender:      input.gender,
      birth:       input.birth,
      address:     input.address,
      phonenumber: input.phonenumber,
      created_at:  Utc::now(),
    };

    let id_str      = encode_uuid(profile.user_id);
    let at_str      = encode_dt(profile.created_at);
    let name        = profile.name.clone();
    let gender      = profile.gender.clone();
    let birth       = profile.birth.clone();
    let address     = profile.address.clone();
    let phonenumber = profile.phonenumber.clone();
    let password    = input.password_hash;
    let refresh     = input.refresh_token;

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO users (
             user_id, name, gender, birth, address, phonenumber,
             password_hash, refresh_token, created_at
           ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
          rusqlite::params![
            id_str, name, gender, birth, address, phonenumber, password, refresh,
            at_str,
          ],
        )?;
        Ok(())
      })
      .await?;

    Ok(profile)
  }

  async fn get_user_public(&self, user_id: Uuid) -> Result<Option<UserProfile>> {
    let id_str = encode_uuid(user_id);

    let raw: Option<RawUser> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              &format!("SELECT {} FROM users WHERE user_id = ?1", RawUser::COLUMNS),
              rusqlite::params![id_str],
              RawUser::from_row,
            )
            .optional()?,
        )
      })
      .await?;

    raw.map(RawUser::into_profile).transpose()
  }

  // ── Status store ──────────────────────────────────────────────────────────

  async fn upsert_status(
    &self,
    user_id: Uuid,
    update: StatusUpdate,
  ) -> Result<StatusRecord> {
    let record = StatusRecord {
      user_id,
      severity_tier:    update.tier(),
      sentiment_label:  update.sentiment_label,
      sentiment_score:  update.sentiment_score,
      depression_score: update.depression_score,
      disease:          update.disease,
      last_updated:     Utc::now(),
    };

    let id_str     = encode_uuid(user_id);
    let label      = record.sentiment_label.clone();
    let sentiment  = record.sentiment_score;
    let depression = record.depression_score;
    let disease    = record.disease.clone();
    let tier_str   = record.severity_tier.to_string();
    let at_str     = encode_dt(record.last_updated);

    let written = self
      .conn
      .call(move |conn| {
        let user_exists = conn
          .query_row(
            "SELECT 1 FROM users WHERE user_id = ?1",
            rusqlite::params![id_str],
            |_| Ok(()),
          )
          .optional()?
          .is_some();
        if !user_exists {
          return Ok(false);
        }

        conn.execute(
          "INSERT INTO statuses (
             user_id, sentiment_label, sentiment_score, depression_score,
             disease, severity_tier, last_updated
           ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
           ON CONFLICT(user_id) DO UPDATE SET
             sentiment_label  = excluded.sentiment_label,
             sentiment_score  = excluded.sentiment_score,
             depression_score = excluded.depression_score,
             disease          = excluded.disease,
             severity_tier    = excluded.severity_tier,
             last_updated     = excluded.last_updated",
          rusqlite::params![
            id_str, label, sentiment, depression, disease, tier_str, at_str,
          ],
        )?;
        Ok(true)
      })
      .await?;

    if !written {
      return Err(Error::UserNotFound(user_id));
    }

    tracing::debug!(%user_id, tier = %record.severity_tier, "status written");
    Ok(record)
  }

  async fn get_status(&self, user_id: Uuid) -> Result<Option<StatusRecord>> {
    let id_str = encode_uuid(user_id);

    let raw: Option<RawStatus> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              &format!(
                "SELECT {} FROM statuses WHERE user_id = ?1",
                RawStatus::COLUMNS
              ),
              rusqlite::params![id_str],
              RawStatus::from_row,
            )
            .optional()?,
        )
      })
      .await?;

    raw.map(RawStatus::into_record).transpose()
  }

  async fn list_statuses(&self) -> Result<Vec<StatusRecord>> {
    let raws: Vec<RawStatus> = self
      .conn
      .call(|conn| {
        let mut stmt = conn.prepare(&format!(
          "SELECT {} FROM statuses ORDER BY last_updated DESC",
          RawStatus::COLUMNS
        ))?;
        let rows = stmt
          .query_map([], RawStatus::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawStatus::into_record).collect()
  }

  // ── Change feed ───────────────────────────────────────────────────────────

  async fn open_feed(&self, filter: ChangeFilter) -> Result<SqliteFeed> {
    SqliteFeed::open(self.conn.clone(), filter).await
  }

  async fn prune_changes(&self, keep_latest: u64) -> Result<u64> {
    let keep = encode_seq(keep_latest);

    let removed = self
      .conn
      .call(move |conn| {
        Ok(conn.execute(
          "DELETE FROM status_changes
           WHERE seq <= (SELECT MAX(seq) FROM status_changes) - ?1",
          rusqlite::params![keep],
        )?)
      })
      .await?;

    if removed > 0 {
      tracing::info!(removed, keep_latest, "pruned change journal");
    }
    Ok(removed as u64)
  }

  // ── Alert log ─────────────────────────────────────────────────────────────

  async fn append_alert(&self, input: NewAlert) -> Result<Option<AlertEvent>> {
    let alert = AlertEvent {
      id:             Uuid::new_v4(),
      change_seq:     input.change_seq,
      operation_type: input.operation_type,
      observed_at:    input.observed_at,
      changed_fields: input.changed_fields,
      snapshot:       input.snapshot,
      is_read:        false,
    };

    let id_str        = encode_uuid(alert.id);
    let change_seq    = encode_seq(alert.change_seq);
    let operation     = alert.operation_type.to_string();
    let at_str        = encode_dt(alert.observed_at);
    let fields_str    = encode_fields(alert.changed_fields.as_deref())?;
    let snapshot_str  = serde_json::to_string(&alert.snapshot)?;

    let inserted = self
      .conn
      .call(move |conn| {
        Ok(conn.execute(
          "INSERT INTO alerts (
             alert_id, change_seq, operation, observed_at,
             changed_fields, snapshot_json, is_read
           ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, 0)
           ON CONFLICT(change_seq) DO NOTHING",
          rusqlite::params![
            id_str, change_seq, operation, at_str, fields_str, snapshot_str,
          ],
        )?)
      })
      .await?;

    if inserted == 0 {
      tracing::debug!(change_seq = alert.change_seq, "alert already logged for change");
      return Ok(None);
    }
    Ok(Some(alert))
  }

  async fn get_alert(&self, id: Uuid) -> Result<Option<AlertEvent>> {
    let id_str = encode_uuid(id);

    let raw: Option<RawAlert> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              &format!("SELECT {} FROM alerts WHERE alert_id = ?1", RawAlert::COLUMNS),
              rusqlite::params![id_str],
              RawAlert::from_row,
            )
            .optional()?,
        )
      })
      .await?;

    raw.map(RawAlert::into_alert).transpose()
  }

  async fn mark_read(&self, id: Uuid) -> Result<()> {
    let id_str = encode_uuid(id);

    let changed = self
      .conn
      .call(move |conn| {
        Ok(conn.execute(
          "UPDATE alerts SET is_read = 1 WHERE alert_id = ?1 AND is_read = 0",
          rusqlite::params![id_str],
        )?)
      })
      .await?;

    if changed == 0 {
      tracing::debug!(alert_id = %id, "mark-read was a no-op");
    }
    Ok(())
  }

  async fn unread(&self) -> Result<Vec<AlertEvent>> {
    let raws: Vec<RawAlert> = self
      .conn
      .call(|conn| {
        let mut stmt = conn.prepare(&format!(
          "SELECT {} FROM alerts WHERE is_read = 0 ORDER BY alert_seq",
          RawAlert::COLUMNS
        ))?;
        let rows = stmt
          .query_map([], RawAlert::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawAlert::into_alert).collect()
  }

  // ── Conversations ─────────────────────────────────────────────────────────

  async fn append_conversation(
    &self,
    user_id: Uuid,
    messages: Vec<NewChatMessage>,
  ) -> Result<()> {
    let id_str = encode_uuid(user_id);
    let at_str = encode_dt(Utc::now());
    let rows: Vec<(String, String)> = messages
      .into_iter()
      .map(|m| (m.role.to_string(), m.content))
      .collect();

    self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        {
          let mut stmt = tx.prepare(
            "INSERT INTO conversations (user_id, role, content, recorded_at)
             VALUES (?1, ?2, ?3, ?4)",
          )?;
          for (role, content) in &rows {
            stmt.execute(rusqlite::params![id_str, role, content, at_str])?;
          }
        }
        tx.commit()?;
        Ok(())
      })
      .await?;

    Ok(())
  }

  async fn conversation(&self, user_id: Uuid) -> Result<Vec<ChatMessage>> {
    let id_str = encode_uuid(user_id);

    let raws: Vec<RawMessage> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(
          "SELECT role, content, recorded_at FROM conversations
           WHERE user_id = ?1
           ORDER BY message_seq",
        )?;
        let rows = stmt
          .query_map(rusqlite::params![id_str], |row| {
            Ok(RawMessage {
              role:        row.get(0)?,
              content:     row.get(1)?,
              recorded_at: row.get(2)?,
            })
          })?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawMessage::into_message).collect()
  }
}
