//! [`SqliteFeed`]: a cursor over the `status_changes` journal.

use chrono::Utc;
use rusqlite::OptionalExtension as _;
use silverwatch_core::change::{ChangeFeed, ChangeFilter, FeedPoll};

use crate::{
  Error, Result,
  encode::{RawChange, decode_seq, encode_dt, encode_seq},
};

/// Highest sequence number ever assigned in the journal, including entries
/// that have since been pruned.
fn high_water(conn: &rusqlite::Connection) -> rusqlite::Result<i64> {
  Ok(
    conn
      .query_row(
        "SELECT seq FROM sqlite_sequence WHERE name = 'status_changes'",
        [],
        |r| r.get::<_, i64>(0),
      )
      .optional()?
      .unwrap_or(0),
  )
}

enum Step {
  Change(RawChange),
  Empty { tail: i64 },
  Invalidated,
}

/// Non-blocking cursor over the change journal.
///
/// Filtering happens in SQL: rows that do not qualify are skipped without
/// being decoded.
pub struct SqliteFeed {
  conn:   tokio_rusqlite::Connection,
  filter: ChangeFilter,
  cursor: i64,
}

impl SqliteFeed {
  pub(crate) async fn open(
    conn: tokio_rusqlite::Connection,
    filter: ChangeFilter,
  ) -> Result<Self> {
    let consumer = filter.consumer.clone();
    let cursor = conn
      .call(move |conn| {
        let saved: Option<i64> = conn
          .query_row(
            "SELECT position FROM feed_checkpoints WHERE consumer = ?1",
            rusqlite::params![consumer],
            |r| r.get(0),
          )
          .optional()?;
        match saved {
          Some(position) => Ok(position),
          None => Ok(high_water(conn)?),
        }
      })
      .await?;

    tracing::debug!(consumer = %filter.consumer, cursor, "opened change feed");
    Ok(Self { conn, filter, cursor })
  }
}

impl ChangeFeed for SqliteFeed {
  type Error = Error;

  async fn poll(&mut self) -> Result<FeedPoll> {
    let cursor = self.cursor;
    let field = self.filter.field.clone();

    let step = self
      .conn
      .call(move |conn| {
        let tail = high_water(conn)?;
        if cursor > tail {
          return Ok(Step::Invalidated);
        }

        // The entry right after the cursor must still be in the journal.
        let oldest: Option<i64> =
          conn.query_row("SELECT MIN(seq) FROM status_changes", [], |r| r.get(0))?;
        let truncated = match oldest {
          Some(oldest) => oldest > cursor + 1,
          None => tail > cursor,
        };
        if truncated {
          return Ok(Step::Invalidated);
        }

        let next = conn
          .query_row(
            "SELECT seq, operation, user_id, changed_fields, observed_at
             FROM status_changes
             WHERE seq > ?1 AND seq <= ?2
               AND (operation = 'insert'
                    OR EXISTS (SELECT 1 FROM json_each(changed_fields)
                               WHERE value = ?3))
             ORDER BY seq
             LIMIT 1",
            rusqlite::params![cursor, tail, field],
            RawChange::from_row,
          )
          .optional()?;

        Ok(match next {
          Some(raw) => Step::Change(raw),
          None => Step::Empty { tail },
        })
      })
      .await?;

    match step {
      Step::Change(raw) => {
        let change = raw.into_change()?;
        self.cursor = encode_seq(change.seq);
        Ok(FeedPoll::Change(change))
      }
      // Nothing up to `tail` qualifies, so skip past it.
      Step::Empty { tail } => {
        self.cursor = tail;
        Ok(FeedPoll::Empty)
      }
      Step::Invalidated => Ok(FeedPoll::Invalidated),
    }
  }

  async fn reset_to_now(&mut self) -> Result<()> {
    let tail = self.conn.call(|conn| Ok(high_water(conn)?)).await?;
    tracing::debug!(
      consumer = %self.filter.consumer,
      from = self.cursor,
      to = tail,
      "change feed reset to journal tail"
    );
    self.cursor = tail;
    Ok(())
  }

  fn position(&self) -> u64 { decode_seq(self.cursor) }

  async fn close(self) -> Result<()> {
    let consumer = self.filter.consumer.clone();
    let position = self.cursor;
    let at = encode_dt(Utc::now());

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO feed_checkpoints (consumer, position, updated_at)
           VALUES (?1, ?2, ?3)
           ON CONFLICT(consumer) DO UPDATE
             SET position = excluded.position, updated_at = excluded.updated_at",
          rusqlite::params![consumer, position, at],
        )?;
        Ok(())
      })
      .await?;

    tracing::debug!(consumer = %self.filter.consumer, position, "closed change feed");
    Ok(())
  }
}
