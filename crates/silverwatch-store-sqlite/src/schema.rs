//! SQL schema for the silverwatch SQLite store.
//!
//! Executed once at connection startup. Future migrations will be gated on
//! `PRAGMA user_version`.

/// Full schema DDL; idempotent thanks to `IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;
PRAGMA foreign_keys = ON;

-- Secret columns are written by the auth collaborator and never selected.
CREATE TABLE IF NOT EXISTS users (
    user_id        TEXT PRIMARY KEY,
    name           TEXT NOT NULL,
    gender         TEXT,
    birth          TEXT,
    address        TEXT,
    phonenumber    TEXT,
    password_hash  TEXT,
    refresh_token  TEXT,
    created_at     TEXT NOT NULL
);

-- Latest classification per user; overwritten on every chat turn.
CREATE TABLE IF NOT EXISTS statuses (
    user_id           TEXT PRIMARY KEY REFERENCES users(user_id),
    sentiment_label   TEXT,
    sentiment_score   REAL,
    depression_score  INTEGER,
    disease           TEXT,
    severity_tier     TEXT NOT NULL,   -- 'none' | 'middle' | 'high'
    last_updated      TEXT NOT NULL
);

-- Change journal; the feed cursor is `seq`.
-- Rows are only ever appended by the triggers below, or pruned from the
-- head by maintenance.
CREATE TABLE IF NOT EXISTS status_changes (
    seq             INTEGER PRIMARY KEY AUTOINCREMENT,
    operation       TEXT NOT NULL,     -- 'insert' | 'update'
    user_id         TEXT NOT NULL,
    changed_fields  TEXT,              -- JSON array; NULL for inserts
    observed_at     TEXT NOT NULL
);

CREATE TRIGGER IF NOT EXISTS statuses_journal_insert
AFTER INSERT ON statuses
BEGIN
    INSERT INTO status_changes (operation, user_id, changed_fields, observed_at)
    VALUES ('insert', NEW.user_id, NULL, strftime('%Y-%m-%dT%H:%M:%fZ', 'now'));
END;

CREATE TRIGGER IF NOT EXISTS statuses_journal_update
AFTER UPDATE ON statuses
BEGIN
    INSERT INTO status_changes (operation, user_id, changed_fields, observed_at)
    SELECT 'update', NEW.user_id, json_group_array(field),
           strftime('%Y-%m-%dT%H:%M:%fZ', 'now')
    FROM (
        SELECT 'sentiment_label' AS field
         WHERE OLD.sentiment_label  IS NOT NEW.sentiment_label
        UNION ALL SELECT 'sentiment_score'
         WHERE OLD.sentiment_score  IS NOT NEW.sentiment_score
        UNION ALL SELECT 'depression_score'
         WHERE OLD.depression_score IS NOT NEW.depression_score
        UNION ALL SELECT 'disease'
         WHERE OLD.disease          IS NOT NEW.disease
        UNION ALL SELECT 'severity_tier'
         WHERE OLD.severity_tier    IS NOT NEW.severity_tier
        UNION ALL SELECT 'last_updated'
         WHERE OLD.last_updated     IS NOT NEW.last_updated
    );
END;

-- Last journal position handed out to each named consumer.
CREATE TABLE IF NOT EXISTS feed_checkpoints (
    consumer    TEXT PRIMARY KEY,
    position    INTEGER NOT NULL,
    updated_at  TEXT NOT NULL
);

-- Alerts are append-only apart from the unread -> read transition.
-- `change_seq` is unique so replaying a change cannot log it twice.
CREATE TABLE IF NOT EXISTS alerts (
    alert_seq       INTEGER PRIMARY KEY AUTOINCREMENT,
    alert_id        TEXT NOT NULL UNIQUE,
    change_seq      INTEGER NOT NULL UNIQUE,
    operation       TEXT NOT NULL,
    observed_at     TEXT NOT NULL,
    changed_fields  TEXT,
    snapshot_json   TEXT NOT NULL,
    is_read         INTEGER NOT NULL DEFAULT 0
);

CREATE TABLE IF NOT EXISTS conversations (
    message_seq  INTEGER PRIMARY KEY AUTOINCREMENT,
    user_id      TEXT NOT NULL REFERENCES users(user_id),
    role         TEXT NOT NULL,         -- 'system' | 'user' | 'assistant'
    content      TEXT NOT NULL,
    recorded_at  TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS alerts_unread_idx        ON alerts(is_read, alert_seq);
CREATE INDEX IF NOT EXISTS conversations_user_idx   ON conversations(user_id, message_seq);

PRAGMA user_version = 1;
";
