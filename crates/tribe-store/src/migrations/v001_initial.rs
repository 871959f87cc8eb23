//! v001 -- Initial schema creation.
//!
//! Creates the six core tables: `users`, `channels`, `conversations`,
//! `messages`, `reactions`, and `presence`.

use rusqlite::Connection;

/// SQL executed when upgrading from version 0 to version 1.
const UP_SQL: &str = r#"
-- ----------------------------------------------------------------
-- Users
-- ----------------------------------------------------------------
CREATE TABLE IF NOT EXISTS users (
    uid          TEXT PRIMARY KEY NOT NULL,   -- auth provider id
    display_name TEXT NOT NULL,
    email        TEXT,
    photo_url    TEXT,
    role         TEXT NOT NULL DEFAULT 'member',
    created_at   TEXT NOT NULL                -- ISO-8601 / RFC-3339
);

-- ----------------------------------------------------------------
-- Channels
-- ----------------------------------------------------------------
CREATE TABLE IF NOT EXISTS channels (
    id          TEXT PRIMARY KEY NOT NULL,    -- UUID v4
    name        TEXT NOT NULL,
    description TEXT NOT NULL DEFAULT '',
    created_at  TEXT NOT NULL,
    created_by  TEXT NOT NULL                 -- uid of the creator
);

-- ----------------------------------------------------------------
-- Direct-message conversations
-- ----------------------------------------------------------------
-- The participant pair is stored sorted, and the unique index over it
-- guarantees at most one conversation per pair.
CREATE TABLE IF NOT EXISTS conversations (
    id                   TEXT PRIMARY KEY NOT NULL,  -- UUID v5 of the pair
    participant_a        TEXT NOT NULL,
    participant_b        TEXT NOT NULL,
    created_at           TEXT NOT NULL,
    updated_at           TEXT NOT NULL,
    last_message_content TEXT,
    last_message_sender  TEXT,
    last_message_at      TEXT,

    UNIQUE (participant_a, participant_b)
);

-- ----------------------------------------------------------------
-- Messages
-- ----------------------------------------------------------------
-- Exactly one scoping column is set per row.
CREATE TABLE IF NOT EXISTS messages (
    id                TEXT PRIMARY KEY NOT NULL,  -- UUID v4
    content           TEXT NOT NULL,
    user_id           TEXT NOT NULL,              -- may be a synthetic ai- id
    created_at        TEXT NOT NULL,
    updated_at        TEXT NOT NULL,
    is_edited         INTEGER NOT NULL DEFAULT 0, -- boolean 0/1
    attachments       TEXT NOT NULL DEFAULT '[]', -- JSON array
    thread_id         TEXT,
    parent_message_id TEXT,
    channel_id        TEXT,
    conversation_id   TEXT,
    chat_id           TEXT,

    CHECK (
        (channel_id IS NOT NULL)
        + (conversation_id IS NOT NULL)
        + (chat_id IS NOT NULL) = 1
    )
);

CREATE INDEX IF NOT EXISTS idx_messages_channel_ts
    ON messages(channel_id, created_at);
CREATE INDEX IF NOT EXISTS idx_messages_conversation_ts
    ON messages(conversation_id, created_at);
CREATE INDEX IF NOT EXISTS idx_messages_chat_ts
    ON messages(chat_id, created_at);
CREATE INDEX IF NOT EXISTS idx_messages_thread
    ON messages(thread_id);

-- ----------------------------------------------------------------
-- Reactions
-- ----------------------------------------------------------------
-- One row per (message, emoji, user): inserting is naturally idempotent
-- and removal is an exact-key delete, so concurrent togglers cannot lose
-- each other's updates.
CREATE TABLE IF NOT EXISTS reactions (
    message_id TEXT NOT NULL,
    emoji      TEXT NOT NULL,
    user_id    TEXT NOT NULL,
    created_at TEXT NOT NULL,

    PRIMARY KEY (message_id, emoji, user_id)
);

-- ----------------------------------------------------------------
-- Presence (ephemeral status records)
-- ----------------------------------------------------------------
CREATE TABLE IF NOT EXISTS presence (
    uid       TEXT PRIMARY KEY NOT NULL,
    state     TEXT NOT NULL,                  -- online / idle / offline
    last_seen TEXT NOT NULL
);
"#;

/// Apply the initial migration.
pub fn up(conn: &Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(UP_SQL)
}
