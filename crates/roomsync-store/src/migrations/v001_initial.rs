//! v001 -- Initial schema creation.
//!
//! Creates `users`, `settings`, `rooms`, `room_members`, `messages` and
//! `contacts`.

use rusqlite::Connection;

/// SQL executed when upgrading from version 0 to version 1.
const UP_SQL: &str = r#"
-- ----------------------------------------------------------------
-- Users (profiles)
-- ----------------------------------------------------------------
CREATE TABLE IF NOT EXISTS users (
    uid              TEXT PRIMARY KEY NOT NULL,
    name             TEXT NOT NULL,
    phone            TEXT,
    phone_normalized TEXT,
    email            TEXT,
    avatar_url       TEXT,
    created_at       TEXT NOT NULL,           -- RFC-3339, microseconds, UTC
    updated_at       TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_users_phone ON users(phone_normalized);

-- ----------------------------------------------------------------
-- Settings (one JSON document per user)
-- ----------------------------------------------------------------
CREATE TABLE IF NOT EXISTS settings (
    uid        TEXT PRIMARY KEY NOT NULL,
    json       TEXT NOT NULL,
    updated_at TEXT NOT NULL
);

-- ----------------------------------------------------------------
-- Rooms
-- ----------------------------------------------------------------
CREATE TABLE IF NOT EXISTS rooms (
    id              TEXT PRIMARY KEY NOT NULL,
    kind            TEXT NOT NULL CHECK (kind IN ('direct', 'group', 'channel')),
    name            TEXT NOT NULL,
    owner           TEXT NOT NULL,
    last_message    TEXT,
    last_sender     TEXT,
    last_message_at TEXT,
    created_at      TEXT NOT NULL,
    updated_at      TEXT NOT NULL
);

-- One row per member: the unread / muted / pinned maps of the room.
CREATE TABLE IF NOT EXISTS room_members (
    room_id   TEXT NOT NULL,
    user_id   TEXT NOT NULL,
    is_admin  INTEGER NOT NULL DEFAULT 0,
    unread    INTEGER NOT NULL DEFAULT 0 CHECK (unread >= 0),
    muted     INTEGER NOT NULL DEFAULT 0,
    pinned    INTEGER NOT NULL DEFAULT 0,
    joined_at TEXT NOT NULL,

    PRIMARY KEY (room_id, user_id),
    FOREIGN KEY (room_id) REFERENCES rooms(id) ON DELETE CASCADE
);

CREATE INDEX IF NOT EXISTS idx_room_members_user ON room_members(user_id);

-- ----------------------------------------------------------------
-- Messages
-- ----------------------------------------------------------------
CREATE TABLE IF NOT EXISTS messages (
    seq        INTEGER PRIMARY KEY AUTOINCREMENT,  -- insertion order, tie-break
    id         TEXT NOT NULL UNIQUE,               -- UUID v4
    room_id    TEXT NOT NULL,
    sender_id  TEXT NOT NULL,
    text       TEXT NOT NULL,
    created_at TEXT NOT NULL,
    is_deleted INTEGER NOT NULL DEFAULT 0,
    edited_at  TEXT,

    FOREIGN KEY (room_id) REFERENCES rooms(id) ON DELETE CASCADE
);

CREATE INDEX IF NOT EXISTS idx_messages_room_ts
    ON messages(room_id, created_at, seq);

-- Deleted messages are terminal.
CREATE TRIGGER IF NOT EXISTS messages_deleted_immutable
BEFORE UPDATE ON messages
WHEN OLD.is_deleted = 1
BEGIN
    SELECT RAISE(ABORT, 'message is deleted');
END;

-- ----------------------------------------------------------------
-- Contacts (private per owner)
-- ----------------------------------------------------------------
CREATE TABLE IF NOT EXISTS contacts (
    id               TEXT PRIMARY KEY NOT NULL,   -- UUID v4
    owner_id         TEXT NOT NULL,
    name             TEXT NOT NULL,
    phone            TEXT NOT NULL,
    phone_normalized TEXT NOT NULL,
    linked_uid       TEXT,
    created_at       TEXT NOT NULL
);

CREATE UNIQUE INDEX IF NOT EXISTS idx_contacts_owner_phone
    ON contacts(owner_id, phone_normalized);
"#;

/// Apply the initial migration.
pub fn up(conn: &Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(UP_SQL)
}
