//! v001 -- Initial schema creation.
//!
//! Creates the six core tables: `users`, `friends`, `groups`,
//! `group_members`, `messages`, and `group_messages`.

use rusqlite::Connection;

/// SQL executed when upgrading from version 0 to version 1.
const UP_SQL: &str = r#"
-- ----------------------------------------------------------------
-- Users
-- ----------------------------------------------------------------
CREATE TABLE IF NOT EXISTS users (
    username TEXT PRIMARY KEY NOT NULL,       -- trimmed, case-sensitive
    password TEXT NOT NULL                    -- opaque bytes, exact match
);

-- ----------------------------------------------------------------
-- Friendship edges
--
-- A pending request is one directed row. An accepted friendship is
-- two mirrored rows, both 'accepted'.
-- ----------------------------------------------------------------
CREATE TABLE IF NOT EXISTS friends (
    owner  TEXT NOT NULL,
    friend TEXT NOT NULL,
    status TEXT NOT NULL,                     -- 'pending' | 'accepted'

    PRIMARY KEY (owner, friend)
);

CREATE INDEX IF NOT EXISTS idx_friends_friend ON friends(friend);

-- ----------------------------------------------------------------
-- Groups
-- ----------------------------------------------------------------
CREATE TABLE IF NOT EXISTS groups (
    name  TEXT PRIMARY KEY NOT NULL,          -- trimmed, non-empty
    owner TEXT NOT NULL                       -- creator; stored, not consulted
);

CREATE TABLE IF NOT EXISTS group_members (
    group_name TEXT NOT NULL,
    member     TEXT NOT NULL,

    PRIMARY KEY (group_name, member)
);

CREATE INDEX IF NOT EXISTS idx_group_members_member ON group_members(member);

-- ----------------------------------------------------------------
-- Direct messages
-- ----------------------------------------------------------------
CREATE TABLE IF NOT EXISTS messages (
    id        INTEGER PRIMARY KEY AUTOINCREMENT,
    sender    TEXT NOT NULL,
    receiver  TEXT NOT NULL,
    body      TEXT NOT NULL,
    timestamp INTEGER NOT NULL                -- seconds since epoch
);

CREATE INDEX IF NOT EXISTS idx_messages_pair
    ON messages(sender, receiver, id);

-- ----------------------------------------------------------------
-- Group messages
-- ----------------------------------------------------------------
CREATE TABLE IF NOT EXISTS group_messages (
    id         INTEGER PRIMARY KEY AUTOINCREMENT,
    group_name TEXT NOT NULL,
    sender     TEXT NOT NULL,
    body       TEXT NOT NULL,
    timestamp  INTEGER NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_group_messages_group
    ON group_messages(group_name, id);
"#;

/// Apply the initial migration.
pub fn up(conn: &Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(UP_SQL)
}
