//! Direct and group message archival.
//!
//! Rows are immutable after insertion. The AUTOINCREMENT id defines
//! the canonical history order; the timestamp is the server's wall
//! clock at insertion, in seconds since epoch.

use chrono::Utc;
use rusqlite::params;

use crate::database::Database;
use crate::error::Result;
use crate::models::{DirectMessage, GroupMessage};

impl Database {
    pub fn save_message(&self, sender: &str, receiver: &str, body: &str) -> Result<()> {
        self.conn().execute(
            "INSERT INTO messages (sender, receiver, body, timestamp)
             VALUES (?1, ?2, ?3, ?4)",
            params![sender.trim(), receiver.trim(), body, Utc::now().timestamp()],
        )?;
        Ok(())
    }

    /// The most recent `limit` messages exchanged between `a` and `b`
    /// in either direction, returned oldest-first by ascending id.
    pub fn conversation_history(
        &self,
        a: &str,
        b: &str,
        limit: u32,
    ) -> Result<Vec<DirectMessage>> {
        let mut stmt = self.conn().prepare(
            "SELECT id, sender, receiver, body, timestamp FROM (
                 SELECT id, sender, receiver, body, timestamp
                 FROM messages
                 WHERE (sender = ?1 AND receiver = ?2)
                    OR (sender = ?2 AND receiver = ?1)
                 ORDER BY id DESC
                 LIMIT ?3
             )
             ORDER BY id ASC",
        )?;
        let rows = stmt.query_map(params![a.trim(), b.trim(), limit], row_to_direct)?;
        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(Into::into)
    }

    pub fn save_group_message(&self, group: &str, sender: &str, body: &str) -> Result<()> {
        self.conn().execute(
            "INSERT INTO group_messages (group_name, sender, body, timestamp)
             VALUES (?1, ?2, ?3, ?4)",
            params![group.trim(), sender.trim(), body, Utc::now().timestamp()],
        )?;
        Ok(())
    }

    /// The most recent `limit` messages of a group, oldest-first.
    pub fn group_history(&self, group: &str, limit: u32) -> Result<Vec<GroupMessage>> {
        let mut stmt = self.conn().prepare(
            "SELECT id, group_name, sender, body, timestamp FROM (
                 SELECT id, group_name, sender, body, timestamp
                 FROM group_messages
                 WHERE group_name = ?1
                 ORDER BY id DESC
                 LIMIT ?2
             )
             ORDER BY id ASC",
        )?;
        let rows = stmt.query_map(params![group.trim(), limit], row_to_group_message)?;
        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(Into::into)
    }
}

fn row_to_direct(row: &rusqlite::Row<'_>) -> rusqlite::Result<DirectMessage> {
    Ok(DirectMessage {
        id: row.get(0)?,
        sender: row.get(1)?,
        receiver: row.get(2)?,
        body: row.get(3)?,
        timestamp: row.get(4)?,
    })
}

fn row_to_group_message(row: &rusqlite::Row<'_>) -> rusqlite::Result<GroupMessage> {
    Ok(GroupMessage {
        id: row.get(0)?,
        group: row.get(1)?,
        sender: row.get(2)?,
        body: row.get(3)?,
        timestamp: row.get(4)?,
    })
}
