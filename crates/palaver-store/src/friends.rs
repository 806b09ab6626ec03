//! Friendship edges.
//!
//! An unanswered request is a single directed row
//! `(owner, friend, 'pending')`. An accepted friendship is two
//! mirrored rows, both `'accepted'`. Refusal deletes the pending row;
//! unfriending deletes both directions.

use rusqlite::params;

use crate::database::Database;
use crate::error::Result;
use crate::models::{FriendEntry, FriendState, FriendStatus};

impl Database {
    /// Insert or replace `(from, to, pending)`. Idempotent; the target
    /// is not validated against the accounts table.
    pub fn send_friend_request(&self, from: &str, to: &str) -> Result<bool> {
        let (from, to) = (from.trim(), to.trim());
        if from.is_empty() || to.is_empty() {
            return Ok(false);
        }
        self.conn().execute(
            "INSERT OR REPLACE INTO friends (owner, friend, status) VALUES (?1, ?2, 'pending')",
            params![from, to],
        )?;
        Ok(true)
    }

    /// Succeeds only when a row `(from, to, pending)` exists; then
    /// writes both accepted mirrors in one transaction.
    pub fn accept_friend_request(&self, from: &str, to: &str) -> Result<bool> {
        let (from, to) = (from.trim(), to.trim());
        if from.is_empty() || to.is_empty() {
            return Ok(false);
        }

        let tx = self.conn().unchecked_transaction()?;
        let pending: i64 = tx.query_row(
            "SELECT COUNT(*) FROM friends
             WHERE owner = ?1 AND friend = ?2 AND status = 'pending'",
            params![from, to],
            |row| row.get(0),
        )?;
        if pending == 0 {
            return Ok(false);
        }

        tx.execute(
            "INSERT OR REPLACE INTO friends (owner, friend, status) VALUES (?1, ?2, 'accepted')",
            params![from, to],
        )?;
        tx.execute(
            "INSERT OR REPLACE INTO friends (owner, friend, status) VALUES (?1, ?2, 'accepted')",
            params![to, from],
        )?;
        tx.commit()?;
        Ok(true)
    }

    /// Delete `(from, to, pending)`; fails when no such pending row.
    pub fn refuse_friend_request(&self, from: &str, to: &str) -> Result<bool> {
        let deleted = self.conn().execute(
            "DELETE FROM friends
             WHERE owner = ?1 AND friend = ?2 AND status = 'pending'",
            params![from.trim(), to.trim()],
        )?;
        Ok(deleted > 0)
    }

    /// Delete both directions of the relationship.
    pub fn remove_friend(&self, a: &str, b: &str) -> Result<bool> {
        let (a, b) = (a.trim(), b.trim());
        if a.is_empty() || b.is_empty() {
            return Ok(false);
        }
        self.conn().execute(
            "DELETE FROM friends
             WHERE (owner = ?1 AND friend = ?2) OR (owner = ?2 AND friend = ?1)",
            params![a, b],
        )?;
        Ok(true)
    }

    /// Snapshot of the caller's friend list: accepted edges, own
    /// pending requests (outgoing) and pending requests aimed at the
    /// caller (incoming). The store never annotates online state; the
    /// caller consults the session roster after this returns.
    pub fn list_friends(&self, user: &str) -> Result<Vec<FriendEntry>> {
        let user = user.trim();
        let mut entries = Vec::new();

        let mut stmt = self.conn().prepare(
            "SELECT friend, status FROM friends WHERE owner = ?1 ORDER BY friend ASC",
        )?;
        let mut rows = stmt.query(params![user])?;
        while let Some(row) = rows.next()? {
            let name: String = row.get(0)?;
            let status: String = row.get(1)?;
            let state = if status == "accepted" {
                FriendState::Accepted
            } else {
                FriendState::Outgoing
            };
            entries.push(FriendEntry { name, state });
        }

        let mut stmt = self.conn().prepare(
            "SELECT owner FROM friends
             WHERE friend = ?1 AND status = 'pending'
             ORDER BY owner ASC",
        )?;
        let mut rows = stmt.query(params![user])?;
        while let Some(row) = rows.next()? {
            entries.push(FriendEntry {
                name: row.get(0)?,
                state: FriendState::Incoming,
            });
        }

        Ok(entries)
    }

    /// Relationship between `viewer` and `other`, probing both edge
    /// directions.
    pub fn friend_status(&self, viewer: &str, other: &str) -> Result<FriendStatus> {
        let (viewer, other) = (viewer.trim(), other.trim());
        if viewer == other {
            return Ok(FriendStatus::Me);
        }

        if let Some(status) = self.edge_status(viewer, other)? {
            return Ok(match status.as_str() {
                "accepted" => FriendStatus::Friend,
                _ => FriendStatus::Outgoing,
            });
        }
        if let Some(status) = self.edge_status(other, viewer)? {
            return Ok(match status.as_str() {
                "accepted" => FriendStatus::Friend,
                _ => FriendStatus::Incoming,
            });
        }
        Ok(FriendStatus::None)
    }

    /// All accounts in alphabetical order, each with its status
    /// relative to `viewer`.
    pub fn list_users_with_status(&self, viewer: &str) -> Result<Vec<(String, FriendStatus)>> {
        let mut stmt = self
            .conn()
            .prepare("SELECT username FROM users ORDER BY username ASC")?;
        let names = stmt
            .query_map([], |row| row.get::<_, String>(0))?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        let mut out = Vec::with_capacity(names.len());
        for name in names {
            let status = self.friend_status(viewer, &name)?;
            out.push((name, status));
        }
        Ok(out)
    }

    /// True when an accepted edge exists in either direction.
    pub fn are_friends(&self, a: &str, b: &str) -> Result<bool> {
        let count: i64 = self.conn().query_row(
            "SELECT COUNT(*) FROM friends
             WHERE status = 'accepted'
               AND ((owner = ?1 AND friend = ?2) OR (owner = ?2 AND friend = ?1))",
            params![a.trim(), b.trim()],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }

    fn edge_status(&self, owner: &str, friend: &str) -> Result<Option<String>> {
        let mut stmt = self
            .conn()
            .prepare("SELECT status FROM friends WHERE owner = ?1 AND friend = ?2")?;
        let mut rows = stmt.query(params![owner, friend])?;
        match rows.next()? {
            Some(row) => Ok(Some(row.get(0)?)),
            None => Ok(None),
        }
    }
}
