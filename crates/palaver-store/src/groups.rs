//! Groups and membership.

use rusqlite::params;

use crate::database::Database;
use crate::error::Result;
use crate::models::Group;

impl Database {
    /// Create a group and enroll the owner as its first member.
    /// Fails when the name is empty after trimming or already taken.
    pub fn create_group(&self, name: &str, owner: &str) -> Result<bool> {
        let (name, owner) = (name.trim(), owner.trim());
        if name.is_empty() || owner.is_empty() {
            return Ok(false);
        }

        let tx = self.conn().unchecked_transaction()?;
        let inserted = tx.execute(
            "INSERT OR IGNORE INTO groups (name, owner) VALUES (?1, ?2)",
            params![name, owner],
        )?;
        if inserted == 0 {
            return Ok(false);
        }
        tx.execute(
            "INSERT OR IGNORE INTO group_members (group_name, member) VALUES (?1, ?2)",
            params![name, owner],
        )?;
        tx.commit()?;
        Ok(true)
    }

    pub fn get_group(&self, name: &str) -> Result<Option<Group>> {
        let mut stmt = self
            .conn()
            .prepare("SELECT name, owner FROM groups WHERE name = ?1")?;
        let mut rows = stmt.query(params![name.trim()])?;
        match rows.next()? {
            Some(row) => Ok(Some(Group {
                name: row.get(0)?,
                owner: row.get(1)?,
            })),
            None => Ok(None),
        }
    }

    /// Fails when the group does not exist. Adding an existing member
    /// is a no-op success; the composite key forbids duplicate rows.
    pub fn add_group_member(&self, group: &str, user: &str) -> Result<bool> {
        let (group, user) = (group.trim(), user.trim());
        if user.is_empty() || self.get_group(group)?.is_none() {
            return Ok(false);
        }
        self.conn().execute(
            "INSERT OR IGNORE INTO group_members (group_name, member) VALUES (?1, ?2)",
            params![group, user],
        )?;
        Ok(true)
    }

    /// Fails when no such membership row exists.
    pub fn remove_group_member(&self, group: &str, user: &str) -> Result<bool> {
        let deleted = self.conn().execute(
            "DELETE FROM group_members WHERE group_name = ?1 AND member = ?2",
            params![group.trim(), user.trim()],
        )?;
        Ok(deleted > 0)
    }

    pub fn is_group_member(&self, group: &str, user: &str) -> Result<bool> {
        let count: i64 = self.conn().query_row(
            "SELECT COUNT(*) FROM group_members WHERE group_name = ?1 AND member = ?2",
            params![group.trim(), user.trim()],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }

    /// Groups the user belongs to, alphabetical.
    pub fn groups_for_user(&self, user: &str) -> Result<Vec<String>> {
        let mut stmt = self.conn().prepare(
            "SELECT group_name FROM group_members WHERE member = ?1 ORDER BY group_name ASC",
        )?;
        let rows = stmt.query_map(params![user.trim()], |row| row.get(0))?;
        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(Into::into)
    }

    /// Members of a group, alphabetical.
    pub fn group_members(&self, group: &str) -> Result<Vec<String>> {
        let mut stmt = self.conn().prepare(
            "SELECT member FROM group_members WHERE group_name = ?1 ORDER BY member ASC",
        )?;
        let rows = stmt.query_map(params![group.trim()], |row| row.get(0))?;
        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(Into::into)
    }
}
