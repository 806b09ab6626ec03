//! Account operations.
//!
//! Usernames are trimmed before every write and matched exactly
//! (case-sensitive) afterwards. Passwords are opaque bytes compared
//! for exact equality.

use rusqlite::params;

use crate::database::Database;
use crate::error::Result;

impl Database {
    /// Create an account. Fails when the username is empty after
    /// trimming or already exists.
    pub fn add_user(&self, username: &str, password: &str) -> Result<bool> {
        let name = username.trim();
        if name.is_empty() {
            return Ok(false);
        }
        let inserted = self.conn().execute(
            "INSERT OR IGNORE INTO users (username, password) VALUES (?1, ?2)",
            params![name, password],
        )?;
        Ok(inserted > 0)
    }

    /// True only when the stored row matches exactly.
    pub fn verify_user(&self, username: &str, password: &str) -> Result<bool> {
        let name = username.trim();
        if name.is_empty() {
            return Ok(false);
        }
        let mut stmt = self
            .conn()
            .prepare("SELECT password FROM users WHERE username = ?1")?;
        let mut rows = stmt.query(params![name])?;
        match rows.next()? {
            Some(row) => {
                let stored: String = row.get(0)?;
                Ok(stored == password)
            }
            None => Ok(false),
        }
    }

    /// Fails when the username does not exist.
    pub fn change_password(&self, username: &str, new_password: &str) -> Result<bool> {
        let name = username.trim();
        if name.is_empty() {
            return Ok(false);
        }
        let changed = self.conn().execute(
            "UPDATE users SET password = ?1 WHERE username = ?2",
            params![new_password, name],
        )?;
        Ok(changed > 0)
    }

    /// Deletes only the account row. Friend edges and group
    /// memberships naming the account are left in place.
    pub fn delete_user(&self, username: &str) -> Result<bool> {
        let name = username.trim();
        if name.is_empty() {
            return Ok(false);
        }
        let deleted = self
            .conn()
            .execute("DELETE FROM users WHERE username = ?1", params![name])?;
        Ok(deleted > 0)
    }

    pub fn user_exists(&self, username: &str) -> Result<bool> {
        let count: i64 = self.conn().query_row(
            "SELECT COUNT(*) FROM users WHERE username = ?1",
            params![username.trim()],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }
}
