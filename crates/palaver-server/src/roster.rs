//! In-memory roster of live sessions.
//!
//! Maps session id to session handle plus a username index, all under
//! one mutex. The same account may be logged in from several
//! connections at once; each connection is its own roster entry and
//! receives its own delivered copies.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::{Mutex, MutexGuard};

use tokio::sync::mpsc;

use palaver_proto::Frame;

pub type SessionId = u64;

/// Handle to one live, authenticated session.
///
/// `outbound` feeds the session's writer task, which owns the socket
/// write half; pushing a frame here never blocks and never touches
/// the socket under a lock.
#[derive(Debug, Clone)]
pub struct SessionHandle {
    pub id: SessionId,
    pub username: String,
    pub addr: SocketAddr,
    pub outbound: mpsc::UnboundedSender<Frame>,
}

#[derive(Default)]
struct Inner {
    sessions: HashMap<SessionId, SessionHandle>,
    by_name: HashMap<String, Vec<SessionId>>,
}

#[derive(Default)]
pub struct Roster {
    inner: Mutex<Inner>,
}

impl Roster {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        // A poisoned lock means a session task panicked mid-update;
        // the map itself is still consistent enough to continue.
        self.inner
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn len(&self) -> usize {
        self.lock().sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn add(&self, handle: SessionHandle) {
        let mut inner = self.lock();
        inner
            .by_name
            .entry(handle.username.clone())
            .or_default()
            .push(handle.id);
        inner.sessions.insert(handle.id, handle);
    }

    /// Remove a session and every index entry pointing at it.
    pub fn remove(&self, id: SessionId) -> Option<SessionHandle> {
        let mut inner = self.lock();
        let handle = inner.sessions.remove(&id)?;
        if let Some(ids) = inner.by_name.get_mut(&handle.username) {
            ids.retain(|&other| other != id);
            if ids.is_empty() {
                inner.by_name.remove(&handle.username);
            }
        }
        Some(handle)
    }

    pub fn is_online(&self, username: &str) -> bool {
        self.lock().by_name.contains_key(username)
    }

    /// All live sessions for one account.
    pub fn sessions_for(&self, username: &str) -> Vec<SessionHandle> {
        let inner = self.lock();
        match inner.by_name.get(username) {
            Some(ids) => ids
                .iter()
                .filter_map(|id| inner.sessions.get(id).cloned())
                .collect(),
            None => Vec::new(),
        }
    }

    /// All live sessions whose username appears in `names`.
    pub fn snapshot_members(&self, names: &[String]) -> Vec<SessionHandle> {
        let inner = self.lock();
        names
            .iter()
            .filter_map(|name| inner.by_name.get(name.as_str()))
            .flatten()
            .filter_map(|id| inner.sessions.get(id).cloned())
            .collect()
    }

    /// Every session except the given one.
    pub fn everyone_except(&self, id: SessionId) -> Vec<SessionHandle> {
        self.lock()
            .sessions
            .values()
            .filter(|handle| handle.id != id)
            .cloned()
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn handle(id: SessionId, username: &str) -> (SessionHandle, mpsc::UnboundedReceiver<Frame>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (
            SessionHandle {
                id,
                username: username.to_string(),
                addr: "127.0.0.1:9999".parse().unwrap(),
                outbound: tx,
            },
            rx,
        )
    }

    #[test]
    fn add_and_remove_keep_the_index_consistent() {
        let roster = Roster::new();
        let (alice, _rx) = handle(1, "alice");
        roster.add(alice);

        assert_eq!(roster.len(), 1);
        assert!(roster.is_online("alice"));
        assert_eq!(roster.sessions_for("alice").len(), 1);

        roster.remove(1);
        assert!(roster.is_empty());
        assert!(!roster.is_online("alice"));
        assert!(roster.sessions_for("alice").is_empty());
    }

    #[test]
    fn multiple_sessions_per_account_are_tolerated() {
        let roster = Roster::new();
        let (first, _rx1) = handle(1, "alice");
        let (second, _rx2) = handle(2, "alice");
        roster.add(first);
        roster.add(second);

        assert_eq!(roster.sessions_for("alice").len(), 2);

        roster.remove(1);
        assert!(roster.is_online("alice"));
        assert_eq!(roster.sessions_for("alice").len(), 1);
        assert_eq!(roster.sessions_for("alice")[0].id, 2);
    }

    #[test]
    fn snapshot_members_matches_by_username() {
        let roster = Roster::new();
        let (alice, _rx1) = handle(1, "alice");
        let (bob, _rx2) = handle(2, "bob");
        let (carol, _rx3) = handle(3, "carol");
        roster.add(alice);
        roster.add(bob);
        roster.add(carol);

        let members = roster.snapshot_members(&["alice".into(), "carol".into(), "dave".into()]);
        let mut names: Vec<_> = members.iter().map(|h| h.username.as_str()).collect();
        names.sort_unstable();
        assert_eq!(names, vec!["alice", "carol"]);
    }

    #[test]
    fn everyone_except_skips_one_session() {
        let roster = Roster::new();
        let (alice, _rx1) = handle(1, "alice");
        let (bob, _rx2) = handle(2, "bob");
        roster.add(alice);
        roster.add(bob);

        let others = roster.everyone_except(1);
        assert_eq!(others.len(), 1);
        assert_eq!(others[0].username, "bob");
    }

    #[test]
    fn removing_an_unknown_session_is_a_no_op() {
        let roster = Roster::new();
        assert!(roster.remove(42).is_none());
    }
}
