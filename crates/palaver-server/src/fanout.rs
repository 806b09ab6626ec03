//! Best-effort delivery of prepared frames to online sessions.
//!
//! Offline recipients are simply absent from the roster snapshot;
//! they catch up through history. A failed channel send means the
//! target session is already tearing itself down, so it is ignored.

use palaver_proto::Frame;

use crate::roster::{Roster, SessionId};

/// Push one copy of `frame` to every live session of every name in
/// `targets`, skipping all sessions of `exclude_user`.
pub fn to_users(roster: &Roster, targets: &[String], exclude_user: Option<&str>, frame: &Frame) {
    for handle in roster.snapshot_members(targets) {
        if exclude_user == Some(handle.username.as_str()) {
            continue;
        }
        let _ = handle.outbound.send(frame.clone());
    }
}

/// Push one copy of `frame` to every session except `exclude`.
pub fn to_all_except(roster: &Roster, exclude: SessionId, frame: &Frame) {
    for handle in roster.everyone_except(exclude) {
        let _ = handle.outbound.send(frame.clone());
    }
}
