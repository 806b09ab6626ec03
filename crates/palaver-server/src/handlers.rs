//! One handler per inbound frame kind.
//!
//! Handlers are synchronous: store access is a short critical section
//! behind the store mutex, and outbound frames are channel pushes. A
//! handler produces zero or one response frame; live delivery to other
//! sessions goes through [`fanout`] after the store guard is dropped.

use tokio::sync::mpsc;
use tracing::{debug, warn};

use palaver_proto::{Frame, FrameKind};

use crate::fanout;
use crate::history;
use crate::roster::SessionId;
use crate::server::{store_flag, ServerState};

/// How many rows a history request returns at most.
const HISTORY_LIMIT: u32 = 100;

pub struct Ctx<'a> {
    pub state: &'a ServerState,
    pub outbound: &'a mpsc::UnboundedSender<Frame>,
    pub username: &'a str,
    pub id: SessionId,
}

impl Ctx<'_> {
    fn send(&self, frame: Frame) {
        let _ = self.outbound.send(frame);
    }

    /// Membership gate for group-scoped requests. Non-members are
    /// ignored silently, without a response frame.
    fn require_member(&self, group: &str) -> bool {
        let member = store_flag(
            self.state.store().is_group_member(group, self.username),
            "membership check",
        );
        if !member {
            debug!(user = %self.username, group, "ignoring group request from non-member");
        }
        member
    }
}

/// Chat text for everyone else in the roster. Never persisted.
pub fn broadcast_text(ctx: &Ctx, frame: &Frame) {
    let out = Frame::new(FrameKind::Text, ctx.username, frame.content.clone());
    fanout::to_all_except(&ctx.state.roster, ctx.id, &out);
}

pub fn friend_request(ctx: &Ctx, frame: &Frame) {
    let target = frame.content.trim();
    let ok = store_flag(
        ctx.state.store().send_friend_request(ctx.username, target),
        "friend-request",
    );
    ctx.state.activity.record(&format!(
        "friend request '{}' -> '{target}': {}",
        ctx.username,
        if ok { "ok" } else { "failed" }
    ));
    ctx.send(Frame::auth_response(ok));
}

pub fn friend_accept(ctx: &Ctx, frame: &Frame) {
    let requester = frame.content.trim();
    let ok = store_flag(
        ctx.state.store().accept_friend_request(requester, ctx.username),
        "friend-accept",
    );
    ctx.state.activity.record(&format!(
        "friend accept '{}' of '{requester}': {}",
        ctx.username,
        if ok { "ok" } else { "failed" }
    ));
    ctx.send(Frame::auth_response(ok));
}

pub fn friend_refuse(ctx: &Ctx, frame: &Frame) {
    let requester = frame.content.trim();
    let ok = store_flag(
        ctx.state.store().refuse_friend_request(requester, ctx.username),
        "friend-refuse",
    );
    ctx.state.activity.record(&format!(
        "friend refuse '{}' of '{requester}': {}",
        ctx.username,
        if ok { "ok" } else { "failed" }
    ));
    ctx.send(Frame::auth_response(ok));
}

pub fn friend_remove(ctx: &Ctx, frame: &Frame) {
    let target = frame.content.trim();
    let ok = store_flag(
        ctx.state.store().remove_friend(ctx.username, target),
        "friend-remove",
    );
    ctx.state.activity.record(&format!(
        "unfriend '{}' and '{target}': {}",
        ctx.username,
        if ok { "ok" } else { "failed" }
    ));
    ctx.send(Frame::auth_response(ok));
}

/// `Friends: name: status, online, ...` — the store snapshot is taken
/// first and its lock released before the roster is consulted for the
/// online annotation.
pub fn friend_list(ctx: &Ctx) {
    let entries = match ctx.state.store().list_friends(ctx.username) {
        Ok(entries) => entries,
        Err(e) => {
            warn!(error = %e, "store operation failed");
            Vec::new()
        }
    };

    let rendered: Vec<String> = entries
        .iter()
        .map(|entry| {
            let presence = if ctx.state.roster.is_online(&entry.name) {
                "online"
            } else {
                "offline"
            };
            format!("{}: {}, {}", entry.name, entry.state.label(), presence)
        })
        .collect();

    let content = format!("Friends: {}", rendered.join(", "));
    ctx.send(Frame::new(FrameKind::FriendListResponse, "Server", content));
}

/// `Users and status:` with one `- name: status` line per account,
/// alphabetical.
pub fn all_users_status(ctx: &Ctx) {
    let listing = match ctx.state.store().list_users_with_status(ctx.username) {
        Ok(listing) => listing,
        Err(e) => {
            warn!(error = %e, "store operation failed");
            Vec::new()
        }
    };

    let mut content = String::from("Users and status:\n");
    for (name, status) in listing {
        content.push_str(&format!("- {}: {}\n", name, status.label()));
    }
    ctx.send(Frame::new(
        FrameKind::AllUsersStatusResponse,
        "Server",
        content,
    ));
}

/// Persist, then deliver live to the receiver's sessions if any. No
/// response frame to the sender either way.
pub fn direct_message(ctx: &Ctx, frame: &Frame) {
    let receiver = frame.username.trim().to_string();
    let body = frame.content.clone();

    let saved = ctx.state.store().save_message(ctx.username, &receiver, &body);
    if let Err(e) = saved {
        warn!(error = %e, op = "direct-message", "store operation failed");
        ctx.state.activity.record(&format!(
            "direct message '{}' -> '{receiver}': store failed",
            ctx.username
        ));
        return;
    }

    let online = ctx.state.roster.is_online(&receiver);
    if online {
        let out = Frame::new(FrameKind::Text, ctx.username, body);
        fanout::to_users(&ctx.state.roster, &[receiver.clone()], Some(ctx.username), &out);
    }
    ctx.state.activity.record(&format!(
        "direct message '{}' -> '{receiver}': {}",
        ctx.username,
        if online { "delivered" } else { "stored" }
    ));
}

pub fn history_request(ctx: &Ctx, frame: &Frame) {
    let peer = frame.username.trim();
    let messages = match ctx
        .state
        .store()
        .conversation_history(ctx.username, peer, HISTORY_LIMIT)
    {
        Ok(messages) => messages,
        Err(e) => {
            warn!(error = %e, "store operation failed");
            Vec::new()
        }
    };

    let content = history::render(
        messages
            .iter()
            .map(|m| (m.timestamp, m.sender.as_str(), m.body.as_str())),
    );
    ctx.send(Frame::new(FrameKind::HistoryResponse, "Server", content));
}

pub fn group_create(ctx: &Ctx, frame: &Frame) {
    let name = frame.content.trim();
    let ok = store_flag(ctx.state.store().create_group(name, ctx.username), "group-create");
    ctx.state.activity.record(&format!(
        "group create '{name}' by '{}': {}",
        ctx.username,
        if ok { "ok" } else { "failed" }
    ));
    ctx.send(Frame::group_create_response(ok));
}

/// Any current member may add; the stored owner is not consulted.
/// The target must be a real account.
pub fn group_add(ctx: &Ctx, frame: &Frame) {
    let group = frame.username.trim();
    let target = frame.content.trim();
    if !ctx.require_member(group) {
        return;
    }

    let ok = {
        let store = ctx.state.store();
        match store.user_exists(target) {
            Ok(true) => store_flag(store.add_group_member(group, target), "group-add"),
            Ok(false) => false,
            Err(e) => {
                warn!(error = %e, op = "group-add", "store operation failed");
                false
            }
        }
    };
    ctx.state.activity.record(&format!(
        "group add '{target}' to '{group}' by '{}': {}",
        ctx.username,
        if ok { "ok" } else { "failed" }
    ));
    ctx.send(Frame::auth_response(ok));
}

pub fn group_remove(ctx: &Ctx, frame: &Frame) {
    let group = frame.username.trim();
    let target = frame.content.trim();
    if !ctx.require_member(group) {
        return;
    }

    let ok = store_flag(ctx.state.store().remove_group_member(group, target), "group-remove");
    ctx.state.activity.record(&format!(
        "group remove '{target}' from '{group}' by '{}': {}",
        ctx.username,
        if ok { "ok" } else { "failed" }
    ));
    ctx.send(Frame::auth_response(ok));
}

pub fn group_leave(ctx: &Ctx, frame: &Frame) {
    let group = frame.content.trim();
    let ok = store_flag(
        ctx.state.store().remove_group_member(group, ctx.username),
        "group-leave",
    );
    ctx.state.activity.record(&format!(
        "group leave '{group}' by '{}': {}",
        ctx.username,
        if ok { "ok" } else { "failed" }
    ));
    ctx.send(Frame::auth_response(ok));
}

/// Persist, then push a group-text frame to every other online
/// member. The member snapshot is taken under the store lock, which
/// is released before the roster is touched.
pub fn group_message(ctx: &Ctx, frame: &Frame) {
    let group = frame.username.trim().to_string();
    let body = frame.content.clone();
    if !ctx.require_member(&group) {
        return;
    }

    let members = {
        let store = ctx.state.store();
        if let Err(e) = store.save_group_message(&group, ctx.username, &body) {
            warn!(error = %e, op = "group-message", "store operation failed");
            ctx.state.activity.record(&format!(
                "group message '{}' in '{group}': store failed",
                ctx.username
            ));
            return;
        }
        match store.group_members(&group) {
            Ok(members) => members,
            Err(e) => {
                warn!(error = %e, "store operation failed");
                Vec::new()
            }
        }
    };

    let out = Frame::new(
        FrameKind::GroupText,
        group.as_str(),
        format!("{}: {}", ctx.username, body),
    );
    fanout::to_users(&ctx.state.roster, &members, Some(ctx.username), &out);
    ctx.state
        .activity
        .record(&format!("group message '{}' in '{group}'", ctx.username));
}

pub fn group_history(ctx: &Ctx, frame: &Frame) {
    let group = frame.username.trim();
    if !ctx.require_member(group) {
        return;
    }

    let messages = match ctx.state.store().group_history(group, HISTORY_LIMIT) {
        Ok(messages) => messages,
        Err(e) => {
            warn!(error = %e, "store operation failed");
            Vec::new()
        }
    };

    let content = history::render(
        messages
            .iter()
            .map(|m| (m.timestamp, m.sender.as_str(), m.body.as_str())),
    );
    ctx.send(Frame::new(FrameKind::GroupHistoryResponse, "Server", content));
}

pub fn group_members(ctx: &Ctx, frame: &Frame) {
    let group = frame.username.trim();
    if !ctx.require_member(group) {
        return;
    }

    let members = match ctx.state.store().group_members(group) {
        Ok(members) => members,
        Err(e) => {
            warn!(error = %e, "store operation failed");
            Vec::new()
        }
    };
    ctx.send(Frame::new(
        FrameKind::GroupMembersResponse,
        "Server",
        members.join(", "),
    ));
}

pub fn group_list(ctx: &Ctx) {
    let groups = match ctx.state.store().groups_for_user(ctx.username) {
        Ok(groups) => groups,
        Err(e) => {
            warn!(error = %e, "store operation failed");
            Vec::new()
        }
    };
    ctx.send(Frame::new(
        FrameKind::GroupListResponse,
        "Server",
        groups.join(", "),
    ));
}
