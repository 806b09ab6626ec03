//! Pre-chat authentication gate.
//!
//! Consumes frames until the connection is authenticated or dropped.
//! Register and login answer with a one-byte auth response; register
//! success also authenticates the fresh account. Change-password and
//! delete-account are served here without authenticating, since the
//! earliest clients use them before logging in. Anything else is
//! ignored during this phase.

use std::io;

use tokio::io::AsyncRead;
use tokio::sync::mpsc;
use tracing::debug;

use palaver_proto::{read_frame, Frame, FrameKind};

use crate::server::{store_flag, ServerState};

/// Drive the gate. Returns the authenticated username, or `None` when
/// the peer disconnected first.
pub async fn authenticate<R>(
    state: &ServerState,
    reader: &mut R,
    outbound: &mpsc::UnboundedSender<Frame>,
) -> io::Result<Option<String>>
where
    R: AsyncRead + Unpin,
{
    loop {
        let Some(frame) = read_frame(reader).await? else {
            return Ok(None);
        };

        match frame.kind() {
            Some(FrameKind::Register) => {
                let username = frame.username.trim().to_string();
                let ok = if username.is_empty() || frame.content.is_empty() {
                    false
                } else {
                    store_flag(state.store().add_user(&username, &frame.content), "register")
                };
                state.activity.record(&format!(
                    "register '{username}': {}",
                    if ok { "ok" } else { "failed" }
                ));
                let _ = outbound.send(Frame::auth_response(ok));
                if ok {
                    return Ok(Some(username));
                }
            }

            Some(FrameKind::Login) => {
                let username = frame.username.trim().to_string();
                let ok = store_flag(state.store().verify_user(&username, &frame.content), "login");
                state.activity.record(&format!(
                    "login '{username}': {}",
                    if ok { "ok" } else { "failed" }
                ));
                let _ = outbound.send(Frame::auth_response(ok));
                if ok {
                    return Ok(Some(username));
                }
            }

            Some(FrameKind::ChangePassword) => {
                let ok = store_flag(
                    state.store().change_password(&frame.username, &frame.content),
                    "change-password",
                );
                state.activity.record(&format!(
                    "change-password '{}': {}",
                    frame.username.trim(),
                    if ok { "ok" } else { "failed" }
                ));
                let _ = outbound.send(Frame::auth_response(ok));
            }

            Some(FrameKind::DeleteAccount) => {
                let ok = store_flag(state.store().delete_user(&frame.username), "delete-account");
                state.activity.record(&format!(
                    "delete-account '{}': {}",
                    frame.username.trim(),
                    if ok { "ok" } else { "failed" }
                ));
                let _ = outbound.send(Frame::auth_response(ok));
            }

            // Username-only join from the earliest client variant:
            // authenticates without a password check. Deprecated.
            Some(FrameKind::LegacyUsername) => {
                let username = frame.username.trim().to_string();
                if !username.is_empty() {
                    return Ok(Some(username));
                }
            }

            _ => {
                debug!(code = frame.code, "ignoring frame during auth phase");
            }
        }
    }
}
