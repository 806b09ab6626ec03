//! Per-connection session task.
//!
//! Each accepted connection gets one task. The socket is split: this
//! task owns the read half and reads strictly one frame at a time; a
//! writer task owns the write half and drains the session's outbound
//! channel, so responses and fanned-out frames reach the socket in
//! queue order without any lock held across I/O.

use std::net::SocketAddr;
use std::sync::Arc;

use tokio::io::AsyncRead;
use tokio::net::tcp::OwnedWriteHalf;
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tracing::{debug, info};

use palaver_proto::{read_frame, write_frame, Frame, FrameKind};

use crate::auth;
use crate::handlers::{self, Ctx};
use crate::roster::{SessionHandle, SessionId};
use crate::server::ServerState;

pub async fn run(state: Arc<ServerState>, stream: TcpStream, addr: SocketAddr, id: SessionId) {
    let (mut reader, writer) = stream.into_split();
    let (outbound, outbound_rx) = mpsc::unbounded_channel();
    let writer_task = tokio::spawn(write_loop(writer, outbound_rx));

    let username = match auth::authenticate(&state, &mut reader, &outbound).await {
        Ok(Some(username)) => username,
        Ok(None) => {
            debug!(%addr, "peer left during authentication");
            drop(outbound);
            let _ = writer_task.await;
            return;
        }
        Err(e) => {
            debug!(%addr, error = %e, "authentication phase aborted");
            drop(outbound);
            let _ = writer_task.await;
            return;
        }
    };

    state.roster.add(SessionHandle {
        id,
        username: username.clone(),
        addr,
        outbound: outbound.clone(),
    });
    info!(user = %username, %addr, total = state.roster.len(), "session joined");
    state.activity.record(&format!("'{username}' connected from {addr}"));

    if let Err(e) = dispatch(&state, &mut reader, &outbound, &username, id).await {
        debug!(user = %username, error = %e, "session ended on error");
    }

    state.roster.remove(id);
    info!(user = %username, total = state.roster.len(), "session left");
    state.activity.record(&format!("'{username}' disconnected"));

    // Closing the channel lets the writer task flush and exit.
    drop(outbound);
    let _ = writer_task.await;
}

async fn write_loop(mut writer: OwnedWriteHalf, mut rx: mpsc::UnboundedReceiver<Frame>) {
    while let Some(frame) = rx.recv().await {
        if let Err(e) = write_frame(&mut writer, &frame).await {
            debug!(error = %e, "outbound write failed, dropping remaining frames");
            break;
        }
    }
}

/// Post-auth request loop: read one frame, route it, repeat until the
/// peer disconnects. Unknown type codes are ignored without a
/// response, as are server-to-client codes arriving inbound.
async fn dispatch<R>(
    state: &ServerState,
    reader: &mut R,
    outbound: &mpsc::UnboundedSender<Frame>,
    username: &str,
    id: SessionId,
) -> std::io::Result<()>
where
    R: AsyncRead + Unpin,
{
    let ctx = Ctx {
        state,
        outbound,
        username,
        id,
    };

    loop {
        let Some(frame) = read_frame(reader).await? else {
            return Ok(());
        };
        let Some(kind) = frame.kind() else {
            debug!(code = frame.code, "ignoring unknown frame type");
            continue;
        };

        match kind {
            FrameKind::Text => handlers::broadcast_text(&ctx, &frame),
            FrameKind::Disconnect => return Ok(()),

            FrameKind::FriendRequest => handlers::friend_request(&ctx, &frame),
            FrameKind::FriendAccept => handlers::friend_accept(&ctx, &frame),
            FrameKind::FriendRefuse => handlers::friend_refuse(&ctx, &frame),
            FrameKind::FriendListRequest => handlers::friend_list(&ctx),
            FrameKind::FriendRemove => handlers::friend_remove(&ctx, &frame),
            FrameKind::AllUsersStatusRequest => handlers::all_users_status(&ctx),

            FrameKind::DirectMessage => handlers::direct_message(&ctx, &frame),
            FrameKind::HistoryRequest => handlers::history_request(&ctx, &frame),

            FrameKind::GroupCreate => handlers::group_create(&ctx, &frame),
            FrameKind::GroupAdd => handlers::group_add(&ctx, &frame),
            FrameKind::GroupRemove => handlers::group_remove(&ctx, &frame),
            FrameKind::GroupLeave => handlers::group_leave(&ctx, &frame),
            FrameKind::GroupMessage => handlers::group_message(&ctx, &frame),
            FrameKind::GroupHistoryRequest => handlers::group_history(&ctx, &frame),
            FrameKind::GroupMembersRequest => handlers::group_members(&ctx, &frame),
            FrameKind::GroupListRequest => handlers::group_list(&ctx),

            _ => {}
        }
    }
}
