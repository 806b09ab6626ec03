//! End-to-end tests against a live listener on an ephemeral port.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tempfile::TempDir;
use tokio::net::TcpStream;
use tokio::time::timeout;

use palaver_proto::{read_frame, write_frame, Frame, FrameKind};
use palaver_server::{server, ServerConfig, ServerState};

const RECV_TIMEOUT: Duration = Duration::from_secs(5);

async fn start_server(max_sessions: usize) -> (SocketAddr, Arc<ServerState>, TempDir) {
    let dir = tempfile::tempdir().unwrap();
    let config = ServerConfig {
        port: 0,
        max_sessions,
        db_path: dir.path().join("test.db"),
        log_path: dir.path().join("test.log"),
    };
    let state = ServerState::new(config).unwrap();
    let listener = server::bind(&state.config).unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(server::serve(Arc::clone(&state), listener));
    (addr, state, dir)
}

struct Client {
    stream: TcpStream,
}

impl Client {
    async fn connect(addr: SocketAddr) -> Self {
        Self {
            stream: TcpStream::connect(addr).await.unwrap(),
        }
    }

    async fn send(&mut self, kind: FrameKind, username: &str, content: &str) {
        write_frame(&mut self.stream, &Frame::new(kind, username, content))
            .await
            .unwrap();
    }

    async fn recv(&mut self) -> Frame {
        timeout(RECV_TIMEOUT, read_frame(&mut self.stream))
            .await
            .expect("timed out waiting for a frame")
            .unwrap()
            .expect("connection closed unexpectedly")
    }

    async fn recv_eof(&mut self) -> bool {
        timeout(RECV_TIMEOUT, read_frame(&mut self.stream))
            .await
            .expect("timed out waiting for EOF")
            .map(|frame| frame.is_none())
            .unwrap_or(true)
    }

    /// Round-trip a friend-list request. Because requests are handled
    /// strictly in order, a response guarantees the session has joined
    /// the roster and every earlier request has been processed.
    async fn sync(&mut self) -> Frame {
        self.send(FrameKind::FriendListRequest, "", "").await;
        let resp = self.recv().await;
        assert_eq!(resp.kind(), Some(FrameKind::FriendListResponse));
        resp
    }

    async fn register(addr: SocketAddr, name: &str, password: &str) -> Self {
        let mut client = Self::connect(addr).await;
        client.send(FrameKind::Register, name, password).await;
        let resp = client.recv().await;
        assert_eq!(resp.kind(), Some(FrameKind::AuthResponse));
        assert!(resp.success(), "registration of '{name}' failed");
        client.sync().await;
        client
    }

    async fn login(addr: SocketAddr, name: &str, password: &str) -> Self {
        let mut client = Self::connect(addr).await;
        client.send(FrameKind::Login, name, password).await;
        let resp = client.recv().await;
        assert_eq!(resp.kind(), Some(FrameKind::AuthResponse));
        assert!(resp.success(), "login of '{name}' failed");
        client.sync().await;
        client
    }
}

#[tokio::test]
async fn registration_then_login() {
    let (addr, _state, _dir) = start_server(10).await;

    let mut first = Client::connect(addr).await;
    first.send(FrameKind::Register, "alice", "pw").await;
    let resp = first.recv().await;
    assert_eq!(resp.kind(), Some(FrameKind::AuthResponse));
    assert!(resp.success());
    drop(first);

    let mut second = Client::connect(addr).await;
    second.send(FrameKind::Login, "alice", "pw").await;
    assert!(second.recv().await.success());
}

#[tokio::test]
async fn bad_credentials_keep_the_auth_phase_open() {
    let (addr, _state, _dir) = start_server(10).await;
    let _alice = Client::register(addr, "alice", "pw").await;

    let mut client = Client::connect(addr).await;
    client.send(FrameKind::Register, "alice", "other").await;
    assert!(!client.recv().await.success(), "duplicate registration must fail");

    client.send(FrameKind::Login, "alice", "wrong").await;
    assert!(!client.recv().await.success());

    // Still in the auth phase: a correct login succeeds on the same
    // connection.
    client.send(FrameKind::Login, "alice", "pw").await;
    assert!(client.recv().await.success());
}

#[tokio::test]
async fn change_password_before_login() {
    let (addr, _state, _dir) = start_server(10).await;
    drop(Client::register(addr, "alice", "old").await);

    let mut client = Client::connect(addr).await;
    client.send(FrameKind::ChangePassword, "alice", "new").await;
    assert!(client.recv().await.success());

    client.send(FrameKind::Login, "alice", "old").await;
    assert!(!client.recv().await.success());
    client.send(FrameKind::Login, "alice", "new").await;
    assert!(client.recv().await.success());
}

#[tokio::test]
async fn legacy_username_frame_authenticates_without_password() {
    let (addr, _state, _dir) = start_server(10).await;

    let mut client = Client::connect(addr).await;
    client.send(FrameKind::LegacyUsername, "drifter", "").await;
    // No auth response for the legacy join; the next round-trip shows
    // the session is live.
    client.sync().await;
}

#[tokio::test]
async fn friendship_handshake() {
    let (addr, _state, _dir) = start_server(10).await;
    let mut alice = Client::register(addr, "alice", "pw").await;

    alice.send(FrameKind::FriendRequest, "", "bob").await;
    assert!(alice.recv().await.success());

    let mut bob = Client::register(addr, "bob", "pw").await;
    let listing = bob.sync().await;
    assert!(
        listing.content.starts_with("Friends: alice: pending, online"),
        "unexpected friend list: {}",
        listing.content
    );

    bob.send(FrameKind::FriendAccept, "", "alice").await;
    assert!(bob.recv().await.success());

    let alice_listing = alice.sync().await;
    assert!(alice_listing.content.contains("bob: accepted, online"));
    let bob_listing = bob.sync().await;
    assert!(bob_listing.content.contains("alice: accepted, online"));
}

#[tokio::test]
async fn accepting_a_request_that_was_never_sent_fails() {
    let (addr, _state, _dir) = start_server(10).await;
    let mut alice = Client::register(addr, "alice", "pw").await;

    alice.send(FrameKind::FriendAccept, "", "bob").await;
    assert!(!alice.recv().await.success());
}

#[tokio::test]
async fn direct_message_persists_and_delivers_live() {
    let (addr, _state, _dir) = start_server(10).await;
    let mut alice = Client::register(addr, "alice", "pw").await;
    let mut bob = Client::register(addr, "bob", "pw").await;

    alice.send(FrameKind::DirectMessage, "bob", "hello").await;

    let delivered = bob.recv().await;
    assert_eq!(delivered.kind(), Some(FrameKind::Text));
    assert_eq!(delivered.username, "alice");
    assert_eq!(delivered.content, "hello");

    bob.send(FrameKind::HistoryRequest, "alice", "").await;
    let history = bob.recv().await;
    assert_eq!(history.kind(), Some(FrameKind::HistoryResponse));
    assert!(history.content.ends_with("alice: hello\n"));
}

#[tokio::test]
async fn direct_message_to_offline_recipient_waits_in_history() {
    let (addr, _state, _dir) = start_server(10).await;
    drop(Client::register(addr, "charlie", "pw").await);

    let mut alice = Client::register(addr, "alice", "pw").await;
    alice.send(FrameKind::DirectMessage, "charlie", "hello").await;
    // Round-trip to make sure the message was handled before charlie
    // returns.
    alice.sync().await;

    let mut charlie = Client::login(addr, "charlie", "pw").await;
    charlie.send(FrameKind::HistoryRequest, "alice", "").await;
    let history = charlie.recv().await;
    assert_eq!(history.kind(), Some(FrameKind::HistoryResponse));
    assert!(history.content.contains("alice: hello"));
}

#[tokio::test]
async fn group_create_and_broadcast() {
    let (addr, _state, _dir) = start_server(10).await;
    let mut alice = Client::register(addr, "alice", "pw").await;
    let mut bob = Client::register(addr, "bob", "pw").await;
    let mut charlie = Client::register(addr, "charlie", "pw").await;

    alice.send(FrameKind::GroupCreate, "", "team").await;
    let created = alice.recv().await;
    assert_eq!(created.kind(), Some(FrameKind::GroupCreateResponse));
    assert!(created.success());

    alice.send(FrameKind::GroupAdd, "team", "bob").await;
    assert!(alice.recv().await.success());

    alice.send(FrameKind::GroupMessage, "team", "hi all").await;

    let delivered = bob.recv().await;
    assert_eq!(delivered.kind(), Some(FrameKind::GroupText));
    assert_eq!(delivered.username, "team");
    assert_eq!(delivered.content, "alice: hi all");

    // Charlie is no member: nothing was queued for him, so the next
    // frame he sees is the response to his own request.
    charlie.sync().await;

    for member in [&mut alice, &mut bob] {
        member.send(FrameKind::GroupHistoryRequest, "team", "").await;
        let history = member.recv().await;
        assert_eq!(history.kind(), Some(FrameKind::GroupHistoryResponse));
        assert!(history.content.contains("alice: hi all"));
    }
}

#[tokio::test]
async fn group_requests_from_non_members_are_ignored() {
    let (addr, _state, _dir) = start_server(10).await;
    let mut alice = Client::register(addr, "alice", "pw").await;
    let mut mallory = Client::register(addr, "mallory", "pw").await;

    alice.send(FrameKind::GroupCreate, "", "team").await;
    assert!(alice.recv().await.success());

    // No response frame at all: the following sync round-trip gets the
    // friend-list response as its next frame.
    mallory.send(FrameKind::GroupMessage, "team", "let me in").await;
    mallory.send(FrameKind::GroupAdd, "team", "mallory").await;
    mallory.sync().await;

    alice.send(FrameKind::GroupMembersRequest, "team", "").await;
    let members = alice.recv().await;
    assert_eq!(members.kind(), Some(FrameKind::GroupMembersResponse));
    assert_eq!(members.content, "alice");
}

#[tokio::test]
async fn group_listings_and_leave() {
    let (addr, _state, _dir) = start_server(10).await;
    let mut alice = Client::register(addr, "alice", "pw").await;

    for name in ["zeta", "alpha"] {
        alice.send(FrameKind::GroupCreate, "", name).await;
        assert!(alice.recv().await.success());
    }

    alice.send(FrameKind::GroupListRequest, "", "").await;
    let listing = alice.recv().await;
    assert_eq!(listing.kind(), Some(FrameKind::GroupListResponse));
    assert_eq!(listing.content, "alpha, zeta");

    alice.send(FrameKind::GroupLeave, "", "zeta").await;
    assert!(alice.recv().await.success());

    alice.send(FrameKind::GroupListRequest, "", "").await;
    assert_eq!(alice.recv().await.content, "alpha");
}

#[tokio::test]
async fn unknown_frame_types_are_ignored() {
    let (addr, _state, _dir) = start_server(10).await;
    let mut alice = Client::register(addr, "alice", "pw").await;

    write_frame(
        &mut alice.stream,
        &Frame {
            code: 99,
            username: "alice".into(),
            content: "???".into(),
        },
    )
    .await
    .unwrap();

    // The session survives and keeps answering.
    alice.sync().await;
}

#[tokio::test]
async fn admission_cap_closes_the_connection_without_a_frame() {
    let (addr, _state, _dir) = start_server(1).await;
    let _alice = Client::register(addr, "alice", "pw").await;

    let mut rejected = Client::connect(addr).await;
    assert!(rejected.recv_eof().await, "expected immediate EOF");
}

#[tokio::test]
async fn all_users_listing_is_alphabetical_with_statuses() {
    let (addr, _state, _dir) = start_server(10).await;
    drop(Client::register(addr, "bob", "pw").await);

    let mut alice = Client::register(addr, "alice", "pw").await;
    alice.send(FrameKind::FriendRequest, "", "bob").await;
    assert!(alice.recv().await.success());

    alice.send(FrameKind::AllUsersStatusRequest, "", "").await;
    let listing = alice.recv().await;
    assert_eq!(listing.kind(), Some(FrameKind::AllUsersStatusResponse));
    assert_eq!(
        listing.content,
        "Users and status:\n- alice: self\n- bob: outgoing\n"
    );
}

#[tokio::test]
async fn disconnect_frame_leaves_the_roster() {
    let (addr, state, _dir) = start_server(10).await;
    let mut alice = Client::register(addr, "alice", "pw").await;
    assert_eq!(state.roster.len(), 1);

    alice.send(FrameKind::Disconnect, "", "").await;
    assert!(alice.recv_eof().await);

    // The session task tears down shortly after the frame is handled.
    for _ in 0..50 {
        if state.roster.is_empty() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("session was not removed from the roster");
}
