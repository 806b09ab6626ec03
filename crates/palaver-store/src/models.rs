//! Typed rows returned by the store.

/// A persisted direct message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirectMessage {
    pub id: i64,
    pub sender: String,
    pub receiver: String,
    pub body: String,
    /// Seconds since epoch at insertion.
    pub timestamp: i64,
}

/// A persisted group message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupMessage {
    pub id: i64,
    pub group: String,
    pub sender: String,
    pub body: String,
    pub timestamp: i64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Group {
    pub name: String,
    pub owner: String,
}

/// State of one entry in a user's friend list, from that user's
/// perspective.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FriendState {
    Accepted,
    /// Our own unanswered request.
    Outgoing,
    /// Someone else's unanswered request to us.
    Incoming,
}

impl FriendState {
    /// Label used on the wire. Incoming requests show as `pending`,
    /// matching what the clients display.
    pub fn label(self) -> &'static str {
        match self {
            FriendState::Accepted => "accepted",
            FriendState::Outgoing => "outgoing",
            FriendState::Incoming => "pending",
        }
    }
}

/// One line of a friend-list snapshot. Online state is annotated by
/// the caller from the session roster, never by the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FriendEntry {
    pub name: String,
    pub state: FriendState,
}

/// Relationship between a viewer and another account, probing both
/// edge directions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FriendStatus {
    /// Viewer and other are the same account.
    Me,
    Friend,
    Outgoing,
    Incoming,
    None,
}

impl FriendStatus {
    pub fn label(self) -> &'static str {
        match self {
            FriendStatus::Me => "self",
            FriendStatus::Friend => "friend",
            FriendStatus::Outgoing => "outgoing",
            FriendStatus::Incoming => "incoming",
            FriendStatus::None => "none",
        }
    }
}
