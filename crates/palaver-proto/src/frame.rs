//! Fixed-size binary frame layout.
//!
//! Frame format (4132 bytes, no delimiter, no length prefix):
//! ```text
//! +-----------+------------------+--------------------+
//! | type code | username         | content            |
//! | (i32,     | (32 bytes,       | (4096 bytes,       |
//! |  host BO) |  NUL-padded)     |  NUL-padded)       |
//! +-----------+------------------+--------------------+
//! ```
//!
//! The layout is byte-identical to the `struct Message` the existing
//! clients read and write, so readers always consume exactly
//! [`FRAME_LEN`] bytes before interpreting anything. Text fields are
//! truncated to capacity minus one on encode and read up to the first
//! NUL on decode.

/// Capacity of the fixed username field in bytes.
pub const USERNAME_CAP: usize = 32;

/// Capacity of the fixed content field in bytes.
pub const CONTENT_CAP: usize = 4096;

/// Exact on-wire size of one record.
pub const FRAME_LEN: usize = 4 + USERNAME_CAP + CONTENT_CAP;

/// Frame type codes as they appear on the wire.
#[repr(i32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FrameKind {
    /// Chat text pushed to a client; also the legacy inbound broadcast.
    Text = 1,
    /// Username-only join from the earliest client variant. Deprecated.
    LegacyUsername = 2,
    Disconnect = 3,
    /// Connected-users listing from the earliest server variant.
    UserList = 4,

    Register = 10,
    Login = 11,
    /// `content[0]` is 1 for success, 0 for failure.
    AuthResponse = 12,
    ChangePassword = 13,
    DeleteAccount = 14,

    FriendRequest = 20,
    FriendAccept = 21,
    FriendRefuse = 22,
    FriendListRequest = 23,
    FriendListResponse = 24,
    FriendRemove = 25,
    AllUsersStatusRequest = 26,
    AllUsersStatusResponse = 27,
    DirectMessage = 28,
    HistoryRequest = 29,
    HistoryResponse = 30,

    GroupCreate = 40,
    GroupCreateResponse = 41,
    GroupAdd = 42,
    GroupRemove = 43,
    GroupLeave = 44,
    GroupMessage = 45,
    GroupText = 46,
    GroupHistoryRequest = 47,
    GroupHistoryResponse = 48,
    GroupListRequest = 49,
    GroupListResponse = 50,
    GroupMembersRequest = 51,
    GroupMembersResponse = 52,
}

impl FrameKind {
    /// Convert from a raw wire code, returning `None` for unknown codes.
    pub fn from_i32(value: i32) -> Option<Self> {
        match value {
            1 => Some(FrameKind::Text),
            2 => Some(FrameKind::LegacyUsername),
            3 => Some(FrameKind::Disconnect),
            4 => Some(FrameKind::UserList),

            10 => Some(FrameKind::Register),
            11 => Some(FrameKind::Login),
            12 => Some(FrameKind::AuthResponse),
            13 => Some(FrameKind::ChangePassword),
            14 => Some(FrameKind::DeleteAccount),

            20 => Some(FrameKind::FriendRequest),
            21 => Some(FrameKind::FriendAccept),
            22 => Some(FrameKind::FriendRefuse),
            23 => Some(FrameKind::FriendListRequest),
            24 => Some(FrameKind::FriendListResponse),
            25 => Some(FrameKind::FriendRemove),
            26 => Some(FrameKind::AllUsersStatusRequest),
            27 => Some(FrameKind::AllUsersStatusResponse),
            28 => Some(FrameKind::DirectMessage),
            29 => Some(FrameKind::HistoryRequest),
            30 => Some(FrameKind::HistoryResponse),

            40 => Some(FrameKind::GroupCreate),
            41 => Some(FrameKind::GroupCreateResponse),
            42 => Some(FrameKind::GroupAdd),
            43 => Some(FrameKind::GroupRemove),
            44 => Some(FrameKind::GroupLeave),
            45 => Some(FrameKind::GroupMessage),
            46 => Some(FrameKind::GroupText),
            47 => Some(FrameKind::GroupHistoryRequest),
            48 => Some(FrameKind::GroupHistoryResponse),
            49 => Some(FrameKind::GroupListRequest),
            50 => Some(FrameKind::GroupListResponse),
            51 => Some(FrameKind::GroupMembersRequest),
            52 => Some(FrameKind::GroupMembersResponse),

            _ => None,
        }
    }
}

/// One protocol record.
///
/// `code` is kept raw so a frame with an unknown type code survives
/// decoding; the dispatcher decides what to do with it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub code: i32,
    pub username: String,
    pub content: String,
}

impl Frame {
    pub fn new(
        kind: FrameKind,
        username: impl Into<String>,
        content: impl Into<String>,
    ) -> Self {
        Self {
            code: kind as i32,
            username: username.into(),
            content: content.into(),
        }
    }

    /// Auth response frame: `content[0]` carries the success byte.
    ///
    /// Failure encodes as an all-NUL content field, exactly as the
    /// original zero-initialized record did.
    pub fn auth_response(ok: bool) -> Self {
        let content = if ok { "\u{1}".to_string() } else { String::new() };
        Self::new(FrameKind::AuthResponse, "Server", content)
    }

    /// Group-create response, same success-byte convention.
    pub fn group_create_response(ok: bool) -> Self {
        let content = if ok { "\u{1}".to_string() } else { String::new() };
        Self::new(FrameKind::GroupCreateResponse, "Server", content)
    }

    /// The decoded frame kind, `None` when the code is unknown.
    pub fn kind(&self) -> Option<FrameKind> {
        FrameKind::from_i32(self.code)
    }

    /// True when the success byte of a response frame is set.
    pub fn success(&self) -> bool {
        self.content.as_bytes().first().copied() == Some(1)
    }

    /// Encode into exactly [`FRAME_LEN`] bytes.
    pub fn encode(&self) -> [u8; FRAME_LEN] {
        let mut buf = [0u8; FRAME_LEN];
        buf[..4].copy_from_slice(&self.code.to_ne_bytes());
        write_padded(&mut buf[4..4 + USERNAME_CAP], self.username.as_bytes());
        write_padded(&mut buf[4 + USERNAME_CAP..], self.content.as_bytes());
        buf
    }

    /// Decode from exactly [`FRAME_LEN`] bytes.
    pub fn decode(buf: &[u8; FRAME_LEN]) -> Self {
        let code = i32::from_ne_bytes([buf[0], buf[1], buf[2], buf[3]]);
        let username = read_padded(&buf[4..4 + USERNAME_CAP]);
        let content = read_padded(&buf[4 + USERNAME_CAP..]);
        Self {
            code,
            username,
            content,
        }
    }
}

/// Copy `src` into `dst` truncated to `dst.len() - 1`; the rest stays NUL.
fn write_padded(dst: &mut [u8], src: &[u8]) {
    let n = src.len().min(dst.len() - 1);
    dst[..n].copy_from_slice(&src[..n]);
}

/// Read up to the first NUL, lossy on invalid UTF-8.
fn read_padded(src: &[u8]) -> String {
    let end = src.iter().position(|&b| b == 0).unwrap_or(src.len());
    String::from_utf8_lossy(&src[..end]).into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frame_len_matches_original_record() {
        assert_eq!(FRAME_LEN, 4132);
    }

    #[test]
    fn kind_roundtrip() {
        let kinds = [
            FrameKind::Text,
            FrameKind::Disconnect,
            FrameKind::Register,
            FrameKind::AuthResponse,
            FrameKind::FriendRequest,
            FrameKind::DirectMessage,
            FrameKind::GroupCreate,
            FrameKind::GroupText,
            FrameKind::GroupMembersResponse,
        ];
        for kind in kinds {
            assert_eq!(FrameKind::from_i32(kind as i32), Some(kind));
        }
        assert_eq!(FrameKind::from_i32(0), None);
        assert_eq!(FrameKind::from_i32(99), None);
    }

    #[test]
    fn encode_decode_roundtrip() {
        let frame = Frame::new(FrameKind::DirectMessage, "bob", "hello there");
        let decoded = Frame::decode(&frame.encode());
        assert_eq!(frame, decoded);
    }

    #[test]
    fn unknown_code_survives_decode() {
        let frame = Frame {
            code: 99,
            username: "x".into(),
            content: "y".into(),
        };
        let decoded = Frame::decode(&frame.encode());
        assert_eq!(decoded.code, 99);
        assert_eq!(decoded.kind(), None);
    }

    #[test]
    fn text_fields_truncate_to_capacity_minus_one() {
        let long_name = "n".repeat(100);
        let long_body = "b".repeat(CONTENT_CAP + 50);
        let frame = Frame::new(FrameKind::Text, long_name, long_body);
        let decoded = Frame::decode(&frame.encode());
        assert_eq!(decoded.username.len(), USERNAME_CAP - 1);
        assert_eq!(decoded.content.len(), CONTENT_CAP - 1);
    }

    #[test]
    fn auth_response_success_byte() {
        let ok = Frame::auth_response(true);
        let fail = Frame::auth_response(false);
        assert_eq!(ok.encode()[4 + USERNAME_CAP], 1);
        assert_eq!(fail.encode()[4 + USERNAME_CAP], 0);
        assert!(Frame::decode(&ok.encode()).success());
        assert!(!Frame::decode(&fail.encode()).success());
    }

    #[test]
    fn username_field_is_nul_terminated() {
        let frame = Frame::new(FrameKind::Login, "alice", "pw");
        let bytes = frame.encode();
        assert_eq!(&bytes[4..9], b"alice");
        assert_eq!(bytes[9], 0);
    }
}
