//! Wire protocol shared by the palaver server and its clients.
//!
//! The protocol predates this implementation: every message on the wire
//! is one fixed-size record (see [`frame`]), and the byte layout is a
//! compatibility contract with clients that cannot be rewritten.

pub mod frame;
pub mod wire;

pub use frame::{Frame, FrameKind, CONTENT_CAP, FRAME_LEN, USERNAME_CAP};
pub use wire::{read_frame, write_frame};
