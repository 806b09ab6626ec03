//! Frame I/O over a stream socket.
//!
//! There is no framing delimiter: a reader always consumes one full
//! record before interpreting it. A zero-length read on a record
//! boundary is a clean disconnect; running dry in the middle of a
//! record is fatal for the session.

use std::io;

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::frame::{Frame, FRAME_LEN};

/// Read one full frame.
///
/// Returns `Ok(None)` when the peer closed the connection cleanly
/// between frames. A short read inside a frame yields
/// [`io::ErrorKind::UnexpectedEof`].
pub async fn read_frame<R>(reader: &mut R) -> io::Result<Option<Frame>>
where
    R: AsyncRead + Unpin,
{
    let mut buf = [0u8; FRAME_LEN];
    let mut filled = 0;
    while filled < FRAME_LEN {
        let n = reader.read(&mut buf[filled..]).await?;
        if n == 0 {
            if filled == 0 {
                return Ok(None);
            }
            return Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                "connection closed mid-frame",
            ));
        }
        filled += n;
    }
    Ok(Some(Frame::decode(&buf)))
}

/// Write one full frame.
pub async fn write_frame<W>(writer: &mut W, frame: &Frame) -> io::Result<()>
where
    W: AsyncWrite + Unpin,
{
    writer.write_all(&frame.encode()).await
}
