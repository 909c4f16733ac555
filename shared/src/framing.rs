//! Length-prefixed framing for the TCP stream
//!
//! Every message travels as a 4-byte big-endian payload length followed by
//! the payload itself. TCP may split or coalesce writes, so a reader must
//! never assume one `read` returns one message.
//!
//! Two limits apply. Identity and state-update frames are small and capped
//! at [`MAX_FRAME_LEN`]. Snapshots grow with the number of sessions and are
//! capped at [`MAX_SNAPSHOT_LEN`]; a server must not admit more sessions than
//! [`MAX_SUPPORTED_SESSIONS`], or its worst-case snapshot would not fit.

use crate::ProtocolError;
use std::io;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

/// Largest identity or state-update payload either side accepts
pub const MAX_FRAME_LEN: usize = 1024;

/// Largest snapshot payload a client accepts
pub const MAX_SNAPSHOT_LEN: usize = 16 * 1024 * 1024;

/// Upper bound on the snapshot bytes one session can add.
///
/// Covers the re-encoded player entry (never more than its inbound payload
/// plus float widening), the session id key and the score entry.
pub const SNAPSHOT_BYTES_PER_SESSION: usize = MAX_FRAME_LEN + 256;

/// Envelope and coin
const SNAPSHOT_BASE_BYTES: usize = 256;

/// Most sessions whose worst-case snapshot still fits in [`MAX_SNAPSHOT_LEN`]
pub const MAX_SUPPORTED_SESSIONS: usize =
    (MAX_SNAPSHOT_LEN - SNAPSHOT_BASE_BYTES) / SNAPSHOT_BYTES_PER_SESSION;

const HEADER_LEN: usize = 4;

/// Worst-case snapshot payload size for `sessions` concurrent sessions
pub const fn snapshot_len_bound(sessions: usize) -> usize {
    SNAPSHOT_BASE_BYTES.saturating_add(sessions.saturating_mul(SNAPSHOT_BYTES_PER_SESSION))
}

/// Builds the complete on-wire bytes (header + payload) for one message.
pub fn encode_frame(payload: &[u8], limit: usize) -> Result<Vec<u8>, ProtocolError> {
    if payload.len() > limit {
        return Err(ProtocolError::FrameTooLarge {
            len: payload.len(),
            limit,
        });
    }

    let mut frame = Vec::with_capacity(HEADER_LEN + payload.len());
    frame.extend_from_slice(&(payload.len() as u32).to_be_bytes());
    frame.extend_from_slice(payload);
    Ok(frame)
}

/// Reads the next payload from the stream.
///
/// Returns `Ok(None)` when the peer closed the stream on a frame boundary.
/// A stream that ends in the middle of a payload is an error, and so is a
/// header announcing more than `limit` bytes.
pub async fn read_frame<R>(reader: &mut R, limit: usize) -> Result<Option<Vec<u8>>, ProtocolError>
where
    R: AsyncRead + Unpin,
{
    let len = match reader.read_u32().await {
        Ok(len) => len as usize,
        Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => return Ok(None),
        Err(e) => return Err(e.into()),
    };

    if len > limit {
        return Err(ProtocolError::FrameTooLarge { len, limit });
    }

    let mut payload = vec![0u8; len];
    reader.read_exact(&mut payload).await?;
    Ok(Some(payload))
}

/// Writes bytes previously produced by [`encode_frame`].
pub async fn write_encoded<W>(writer: &mut W, frame: &[u8]) -> Result<(), ProtocolError>
where
    W: AsyncWrite + Unpin,
{
    writer.write_all(frame).await?;
    writer.flush().await?;
    Ok(())
}

/// Frames and writes a single payload.
pub async fn write_frame<W>(
    writer: &mut W,
    payload: &[u8],
    limit: usize,
) -> Result<(), ProtocolError>
where
    W: AsyncWrite + Unpin,
{
    let frame = encode_frame(payload, limit)?;
    write_encoded(writer, &frame).await
}
