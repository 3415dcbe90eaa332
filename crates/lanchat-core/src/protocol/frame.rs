//! Length-prefixed binary framing (panic-free).
//!
//! Wire layout: `[u32 LE length][u8 kind][payload]`, where `length`
//! counts the kind byte plus the payload (`payload.len() + 1`). A reader
//! never sees a partial frame: `read_frame` suspends until the full frame
//! arrived or the connection failed.

use bytes::{BufMut, Bytes, BytesMut};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::error::{LanChatError, Result};

/// Maximum declared frame length (kind byte + payload), 8 MiB.
pub const MAX_FRAME_BYTES: usize = 8 * 1024 * 1024;

/// Header size: u32 length + u8 kind.
pub const HEADER_BYTES: usize = 5;

/// Frame kind tag carried in the header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum FrameKind {
    /// UTF-8 text payload.
    Text = 1,
    /// UTF-8 JSON of a `MessageEnvelope`.
    JsonEnvelope = 2,
}

impl FrameKind {
    pub fn as_u8(self) -> u8 {
        self as u8
    }
}

impl TryFrom<u8> for FrameKind {
    type Error = LanChatError;

    fn try_from(value: u8) -> Result<Self> {
        match value {
            1 => Ok(FrameKind::Text),
            2 => Ok(FrameKind::JsonEnvelope),
            other => Err(LanChatError::UnknownKind(other)),
        }
    }
}

/// Write one frame and flush.
///
/// Rejects payloads that would exceed [`MAX_FRAME_BYTES`] before touching
/// the stream, so an oversized send never leaves a half-written header.
pub async fn write_frame<W>(stream: &mut W, kind: FrameKind, payload: &[u8]) -> Result<()>
where
    W: AsyncWrite + Unpin,
{
    if payload.len() >= MAX_FRAME_BYTES {
        return Err(LanChatError::InvalidFrame(format!(
            "payload of {} bytes exceeds frame limit",
            payload.len()
        )));
    }

    let mut header = BytesMut::with_capacity(HEADER_BYTES);
    header.put_u32_le(payload.len() as u32 + 1);
    header.put_u8(kind.as_u8());

    stream.write_all(&header).await?;
    stream.write_all(payload).await?;
    stream.flush().await?;
    Ok(())
}

/// Read one full frame.
///
/// Reads exactly [`HEADER_BYTES`], validates the declared length against
/// `1..=MAX_FRAME_BYTES`, then reads the remaining `length - 1` payload
/// bytes. EOF before a frame completes is reported as
/// [`LanChatError::ConnectionClosed`]; an out-of-range length or unknown
/// kind is a protocol error and the stream must be considered failed.
pub async fn read_frame<R>(stream: &mut R) -> Result<(FrameKind, Bytes)>
where
    R: AsyncRead + Unpin,
{
    let mut header = [0u8; HEADER_BYTES];
    read_full(stream, &mut header).await?;

    let declared = u32::from_le_bytes([header[0], header[1], header[2], header[3]]) as usize;
    if declared < 1 || declared > MAX_FRAME_BYTES {
        return Err(LanChatError::InvalidFrame(format!(
            "declared length {declared} outside 1..={MAX_FRAME_BYTES}"
        )));
    }
    let kind = FrameKind::try_from(header[4])?;

    let mut payload = vec![0u8; declared - 1];
    read_full(stream, &mut payload).await?;

    tracing::trace!(kind = ?kind, len = payload.len(), "frame read");
    Ok((kind, Bytes::from(payload)))
}

/// `read_exact` with EOF mapped to a connection-closed error.
async fn read_full<R>(stream: &mut R, buf: &mut [u8]) -> Result<()>
where
    R: AsyncRead + Unpin,
{
    match stream.read_exact(buf).await {
        Ok(_) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
            Err(LanChatError::ConnectionClosed)
        }
        Err(e) => Err(e.into()),
    }
}
