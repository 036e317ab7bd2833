//! Length-prefixed frame codec and raw payload streaming.

use std::io::{self, Read, Write};

use logging::{DebugFlag, debug_gte, emit_debug};
use serde::Serialize;
use serde::de::DeserializeOwned;

/// Hard cap on a single frame's encoded length.
///
/// Directory listings are the largest frames in practice; the cap leaves
/// generous headroom while bounding what a corrupt length prefix can make
/// the reader allocate.
pub const MAX_FRAME_LEN: usize = 16 * 1024 * 1024;

/// Chunk size used when streaming raw file payloads.
pub const PAYLOAD_CHUNK_LEN: usize = 8192;

/// Transport or codec failure while moving frames or payload bytes.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    /// Reading from or writing to the transport failed.
    #[error("transport i/o failed: {0}")]
    Io(#[from] io::Error),
    /// A frame could not be encoded.
    #[error("failed to encode frame: {0}")]
    Encode(#[source] bincode::Error),
    /// A frame could not be decoded.
    #[error("failed to decode frame: {0}")]
    Decode(#[source] bincode::Error),
    /// The peer announced a frame larger than [`MAX_FRAME_LEN`].
    #[error("frame length {len} exceeds the {max}-byte limit")]
    FrameTooLarge {
        /// Announced frame length.
        len: usize,
        /// Enforced maximum.
        max: usize,
    },
    /// A payload stream ended before the announced byte count arrived.
    #[error("payload truncated: expected {expected} bytes, got {actual}")]
    PayloadTruncated {
        /// Announced payload length.
        expected: u64,
        /// Bytes actually received.
        actual: u64,
    },
}

/// Encodes `frame` and writes it with a big-endian `u32` length prefix.
pub fn write_frame<W: Write, T: Serialize>(writer: &mut W, frame: &T) -> Result<(), ProtocolError> {
    let body = bincode::serialize(frame).map_err(ProtocolError::Encode)?;
    if body.len() > MAX_FRAME_LEN {
        return Err(ProtocolError::FrameTooLarge {
            len: body.len(),
            max: MAX_FRAME_LEN,
        });
    }

    if debug_gte(DebugFlag::Proto, 3) {
        emit_debug(DebugFlag::Proto, 3, format!("send frame {} bytes", body.len()));
    }

    let len = u32::try_from(body.len()).map_err(|_| ProtocolError::FrameTooLarge {
        len: body.len(),
        max: MAX_FRAME_LEN,
    })?;
    writer.write_all(&len.to_be_bytes())?;
    writer.write_all(&body)?;
    writer.flush()?;
    Ok(())
}

/// Reads one length-prefixed frame and decodes it.
pub fn read_frame<R: Read, T: DeserializeOwned>(reader: &mut R) -> Result<T, ProtocolError> {
    let mut prefix = [0_u8; 4];
    reader.read_exact(&mut prefix)?;
    let len = u32::from_be_bytes(prefix) as usize;
    if len > MAX_FRAME_LEN {
        return Err(ProtocolError::FrameTooLarge {
            len,
            max: MAX_FRAME_LEN,
        });
    }

    let mut body = vec![0_u8; len];
    reader.read_exact(&mut body)?;

    if debug_gte(DebugFlag::Proto, 3) {
        emit_debug(DebugFlag::Proto, 3, format!("recv frame {len} bytes"));
    }

    bincode::deserialize(&body).map_err(ProtocolError::Decode)
}

/// Streams exactly `len` bytes from `source` onto the transport.
///
/// Returns [`ProtocolError::PayloadTruncated`] if `source` runs dry early,
/// leaving the transport in an undefined framing state the caller must
/// treat as fatal for the connection.
pub fn send_payload<R: Read, W: Write>(
    writer: &mut W,
    source: &mut R,
    len: u64,
) -> Result<(), ProtocolError> {
    let mut remaining = len;
    let mut chunk = [0_u8; PAYLOAD_CHUNK_LEN];
    while remaining > 0 {
        let want = usize::try_from(remaining.min(PAYLOAD_CHUNK_LEN as u64))
            .unwrap_or(PAYLOAD_CHUNK_LEN);
        let read = source.read(&mut chunk[..want])?;
        if read == 0 {
            return Err(ProtocolError::PayloadTruncated {
                expected: len,
                actual: len - remaining,
            });
        }
        writer.write_all(&chunk[..read])?;
        remaining -= read as u64;
    }
    writer.flush()?;
    Ok(())
}

/// Receives exactly `len` payload bytes from the transport into `sink`.
pub fn receive_payload<R: Read, W: Write>(
    reader: &mut R,
    sink: &mut W,
    len: u64,
) -> Result<(), ProtocolError> {
    let mut remaining = len;
    let mut chunk = [0_u8; PAYLOAD_CHUNK_LEN];
    while remaining > 0 {
        let want = usize::try_from(remaining.min(PAYLOAD_CHUNK_LEN as u64))
            .unwrap_or(PAYLOAD_CHUNK_LEN);
        let read = reader.read(&mut chunk[..want])?;
        if read == 0 {
            return Err(ProtocolError::PayloadTruncated {
                expected: len,
                actual: len - remaining,
            });
        }
        sink.write_all(&chunk[..read])?;
        remaining -= read as u64;
    }
    Ok(())
}
