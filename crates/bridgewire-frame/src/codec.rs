use bytes::{Buf, BytesMut};

use crate::error::{FrameError, InvalidMessage, Result};
use crate::kind::MessageType;
use crate::message::Message;

/// Header: magic (4) + version (1) + type (1) + id (4) + length (4) = 14 bytes.
pub const HEADER_SIZE: usize = 14;

/// Protocol sentinel, `"BRDG"` on the wire.
pub const MAGIC: u32 = 0x4744_5242;

/// Version byte written by this implementation.
pub const PROTOCOL_VERSION: u8 = 1;

/// Largest payload the 4-byte length field can describe.
pub const MAX_PAYLOAD: usize = u32::MAX as usize;

/// Default ceiling for stream readers and writers: 16 MiB.
pub const DEFAULT_MAX_PAYLOAD: usize = 16 * 1024 * 1024;

/// The fixed 14-byte message header.
///
/// Wire format (all integers little-endian):
/// ```text
/// ┌────────────┬─────────┬──────┬──────────┬─────────────┬──────────────┐
/// │ Magic (4B) │ Ver(1B) │ Type │ Id (4B)  │ Length (4B) │ Payload      │
/// │ "BRDG"     │ 0x01    │ (1B) │          │             │ (Length B)   │
/// └────────────┴─────────┴──────┴──────────┴─────────────┴──────────────┘
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MessageHeader {
    pub magic: u32,
    pub version: u8,
    pub kind: MessageType,
    pub id: u32,
    pub payload_len: u32,
}

impl MessageHeader {
    /// Header for a message produced by this implementation.
    pub fn new(kind: MessageType, id: u32, payload_len: u32) -> Self {
        Self {
            magic: MAGIC,
            version: PROTOCOL_VERSION,
            kind,
            id,
            payload_len,
        }
    }

    /// Encode into the fixed 14 wire bytes.
    pub fn encode(&self) -> [u8; HEADER_SIZE] {
        let mut out = [0u8; HEADER_SIZE];
        out[0..4].copy_from_slice(&self.magic.to_le_bytes());
        out[4] = self.version;
        out[5] = self.kind.into();
        out[6..10].copy_from_slice(&self.id.to_le_bytes());
        out[10..14].copy_from_slice(&self.payload_len.to_le_bytes());
        out
    }

    /// Decode a header from the first 14 bytes of `src`.
    ///
    /// Only the header is validated; bytes after the first 14 are ignored.
    pub fn decode(src: &[u8]) -> Result<Self> {
        if src.len() < HEADER_SIZE {
            return Err(InvalidMessage::TruncatedHeader { len: src.len() }.into());
        }

        let magic = read_u32_le(src, 0);
        if magic != MAGIC {
            return Err(InvalidMessage::BadMagic { found: magic }.into());
        }

        let version = src[4];
        if version != PROTOCOL_VERSION {
            return Err(InvalidMessage::UnsupportedVersion(version).into());
        }

        let kind = MessageType::try_from(src[5])?;

        Ok(Self {
            magic,
            version,
            kind,
            id: read_u32_le(src, 6),
            payload_len: read_u32_le(src, 10),
        })
    }

    /// Total frame size this header describes.
    pub fn frame_len(&self) -> usize {
        HEADER_SIZE + self.payload_len as usize
    }
}

/// Inspect the start of a stream buffer.
///
/// Returns `Ok(None)` while fewer than [`HEADER_SIZE`] bytes are buffered,
/// otherwise the validated header. Callers wait until
/// `header.frame_len()` bytes are available before decoding the frame.
pub fn peek_header(src: &[u8]) -> Result<Option<MessageHeader>> {
    if src.len() < HEADER_SIZE {
        return Ok(None);
    }
    MessageHeader::decode(src).map(Some)
}

/// Decode the next frame from a stream buffer.
///
/// Returns `Ok(None)` if the buffer doesn't contain a complete frame yet.
/// On success, consumes the frame bytes from the buffer. A declared payload
/// above `max_payload` fails before any payload bytes are buffered.
pub fn decode_frame(src: &mut BytesMut, max_payload: usize) -> Result<Option<Message>> {
    let header = match peek_header(src)? {
        Some(header) => header,
        None => return Ok(None), // Need more data
    };

    let payload_len = header.payload_len as usize;
    if payload_len > max_payload {
        return Err(FrameError::MessageTooLarge {
            size: payload_len,
            max: max_payload,
        });
    }

    let total = header.frame_len();
    if src.len() < total {
        return Ok(None); // Need more data
    }

    let frame = src.split_to(total);
    let message = Message::decode(&frame)?;
    Ok(Some(message))
}

/// Drop buffered bytes up to the next occurrence of the magic sentinel.
///
/// Used after [`InvalidMessage::BadMagic`] to resynchronise a byte stream.
/// Returns the number of bytes discarded.
pub fn skip_to_magic(src: &mut BytesMut) -> usize {
    let magic = MAGIC.to_le_bytes();
    let start = src
        .windows(magic.len())
        .skip(1)
        .position(|window| window == magic)
        .map(|pos| pos + 1);

    let discard = match start {
        Some(pos) => pos,
        // Keep a possible partial sentinel at the tail.
        None => src.len().saturating_sub(magic.len() - 1),
    };
    src.advance(discard);
    discard
}

fn read_u32_le(src: &[u8], at: usize) -> u32 {
    let mut word = [0u8; 4];
    word.copy_from_slice(&src[at..at + 4]);
    u32::from_le_bytes(word)
}

/// Configuration for stream framing.
///
/// Blocking behaviour belongs to the underlying reader or writer; set
/// timeouts on the socket or pipe itself.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameConfig {
    /// Maximum payload size in bytes. Default: 16 MiB.
    pub max_payload_size: usize,
}

impl Default for FrameConfig {
    fn default() -> Self {
        Self {
            max_payload_size: DEFAULT_MAX_PAYLOAD,
        }
    }
}
