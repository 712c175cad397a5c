/// Errors that can occur during message construction, encoding and decoding.
#[derive(Debug, thiserror::Error)]
pub enum FrameError {
    /// The payload does not fit the 4-byte length field or a configured ceiling.
    #[error("message too large ({size} bytes, max {max})")]
    MessageTooLarge { size: usize, max: usize },

    /// The bytes do not form a valid frame.
    #[error("invalid message: {0}")]
    InvalidMessage(#[from] InvalidMessage),

    /// A payload codec could not serialize a value.
    #[error("payload serialization failed: {0}")]
    SerializationFailed(#[source] serde_json::Error),

    /// A payload codec could not deserialize a value.
    #[error("payload deserialization failed: {0}")]
    DeserializationFailed(#[source] serde_json::Error),

    /// An I/O error occurred while reading or writing frames.
    #[error("frame I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The stream ended before a complete frame was received.
    #[error("connection closed (incomplete frame)")]
    ConnectionClosed,
}

/// Why a frame was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum InvalidMessage {
    #[error("truncated header ({len} bytes, need {need})", need = crate::codec::HEADER_SIZE)]
    TruncatedHeader { len: usize },

    #[error("bad magic 0x{found:08x} (expected 0x{expected:08x} \"BRDG\")", expected = crate::codec::MAGIC)]
    BadMagic { found: u32 },

    #[error("unsupported protocol version {0}")]
    UnsupportedVersion(u8),

    #[error("unknown message type {0}")]
    UnknownType(u8),

    #[error("payload length mismatch (header declares {declared} bytes, frame carries {actual})")]
    LengthMismatch { declared: usize, actual: usize },
}

pub type Result<T> = std::result::Result<T, FrameError>;
