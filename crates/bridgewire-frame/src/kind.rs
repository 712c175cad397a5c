//! Message type taxonomy.

use crate::error::InvalidMessage;

/// The kind of a bridge message, encoded as one byte.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MessageType {
    /// A call that expects a `Response` or `Error` with the same id.
    Request = 0,
    /// Successful reply to a `Request`.
    Response = 1,
    /// One chunk of a one-way stream.
    Stream = 2,
    /// A one-way raw binary blob.
    Binary = 3,
    /// Failed reply to a `Request`.
    Error = 4,
}

impl MessageType {
    /// All message types in wire order.
    pub const ALL: [MessageType; 5] = [
        MessageType::Request,
        MessageType::Response,
        MessageType::Stream,
        MessageType::Binary,
        MessageType::Error,
    ];

    /// Returns a human-readable name for the type.
    pub fn name(self) -> &'static str {
        match self {
            MessageType::Request => "REQUEST",
            MessageType::Response => "RESPONSE",
            MessageType::Stream => "STREAM",
            MessageType::Binary => "BINARY",
            MessageType::Error => "ERROR",
        }
    }

    /// Returns true for the types that settle a pending request.
    pub fn is_reply(self) -> bool {
        matches!(self, MessageType::Response | MessageType::Error)
    }

    /// Returns true for the types that expect no reply.
    pub fn is_one_way(self) -> bool {
        matches!(self, MessageType::Stream | MessageType::Binary)
    }
}

impl From<MessageType> for u8 {
    fn from(kind: MessageType) -> Self {
        kind as u8
    }
}

impl TryFrom<u8> for MessageType {
    type Error = InvalidMessage;

    fn try_from(value: u8) -> std::result::Result<Self, InvalidMessage> {
        match value {
            0 => Ok(MessageType::Request),
            1 => Ok(MessageType::Response),
            2 => Ok(MessageType::Stream),
            3 => Ok(MessageType::Binary),
            4 => Ok(MessageType::Error),
            other => Err(InvalidMessage::UnknownType(other)),
        }
    }
}

impl std::fmt::Display for MessageType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}
