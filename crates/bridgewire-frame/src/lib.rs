//! Fixed-header message framing for the web-view bridge.
//!
//! Every message on the bridge is a 14-byte header followed by its payload:
//! - 4-byte little-endian magic (`"BRDG"`) identifying the protocol
//! - 1-byte protocol version (always 1)
//! - 1-byte [`MessageType`]
//! - 4-byte little-endian correlation id
//! - 4-byte little-endian payload length
//!
//! [`Message`] owns its payload; decoding copies out of the input buffer.

#[cfg(feature = "async")]
pub mod async_codec;
pub mod codec;
pub mod error;
pub mod kind;
pub mod message;
pub mod payload;
pub mod reader;
pub mod writer;

#[cfg(feature = "async")]
pub use async_codec::MessageCodec;
pub use codec::{
    decode_frame, peek_header, skip_to_magic, FrameConfig, MessageHeader, DEFAULT_MAX_PAYLOAD,
    HEADER_SIZE, MAGIC, MAX_PAYLOAD, PROTOCOL_VERSION,
};
pub use error::{FrameError, InvalidMessage, Result};
pub use kind::MessageType;
pub use message::Message;
pub use payload::{from_json_payload, to_json_payload};
pub use reader::FrameReader;
pub use writer::FrameWriter;
