//! JSON payload codec layered on top of the wire format.
//!
//! The framing layer treats payloads as opaque bytes. Handlers that exchange
//! structured data use these helpers so encode and decode failures surface as
//! [`FrameError::SerializationFailed`] and [`FrameError::DeserializationFailed`].

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::{FrameError, Result};
use crate::kind::MessageType;
use crate::message::Message;

/// Serialize `value` into a JSON payload.
pub fn to_json_payload<T: Serialize + ?Sized>(value: &T) -> Result<Vec<u8>> {
    serde_json::to_vec(value).map_err(FrameError::SerializationFailed)
}

/// Deserialize a JSON payload.
pub fn from_json_payload<T: DeserializeOwned>(payload: &[u8]) -> Result<T> {
    serde_json::from_slice(payload).map_err(FrameError::DeserializationFailed)
}

impl Message {
    /// Build a message whose payload is `value` encoded as JSON.
    pub fn json<T: Serialize + ?Sized>(kind: MessageType, id: u32, value: &T) -> Result<Self> {
        let payload = to_json_payload(value)?;
        Self::new(kind, id, &payload)
    }

    /// Decode the payload as JSON.
    pub fn decode_json<T: DeserializeOwned>(&self) -> Result<T> {
        from_json_payload(self.payload())
    }
}
