//! `tokio_util` codec for async transports.

use bytes::BytesMut;
use tokio_util::codec::{Decoder, Encoder};

use crate::codec::{decode_frame, DEFAULT_MAX_PAYLOAD};
use crate::error::{FrameError, Result};
use crate::message::Message;

/// Frames [`Message`]s over an `AsyncRead`/`AsyncWrite` pair.
#[derive(Debug, Clone)]
pub struct MessageCodec {
    max_payload_size: usize,
}

impl MessageCodec {
    pub fn new() -> Self {
        Self::with_max_payload(DEFAULT_MAX_PAYLOAD)
    }

    pub fn with_max_payload(max_payload_size: usize) -> Self {
        Self { max_payload_size }
    }

    pub fn max_payload_size(&self) -> usize {
        self.max_payload_size
    }
}

impl Default for MessageCodec {
    fn default() -> Self {
        Self::new()
    }
}

impl Decoder for MessageCodec {
    type Item = Message;
    type Error = FrameError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Message>> {
        decode_frame(src, self.max_payload_size)
    }
}

impl Encoder<&Message> for MessageCodec {
    type Error = FrameError;

    fn encode(&mut self, item: &Message, dst: &mut BytesMut) -> Result<()> {
        if item.payload().len() > self.max_payload_size {
            return Err(FrameError::MessageTooLarge {
                size: item.payload().len(),
                max: self.max_payload_size,
            });
        }
        item.encode_into(dst);
        Ok(())
    }
}

impl Encoder<Message> for MessageCodec {
    type Error = FrameError;

    fn encode(&mut self, item: Message, dst: &mut BytesMut) -> Result<()> {
        Encoder::<&Message>::encode(self, &item, dst)
    }
}
