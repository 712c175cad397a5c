use bytes::{BufMut, Bytes, BytesMut};

use crate::codec::{MessageHeader, HEADER_SIZE, MAX_PAYLOAD};
use crate::error::{FrameError, InvalidMessage, Result};
use crate::kind::MessageType;

/// A typed bridge message that owns its payload.
///
/// Construction and decoding both copy the payload, so the source buffer can
/// be reused or freed as soon as the call returns.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    header: MessageHeader,
    payload: Bytes,
}

impl Message {
    /// Build a message, copying `payload`.
    ///
    /// Fails with [`FrameError::MessageTooLarge`] when the payload cannot be
    /// described by the 4-byte length field.
    pub fn new(kind: MessageType, id: u32, payload: &[u8]) -> Result<Self> {
        Self::with_limit(kind, id, payload, MAX_PAYLOAD)
    }

    /// Build a message with a payload ceiling below the protocol maximum.
    pub fn with_limit(kind: MessageType, id: u32, payload: &[u8], max: usize) -> Result<Self> {
        let max = max.min(MAX_PAYLOAD);
        if payload.len() > max {
            return Err(FrameError::MessageTooLarge {
                size: payload.len(),
                max,
            });
        }

        Ok(Self {
            header: MessageHeader::new(kind, id, payload.len() as u32),
            payload: Bytes::copy_from_slice(payload),
        })
    }

    /// Decode one complete frame.
    ///
    /// `src` must hold exactly one frame: a header followed by precisely
    /// `payload_len` bytes. Anything shorter or longer is
    /// [`InvalidMessage::LengthMismatch`].
    pub fn decode(src: &[u8]) -> Result<Self> {
        let header = MessageHeader::decode(src)?;

        let declared = header.payload_len as usize;
        let actual = src.len() - HEADER_SIZE;
        if actual != declared {
            return Err(InvalidMessage::LengthMismatch { declared, actual }.into());
        }

        Ok(Self {
            header,
            payload: Bytes::copy_from_slice(&src[HEADER_SIZE..]),
        })
    }

    /// Encode into a fresh buffer of `14 + payload.len()` bytes.
    pub fn encode(&self) -> Bytes {
        let mut dst = BytesMut::with_capacity(self.wire_size());
        self.encode_into(&mut dst);
        dst.freeze()
    }

    /// Append the encoded frame to `dst`.
    pub fn encode_into(&self, dst: &mut BytesMut) {
        dst.reserve(self.wire_size());
        dst.put_slice(&self.header.encode());
        dst.put_slice(&self.payload);
    }

    pub fn header(&self) -> &MessageHeader {
        &self.header
    }

    pub fn kind(&self) -> MessageType {
        self.header.kind
    }

    pub fn id(&self) -> u32 {
        self.header.id
    }

    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    /// Take the payload out of the message.
    pub fn into_payload(self) -> Bytes {
        self.payload
    }

    /// Re-address the message to another correlation id.
    pub fn with_id(mut self, id: u32) -> Self {
        self.header.id = id;
        self
    }

    /// The total wire size of this message (header + payload).
    pub fn wire_size(&self) -> usize {
        HEADER_SIZE + self.payload.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hello_world_request() {
        let msg = Message::new(MessageType::Request, 42, b"hello world").unwrap();
        let wire = msg.encode();
        assert_eq!(wire.len(), 25);

        let decoded = Message::decode(&wire).unwrap();
        assert_eq!(decoded.id(), 42);
        assert_eq!(decoded.kind(), MessageType::Request);
        assert_eq!(decoded.payload(), b"hello world");
    }

    #[test]
    fn roundtrip_every_type() {
        let payloads: [&[u8]; 3] = [b"", b"x", &[0u8, 0xFF, 0x7F, 0x80]];
        for kind in MessageType::ALL {
            for (i, payload) in payloads.iter().enumerate() {
                let id = u32::MAX - i as u32;
                let msg = Message::new(kind, id, payload).unwrap();
                assert_eq!(Message::decode(&msg.encode()).unwrap(), msg);
            }
        }
    }

    #[test]
    fn payload_is_copied_on_construct() {
        let mut source = b"mutable".to_vec();
        let msg = Message::new(MessageType::Binary, 1, &source).unwrap();
        source.fill(0);
        assert_eq!(msg.payload(), b"mutable");
    }

    #[test]
    fn payload_is_copied_on_decode() {
        let mut wire = Message::new(MessageType::Stream, 9, b"chunk")
            .unwrap()
            .encode()
            .to_vec();
        let msg = Message::decode(&wire).unwrap();
        wire.fill(0);
        assert_eq!(msg.payload(), b"chunk");
    }

    #[test]
    fn limit_rejects_oversized_payload() {
        let err = Message::with_limit(MessageType::Request, 1, b"oversized", 4).unwrap_err();
        assert!(matches!(
            err,
            FrameError::MessageTooLarge { size: 9, max: 4 }
        ));
    }

    #[test]
    fn payload_at_limit_is_accepted() {
        let msg = Message::with_limit(MessageType::Request, 1, b"four", 4).unwrap();
        assert_eq!(msg.header().payload_len, 4);
    }

    #[test]
    fn decode_rejects_truncated_header() {
        let wire = Message::new(MessageType::Request, 1, b"abc").unwrap().encode();
        let err = Message::decode(&wire[..10]).unwrap_err();
        assert!(matches!(
            err,
            FrameError::InvalidMessage(InvalidMessage::TruncatedHeader { len: 10 })
        ));
    }

    #[test]
    fn decode_rejects_truncated_payload() {
        let wire = Message::new(MessageType::Request, 1, b"abcdef").unwrap().encode();
        let err = Message::decode(&wire[..wire.len() - 2]).unwrap_err();
        assert!(matches!(
            err,
            FrameError::InvalidMessage(InvalidMessage::LengthMismatch {
                declared: 6,
                actual: 4
            })
        ));
    }

    #[test]
    fn decode_rejects_overlong_frame() {
        let mut wire = Message::new(MessageType::Response, 1, b"ab")
            .unwrap()
            .encode()
            .to_vec();
        wire.push(0);
        let err = Message::decode(&wire).unwrap_err();
        assert!(matches!(
            err,
            FrameError::InvalidMessage(InvalidMessage::LengthMismatch {
                declared: 2,
                actual: 3
            })
        ));
    }

    #[test]
    fn decode_rejects_foreign_magic() {
        let mut wire = Message::new(MessageType::Response, 1, b"ab")
            .unwrap()
            .encode()
            .to_vec();
        wire[0] = b'X';
        let err = Message::decode(&wire).unwrap_err();
        assert!(matches!(
            err,
            FrameError::InvalidMessage(InvalidMessage::BadMagic { .. })
        ));
    }

    #[test]
    fn encode_into_appends() {
        let mut buf = BytesMut::new();
        let first = Message::new(MessageType::Stream, 1, b"one").unwrap();
        let second = Message::new(MessageType::Stream, 2, b"two").unwrap();
        first.encode_into(&mut buf);
        second.encode_into(&mut buf);

        assert_eq!(buf.len(), first.wire_size() + second.wire_size());
        assert_eq!(Message::decode(&buf[..first.wire_size()]).unwrap(), first);
        assert_eq!(Message::decode(&buf[first.wire_size()..]).unwrap(), second);
    }

    #[test]
    fn with_id_readdresses() {
        let msg = Message::new(MessageType::Request, 1, b"x").unwrap().with_id(77);
        assert_eq!(msg.id(), 77);
        assert_eq!(Message::decode(&msg.encode()).unwrap().id(), 77);
    }

    mod property_tests {
        use super::*;
        use proptest::prelude::*;

        fn arb_type() -> impl Strategy<Value = MessageType> {
            (0u8..=4).prop_map(|b| MessageType::try_from(b).unwrap())
        }

        proptest! {
            #[test]
            fn prop_encode_decode_roundtrip(
                kind in arb_type(),
                id in any::<u32>(),
                payload in proptest::collection::vec(any::<u8>(), 0..512),
            ) {
                let msg = Message::new(kind, id, &payload).unwrap();
                let wire = msg.encode();
                prop_assert_eq!(wire.len(), HEADER_SIZE + payload.len());

                let decoded = Message::decode(&wire).unwrap();
                prop_assert_eq!(decoded.kind(), kind);
                prop_assert_eq!(decoded.id(), id);
                prop_assert_eq!(decoded.payload(), payload.as_slice());
            }

            #[test]
            fn prop_short_payload_is_length_mismatch(
                kind in arb_type(),
                id in any::<u32>(),
                payload in proptest::collection::vec(any::<u8>(), 1..512),
                cut in any::<prop::sample::Index>(),
            ) {
                let wire = Message::new(kind, id, &payload).unwrap().encode();
                let keep = cut.index(payload.len());
                let err = Message::decode(&wire[..HEADER_SIZE + keep]).unwrap_err();
                prop_assert!(matches!(
                    err,
                    FrameError::InvalidMessage(InvalidMessage::LengthMismatch { declared, actual })
                        if declared == payload.len() && actual == keep
                ), "unexpected error: {:?}", err);
            }
        }
    }
}
