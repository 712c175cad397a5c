use std::ffi::c_void;

use bridgewire_channel::{AsyncChannel, Promise};
use bridgewire_transport::{Transport, TransportError};
use bytes::Bytes;

#[repr(i32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BridgeResult {
    Ok = 0,
    InvalidArgument = 1,
    MessageTooLarge = 2,
    InvalidMessage = 3,
    Transport = 4,
    Timeout = 5,
    ChannelClosed = 6,
    Rejected = 7,
    Cancelled = 8,
    TooManyPending = 9,
    /// The promise has not settled yet.
    Pending = 10,
    Internal = 99,
}

pub const BRIDGE_TYPE_REQUEST: u8 = 0;
pub const BRIDGE_TYPE_RESPONSE: u8 = 1;
pub const BRIDGE_TYPE_STREAM: u8 = 2;
pub const BRIDGE_TYPE_BINARY: u8 = 3;
pub const BRIDGE_TYPE_ERROR: u8 = 4;

/// The reply settled an outstanding request.
pub const BRIDGE_INBOUND_ROUTED: i32 = 0;
/// The reply matched no outstanding request and was dropped.
pub const BRIDGE_INBOUND_DISCARDED: i32 = 1;
/// The peer sent a request; `payload` holds its body.
pub const BRIDGE_INBOUND_REQUEST: i32 = 2;
pub const BRIDGE_INBOUND_STREAM: i32 = 3;
pub const BRIDGE_INBOUND_BINARY: i32 = 4;

/// Library-owned byte buffer. Release with `bridge_buffer_free`.
#[repr(C)]
#[derive(Debug)]
pub struct BridgeBuffer {
    pub data: *mut u8,
    pub len: usize,
}

impl Default for BridgeBuffer {
    fn default() -> Self {
        Self {
            data: std::ptr::null_mut(),
            len: 0,
        }
    }
}

/// Result of routing one incoming frame.
#[repr(C)]
#[derive(Debug, Default)]
pub struct BridgeInbound {
    pub disposition: i32,
    pub kind: u8,
    pub id: u32,
    pub payload: BridgeBuffer,
}

/// Host callback that moves one encoded frame to the peer.
///
/// The frame is only valid for the duration of the call. Return 0 on
/// success; any other value is reported as a transport failure.
pub type BridgeSendFn =
    Option<unsafe extern "C" fn(user_data: *mut c_void, data: *const u8, len: usize) -> i32>;

pub type BridgeChannelHandle = *mut c_void;
pub type BridgePromiseHandle = *mut c_void;

pub(crate) struct FfiTransport {
    send: unsafe extern "C" fn(*mut c_void, *const u8, usize) -> i32,
    user_data: *mut c_void,
}

impl FfiTransport {
    pub(crate) fn new(
        send: unsafe extern "C" fn(*mut c_void, *const u8, usize) -> i32,
        user_data: *mut c_void,
    ) -> Self {
        Self { send, user_data }
    }
}

// SAFETY: The embedder promises, as part of the bridge_channel_new contract,
// that the callback and `user_data` may be used from any thread.
unsafe impl Send for FfiTransport {}
// SAFETY: See above; the library never dereferences `user_data` itself.
unsafe impl Sync for FfiTransport {}

impl Transport for FfiTransport {
    fn send(&self, frame: Bytes) -> bridgewire_transport::Result<()> {
        // SAFETY: `frame` stays alive across the call; the callback contract
        // forbids retaining the pointer.
        let status = unsafe { (self.send)(self.user_data, frame.as_ptr(), frame.len()) };
        if status == 0 {
            Ok(())
        } else {
            tracing::debug!(status, len = frame.len(), "host send callback failed");
            Err(TransportError::Rejected(format!(
                "send callback returned {status}"
            )))
        }
    }
}

pub(crate) struct ChannelHandle {
    pub(crate) channel: AsyncChannel<FfiTransport>,
}

pub(crate) struct PromiseHandle {
    pub(crate) promise: Promise,
}
