use std::ffi::c_void;

use bridgewire_channel::{AsyncChannel, Inbound};
use bridgewire_frame::Message;

use crate::args::{bytes_arg, channel_arg, write_buffer};
use crate::error;
use crate::types::{
    BridgeChannelHandle, BridgeInbound, BridgePromiseHandle, BridgeResult, BridgeSendFn,
    ChannelHandle, FfiTransport, PromiseHandle, BRIDGE_INBOUND_BINARY, BRIDGE_INBOUND_DISCARDED,
    BRIDGE_INBOUND_REQUEST, BRIDGE_INBOUND_ROUTED, BRIDGE_INBOUND_STREAM,
};

/// Create a channel that hands encoded frames to `send_fn`.
///
/// Returns null and sets the last error when `send_fn` is null.
///
/// # Safety
/// `send_fn` and `user_data` must remain valid, and be callable from any
/// thread, until the handle is released with `bridge_channel_free`.
#[no_mangle]
pub unsafe extern "C" fn bridge_channel_new(
    send_fn: BridgeSendFn,
    user_data: *mut c_void,
) -> BridgeChannelHandle {
    crate::ffi_boundary(std::ptr::null_mut(), || {
        error::clear_error_state();

        let Some(send_fn) = send_fn else {
            let _ = error::set_invalid_argument("send_fn cannot be null");
            return std::ptr::null_mut();
        };

        let handle = ChannelHandle {
            channel: AsyncChannel::new(FfiTransport::new(send_fn, user_data)),
        };
        Box::into_raw(Box::new(handle)) as BridgeChannelHandle
    })
}

/// Send a request and return a promise handle for its reply.
///
/// `out_id` may be null. On success `*out_promise` receives a handle that
/// must be released with `bridge_promise_free`.
///
/// # Safety
/// `channel` must be a live channel handle. If `len > 0`, `data` must be
/// readable for `len` bytes. `out_promise` must be valid for writes.
#[no_mangle]
pub unsafe extern "C" fn bridge_channel_request(
    channel: BridgeChannelHandle,
    data: *const u8,
    len: usize,
    out_id: *mut u32,
    out_promise: *mut BridgePromiseHandle,
) -> BridgeResult {
    crate::ffi_boundary(BridgeResult::Internal, || {
        error::clear_error_state();

        // SAFETY: Forwarded caller guarantee.
        let Some(handle) = (unsafe { channel_arg(channel) }) else {
            return BridgeResult::InvalidArgument;
        };
        if out_promise.is_null() {
            return error::set_invalid_argument("out_promise cannot be null");
        }
        // SAFETY: We validate pointer/length pairing in helper.
        let Some(payload) = (unsafe { bytes_arg(data, len, "data") }) else {
            return BridgeResult::InvalidArgument;
        };

        match handle.channel.request_with_id(payload) {
            Ok((id, promise)) => {
                if !out_id.is_null() {
                    // SAFETY: Non-null out pointer supplied by the caller.
                    unsafe { *out_id = id };
                }
                let boxed = Box::new(PromiseHandle { promise });
                // SAFETY: Checked non-null above.
                unsafe { *out_promise = Box::into_raw(boxed) as BridgePromiseHandle };
                BridgeResult::Ok
            }
            Err(err) => error::map_channel_error(&err),
        }
    })
}

/// Send a one-way binary blob. `out_id` may be null.
///
/// # Safety
/// Same pointer rules as `bridge_channel_request`.
#[no_mangle]
pub unsafe extern "C" fn bridge_channel_send_binary(
    channel: BridgeChannelHandle,
    data: *const u8,
    len: usize,
    out_id: *mut u32,
) -> BridgeResult {
    crate::ffi_boundary(BridgeResult::Internal, || {
        // SAFETY: Forwarded caller guarantee.
        unsafe { one_way(channel, data, len, out_id, |ch, p| ch.send_binary(p)) }
    })
}

/// Send a one-way stream chunk. `out_id` may be null.
///
/// # Safety
/// Same pointer rules as `bridge_channel_request`.
#[no_mangle]
pub unsafe extern "C" fn bridge_channel_stream(
    channel: BridgeChannelHandle,
    data: *const u8,
    len: usize,
    out_id: *mut u32,
) -> BridgeResult {
    crate::ffi_boundary(BridgeResult::Internal, || {
        // SAFETY: Forwarded caller guarantee.
        unsafe { one_way(channel, data, len, out_id, |ch, p| ch.stream(p)) }
    })
}

unsafe fn one_way(
    channel: BridgeChannelHandle,
    data: *const u8,
    len: usize,
    out_id: *mut u32,
    send: impl FnOnce(&AsyncChannel<FfiTransport>, &[u8]) -> bridgewire_channel::Result<u32>,
) -> BridgeResult {
    error::clear_error_state();

    // SAFETY: Forwarded caller guarantee.
    let Some(handle) = (unsafe { channel_arg(channel) }) else {
        return BridgeResult::InvalidArgument;
    };
    // SAFETY: We validate pointer/length pairing in helper.
    let Some(payload) = (unsafe { bytes_arg(data, len, "data") }) else {
        return BridgeResult::InvalidArgument;
    };

    match send(&handle.channel, payload) {
        Ok(id) => {
            if !out_id.is_null() {
                // SAFETY: Non-null out pointer supplied by the caller.
                unsafe { *out_id = id };
            }
            BridgeResult::Ok
        }
        Err(err) => error::map_channel_error(&err),
    }
}

/// Decode one frame received from the peer and route it.
///
/// Replies settle their promise and report `BRIDGE_INBOUND_ROUTED` or
/// `BRIDGE_INBOUND_DISCARDED`. Requests, stream chunks and binary blobs are
/// copied into `out->payload`, which the caller releases with
/// `bridge_buffer_free`.
///
/// # Safety
/// `channel` must be a live channel handle, `data` readable for `len` bytes,
/// and `out` valid for writes with a `payload` that is empty or library-owned.
#[no_mangle]
pub unsafe extern "C" fn bridge_channel_handle_incoming(
    channel: BridgeChannelHandle,
    data: *const u8,
    len: usize,
    out: *mut BridgeInbound,
) -> BridgeResult {
    crate::ffi_boundary(BridgeResult::Internal, || {
        error::clear_error_state();

        // SAFETY: Forwarded caller guarantee.
        let Some(handle) = (unsafe { channel_arg(channel) }) else {
            return BridgeResult::InvalidArgument;
        };
        if out.is_null() {
            return error::set_invalid_argument("out cannot be null");
        }
        // SAFETY: We validate pointer/length pairing in helper.
        let Some(frame) = (unsafe { bytes_arg(data, len, "data") }) else {
            return BridgeResult::InvalidArgument;
        };

        let inbound = match handle.channel.handle_incoming(frame) {
            Ok(inbound) => inbound,
            Err(err) => return error::map_channel_error(&err),
        };

        let out = {
            // SAFETY: Checked non-null above; validity is guaranteed by the caller.
            unsafe { &mut *out }
        };
        let (disposition, kind, id, msg): (i32, u8, u32, Option<Message>) = match inbound {
            Inbound::Routed { id, kind } => (BRIDGE_INBOUND_ROUTED, kind.into(), id, None),
            Inbound::Discarded { id, kind } => (BRIDGE_INBOUND_DISCARDED, kind.into(), id, None),
            Inbound::Request(msg) => (BRIDGE_INBOUND_REQUEST, msg.kind().into(), msg.id(), Some(msg)),
            Inbound::Stream(msg) => (BRIDGE_INBOUND_STREAM, msg.kind().into(), msg.id(), Some(msg)),
            Inbound::Binary(msg) => (BRIDGE_INBOUND_BINARY, msg.kind().into(), msg.id(), Some(msg)),
        };

        out.disposition = disposition;
        out.kind = kind;
        out.id = id;
        let payload = msg.as_ref().map(Message::payload).unwrap_or_default();
        // SAFETY: Caller guarantees `out.payload` is empty or library-owned.
        unsafe { write_buffer(&mut out.payload, payload) };
        BridgeResult::Ok
    })
}

/// Answer the peer's request `id` with a `Response`.
///
/// # Safety
/// Same pointer rules as `bridge_channel_request`.
#[no_mangle]
pub unsafe extern "C" fn bridge_channel_respond(
    channel: BridgeChannelHandle,
    id: u32,
    data: *const u8,
    len: usize,
) -> BridgeResult {
    crate::ffi_boundary(BridgeResult::Internal, || {
        // SAFETY: Forwarded caller guarantee.
        unsafe { reply(channel, data, len, |ch, p| ch.respond(id, p)) }
    })
}

/// Answer the peer's request `id` with an `Error`.
///
/// # Safety
/// Same pointer rules as `bridge_channel_request`.
#[no_mangle]
pub unsafe extern "C" fn bridge_channel_respond_error(
    channel: BridgeChannelHandle,
    id: u32,
    data: *const u8,
    len: usize,
) -> BridgeResult {
    crate::ffi_boundary(BridgeResult::Internal, || {
        // SAFETY: Forwarded caller guarantee.
        unsafe { reply(channel, data, len, |ch, p| ch.respond_error(id, p)) }
    })
}

unsafe fn reply(
    channel: BridgeChannelHandle,
    data: *const u8,
    len: usize,
    send: impl FnOnce(&AsyncChannel<FfiTransport>, &[u8]) -> bridgewire_channel::Result<()>,
) -> BridgeResult {
    error::clear_error_state();

    // SAFETY: Forwarded caller guarantee.
    let Some(handle) = (unsafe { channel_arg(channel) }) else {
        return BridgeResult::InvalidArgument;
    };
    // SAFETY: We validate pointer/length pairing in helper.
    let Some(payload) = (unsafe { bytes_arg(data, len, "data") }) else {
        return BridgeResult::InvalidArgument;
    };

    match send(&handle.channel, payload) {
        Ok(()) => BridgeResult::Ok,
        Err(err) => error::map_channel_error(&err),
    }
}

/// Number of requests awaiting a reply. Returns 0 for a null handle.
///
/// # Safety
/// `channel` must be null or a live channel handle.
#[no_mangle]
pub unsafe extern "C" fn bridge_channel_pending_count(channel: BridgeChannelHandle) -> usize {
    crate::ffi_boundary(0, || {
        // SAFETY: Forwarded caller guarantee.
        match unsafe { channel_arg(channel) } {
            Some(handle) => handle.channel.pending_count(),
            None => 0,
        }
    })
}

/// Reject the outstanding request `id` with `Cancelled` and forget it.
///
/// Returns false when no such request is outstanding or the handle is null.
/// A reply arriving later for `id` is discarded.
///
/// # Safety
/// `channel` must be null or a live channel handle.
#[no_mangle]
pub unsafe extern "C" fn bridge_channel_cancel(channel: BridgeChannelHandle, id: u32) -> bool {
    crate::ffi_boundary(false, || {
        // SAFETY: Forwarded caller guarantee.
        match unsafe { channel_arg(channel) } {
            Some(handle) => handle.channel.cancel(id),
            None => false,
        }
    })
}

/// Reject every outstanding request with `ChannelClosed` and refuse new traffic.
///
/// Idempotent. The handle stays valid until `bridge_channel_free`.
///
/// # Safety
/// `channel` must be a live channel handle.
#[no_mangle]
pub unsafe extern "C" fn bridge_channel_close(channel: BridgeChannelHandle) -> BridgeResult {
    crate::ffi_boundary(BridgeResult::Internal, || {
        error::clear_error_state();

        // SAFETY: Forwarded caller guarantee.
        let Some(handle) = (unsafe { channel_arg(channel) }) else {
            return BridgeResult::InvalidArgument;
        };
        handle.channel.close();
        BridgeResult::Ok
    })
}

/// Close and free a channel handle. Outstanding promise handles stay valid
/// and report `ChannelClosed`.
///
/// # Safety
/// `channel` must be null or a handle previously returned by `bridge_channel_new`,
/// and no other thread may be using it.
#[no_mangle]
pub unsafe extern "C" fn bridge_channel_free(channel: BridgeChannelHandle) {
    crate::ffi_boundary((), || {
        if channel.is_null() {
            return;
        }

        // SAFETY: Caller guarantees this handle was allocated by bridge_channel_new.
        unsafe {
            drop(Box::from_raw(channel as *mut ChannelHandle));
        }
    });
}

#[cfg(test)]
pub(crate) mod tests {
    use std::sync::Mutex;

    use bridgewire_frame::MessageType;

    use super::*;
    use crate::args::release_buffer;
    use crate::promise::{bridge_promise_free, bridge_promise_is_settled, bridge_promise_wait};
    use crate::types::BridgeBuffer;

    #[derive(Default)]
    pub(crate) struct Recorder {
        pub(crate) frames: Mutex<Vec<Vec<u8>>>,
        pub(crate) fail: bool,
    }

    pub(crate) unsafe extern "C" fn record(user_data: *mut c_void, data: *const u8, len: usize) -> i32 {
        // SAFETY: Tests pass a pointer to a live Recorder.
        let recorder = unsafe { &*(user_data as *const Recorder) };
        if recorder.fail {
            return -1;
        }
        // SAFETY: The library passes a frame readable for `len` bytes.
        let frame = unsafe { std::slice::from_raw_parts(data, len) };
        recorder.frames.lock().unwrap().push(frame.to_vec());
        0
    }

    pub(crate) fn new_channel(recorder: &Recorder) -> BridgeChannelHandle {
        // SAFETY: The recorder outlives every channel created in a test.
        let handle = unsafe {
            bridge_channel_new(Some(record), recorder as *const Recorder as *mut c_void)
        };
        assert!(!handle.is_null());
        handle
    }

    #[test]
    fn new_rejects_null_callback() {
        // SAFETY: Null is an accepted argument.
        let handle = unsafe { bridge_channel_new(None, std::ptr::null_mut()) };
        assert!(handle.is_null());
    }

    #[test]
    fn request_then_response_over_c_abi() {
        let recorder = Recorder::default();
        let channel = new_channel(&recorder);

        let mut id = 0u32;
        let mut promise: BridgePromiseHandle = std::ptr::null_mut();
        // SAFETY: All pointers are valid locals.
        let rc = unsafe { bridge_channel_request(channel, b"ping".as_ptr(), 4, &mut id, &mut promise) };
        assert_eq!(rc, BridgeResult::Ok);
        assert_eq!(unsafe { bridge_channel_pending_count(channel) }, 1);

        let sent = recorder.frames.lock().unwrap()[0].clone();
        let request = Message::decode(&sent).unwrap();
        assert_eq!(request.id(), id);
        assert_eq!(request.payload(), b"ping");

        let reply = Message::new(MessageType::Response, id, b"pong").unwrap().encode();
        let mut inbound = BridgeInbound::default();
        // SAFETY: All pointers are valid locals.
        let rc = unsafe { bridge_channel_handle_incoming(channel, reply.as_ptr(), reply.len(), &mut inbound) };
        assert_eq!(rc, BridgeResult::Ok);
        assert_eq!(inbound.disposition, BRIDGE_INBOUND_ROUTED);
        assert_eq!(inbound.id, id);
        assert!(inbound.payload.data.is_null());

        let mut out = BridgeBuffer::default();
        unsafe {
            assert!(bridge_promise_is_settled(promise));
            assert_eq!(bridge_promise_wait(promise, 0, &mut out), BridgeResult::Ok);
            assert_eq!(std::slice::from_raw_parts(out.data, out.len), b"pong");
            release_buffer(&mut out);
            bridge_promise_free(promise);
            bridge_channel_free(channel);
        }
    }

    #[test]
    fn incoming_request_payload_is_copied_out() {
        let recorder = Recorder::default();
        let channel = new_channel(&recorder);

        let frame = Message::new(MessageType::Request, 12, b"open").unwrap().encode();
        let mut inbound = BridgeInbound::default();
        unsafe {
            let rc = bridge_channel_handle_incoming(channel, frame.as_ptr(), frame.len(), &mut inbound);
            assert_eq!(rc, BridgeResult::Ok);
            assert_eq!(inbound.disposition, BRIDGE_INBOUND_REQUEST);
            assert_eq!(inbound.kind, crate::types::BRIDGE_TYPE_REQUEST);
            assert_eq!(std::slice::from_raw_parts(inbound.payload.data, inbound.payload.len), b"open");

            assert_eq!(bridge_channel_respond(channel, inbound.id, b"ok".as_ptr(), 2), BridgeResult::Ok);
            release_buffer(&mut inbound.payload);
            bridge_channel_free(channel);
        }

        let answer = Message::decode(&recorder.frames.lock().unwrap()[0]).unwrap();
        assert_eq!((answer.kind(), answer.id()), (MessageType::Response, 12));
    }

    #[test]
    fn malformed_frame_reports_invalid_message() {
        let recorder = Recorder::default();
        let channel = new_channel(&recorder);
        let mut inbound = BridgeInbound::default();
        unsafe {
            let rc = bridge_channel_handle_incoming(channel, b"junk".as_ptr(), 4, &mut inbound);
            assert_eq!(rc, BridgeResult::InvalidMessage);
            bridge_channel_free(channel);
        }
    }

    #[test]
    fn failing_callback_maps_to_transport() {
        let recorder = Recorder {
            fail: true,
            ..Recorder::default()
        };
        let channel = new_channel(&recorder);
        let mut promise: BridgePromiseHandle = std::ptr::null_mut();
        unsafe {
            let rc = bridge_channel_request(channel, std::ptr::null(), 0, std::ptr::null_mut(), &mut promise);
            assert_eq!(rc, BridgeResult::Transport);
            assert!(promise.is_null());
            assert_eq!(bridge_channel_pending_count(channel), 0);
            assert_eq!(bridge_channel_stream(channel, std::ptr::null(), 0, std::ptr::null_mut()), BridgeResult::Transport);
            bridge_channel_free(channel);
        }
    }

    #[test]
    fn null_data_with_length_is_invalid() {
        let recorder = Recorder::default();
        let channel = new_channel(&recorder);
        unsafe {
            let rc = bridge_channel_send_binary(channel, std::ptr::null(), 3, std::ptr::null_mut());
            assert_eq!(rc, BridgeResult::InvalidArgument);
            bridge_channel_free(channel);
        }
    }

    #[test]
    fn close_then_free_leaves_promise_rejected() {
        let recorder = Recorder::default();
        let channel = new_channel(&recorder);
        let mut promise: BridgePromiseHandle = std::ptr::null_mut();
        let mut out = BridgeBuffer::default();
        unsafe {
            assert_eq!(
                bridge_channel_request(channel, b"q".as_ptr(), 1, std::ptr::null_mut(), &mut promise),
                BridgeResult::Ok
            );
            assert_eq!(bridge_channel_close(channel), BridgeResult::Ok);
            assert_eq!(bridge_channel_close(channel), BridgeResult::Ok);
            assert_eq!(
                bridge_channel_send_binary(channel, b"x".as_ptr(), 1, std::ptr::null_mut()),
                BridgeResult::ChannelClosed
            );
            bridge_channel_free(channel);

            assert_eq!(bridge_promise_wait(promise, 10, &mut out), BridgeResult::ChannelClosed);
            bridge_promise_free(promise);
        }
    }
}
