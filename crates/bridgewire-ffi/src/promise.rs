use std::time::Duration;

use bridgewire_channel::{ChannelError, Result as ChannelResult};
use bytes::Bytes;

use crate::args::{promise_arg, release_buffer, write_buffer};
use crate::error;
use crate::types::{BridgeBuffer, BridgePromiseHandle, BridgeResult, PromiseHandle};

/// Block until the promise settles or `timeout_ms` elapses (0 waits indefinitely).
///
/// On `Ok` the reply payload is copied into `*out`. On `Rejected` `*out`
/// receives the payload of the peer's `Error` message. `out` may be null when
/// the payload is not needed; otherwise release it with `bridge_buffer_free`.
///
/// # Safety
/// `promise` must be a live promise handle. `out` must be null or valid for
/// writes with a `data` field that is null or library-owned.
#[no_mangle]
pub unsafe extern "C" fn bridge_promise_wait(
    promise: BridgePromiseHandle,
    timeout_ms: u64,
    out: *mut BridgeBuffer,
) -> BridgeResult {
    crate::ffi_boundary(BridgeResult::Internal, || {
        error::clear_error_state();

        // SAFETY: Forwarded caller guarantee.
        let Some(handle) = (unsafe { promise_arg(promise) }) else {
            return BridgeResult::InvalidArgument;
        };

        let outcome = handle.promise.wait(Some(Duration::from_millis(timeout_ms)));
        // SAFETY: Forwarded caller guarantee.
        unsafe { report_outcome(outcome, out) }
    })
}

/// Poll the promise without blocking.
///
/// Returns `Pending` while no reply has arrived and leaves `*out` untouched.
/// Once settled it reports exactly what [`bridge_promise_wait`] would.
///
/// # Safety
/// Same contract as [`bridge_promise_wait`].
#[no_mangle]
pub unsafe extern "C" fn bridge_promise_try_result(
    promise: BridgePromiseHandle,
    out: *mut BridgeBuffer,
) -> BridgeResult {
    crate::ffi_boundary(BridgeResult::Internal, || {
        error::clear_error_state();

        // SAFETY: Forwarded caller guarantee.
        let Some(handle) = (unsafe { promise_arg(promise) }) else {
            return BridgeResult::InvalidArgument;
        };

        match handle.promise.try_result() {
            // SAFETY: Forwarded caller guarantee.
            Some(outcome) => unsafe { report_outcome(outcome, out) },
            None => BridgeResult::Pending,
        }
    })
}

/// Copy the settled payload into `out` (when non-null) and map the outcome.
///
/// # Safety
/// `out` must be null or valid for writes with a `data` field that is null
/// or library-owned.
unsafe fn report_outcome(outcome: ChannelResult<Bytes>, out: *mut BridgeBuffer) -> BridgeResult {
    let payload = match &outcome {
        Ok(payload) => Some(payload),
        Err(ChannelError::Rejected(payload)) => Some(payload),
        Err(_) => None,
    };

    if let (Some(payload), false) = (payload, out.is_null()) {
        // SAFETY: Non-null; validity guaranteed by the caller.
        unsafe { write_buffer(&mut *out, payload) };
    }

    match outcome {
        Ok(_) => BridgeResult::Ok,
        Err(err) => error::map_channel_error(&err),
    }
}

/// Returns true once the promise is resolved or rejected. False for a null handle.
///
/// # Safety
/// `promise` must be null or a live promise handle.
#[no_mangle]
pub unsafe extern "C" fn bridge_promise_is_settled(promise: BridgePromiseHandle) -> bool {
    crate::ffi_boundary(false, || {
        // SAFETY: Forwarded caller guarantee.
        match unsafe { promise_arg(promise) } {
            Some(handle) => handle.promise.is_settled(),
            None => false,
        }
    })
}

/// Free a promise handle. The underlying request stays outstanding until its
/// reply arrives or the channel closes.
///
/// # Safety
/// `promise` must be null or a handle returned by `bridge_channel_request`,
/// and no other thread may be waiting on it.
#[no_mangle]
pub unsafe extern "C" fn bridge_promise_free(promise: BridgePromiseHandle) {
    crate::ffi_boundary((), || {
        if promise.is_null() {
            return;
        }

        // SAFETY: Caller guarantees this handle was allocated by bridge_channel_request.
        unsafe {
            drop(Box::from_raw(promise as *mut PromiseHandle));
        }
    });
}

/// Free payload memory held by a [`BridgeBuffer`] filled by this library.
///
/// # Safety
/// `buf` must be null or point to a `BridgeBuffer` whose `data` is null or
/// was allocated by this library.
#[no_mangle]
pub unsafe extern "C" fn bridge_buffer_free(buf: *mut BridgeBuffer) {
    crate::ffi_boundary((), || {
        if buf.is_null() {
            return;
        }

        // SAFETY: Pointer validity is guaranteed by the caller.
        unsafe { release_buffer(&mut *buf) };
    });
}
