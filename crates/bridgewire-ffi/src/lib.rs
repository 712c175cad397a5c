//! bridgewire-ffi: C-ABI exports for the bridgewire channel.
//!
//! The embedding shell supplies a send callback per channel and feeds every
//! frame received from the script context into `bridge_channel_handle_incoming`.

mod args;
mod channel;
mod error;
mod promise;
mod types;

use std::panic::AssertUnwindSafe;

pub use channel::{
    bridge_channel_cancel, bridge_channel_close, bridge_channel_free, bridge_channel_handle_incoming,
    bridge_channel_new, bridge_channel_pending_count, bridge_channel_request,
    bridge_channel_respond, bridge_channel_respond_error, bridge_channel_send_binary,
    bridge_channel_stream,
};
pub use promise::{
    bridge_buffer_free, bridge_promise_free, bridge_promise_is_settled, bridge_promise_try_result,
    bridge_promise_wait,
};
pub use types::{
    BridgeBuffer, BridgeChannelHandle, BridgeInbound, BridgePromiseHandle, BridgeResult,
    BridgeSendFn, BRIDGE_INBOUND_BINARY, BRIDGE_INBOUND_DISCARDED, BRIDGE_INBOUND_REQUEST,
    BRIDGE_INBOUND_ROUTED, BRIDGE_INBOUND_STREAM, BRIDGE_TYPE_BINARY, BRIDGE_TYPE_ERROR,
    BRIDGE_TYPE_REQUEST, BRIDGE_TYPE_RESPONSE, BRIDGE_TYPE_STREAM,
};

fn ffi_boundary<T>(on_panic: T, f: impl FnOnce() -> T) -> T {
    match std::panic::catch_unwind(AssertUnwindSafe(f)) {
        Ok(value) => value,
        Err(_) => {
            error::set_panic_error();
            on_panic
        }
    }
}

#[no_mangle]
pub extern "C" fn bridge_init() -> BridgeResult {
    ffi_boundary(BridgeResult::Internal, || {
        error::clear_error_state();
        BridgeResult::Ok
    })
}

#[no_mangle]
pub extern "C" fn bridge_cleanup() {
    ffi_boundary((), || {
        error::clear_error_state();
    });
}

/// Message for the most recent failure on the calling thread; empty when none.
#[no_mangle]
pub extern "C" fn bridge_last_error() -> *const std::os::raw::c_char {
    ffi_boundary(std::ptr::null(), error::last_error_ptr)
}
