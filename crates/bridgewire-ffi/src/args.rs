use crate::error;
use crate::types::{BridgeBuffer, ChannelHandle, PromiseHandle};

/// Convert an optional byte pointer + length into a slice.
///
/// # Safety
/// If `len > 0`, `data` must be non-null and readable for `len` bytes.
pub(crate) unsafe fn bytes_arg<'a>(data: *const u8, len: usize, name: &str) -> Option<&'a [u8]> {
    if len == 0 {
        return Some(&[]);
    }
    if data.is_null() {
        let _ = error::set_invalid_argument(format!("{name} cannot be null when len > 0"));
        return None;
    }

    // SAFETY: Pointer and length are validated above and owned by caller for the call duration.
    Some(unsafe { std::slice::from_raw_parts(data, len) })
}

/// Borrow the channel behind a handle.
///
/// # Safety
/// `handle` must be null or a live handle returned by `bridge_channel_new`.
pub(crate) unsafe fn channel_arg<'a>(handle: *mut std::ffi::c_void) -> Option<&'a ChannelHandle> {
    if handle.is_null() {
        let _ = error::set_invalid_argument("channel handle cannot be null");
        return None;
    }
    // SAFETY: Pointer validity is guaranteed by the caller.
    Some(unsafe { &*(handle as *const ChannelHandle) })
}

/// Borrow the promise behind a handle.
///
/// # Safety
/// `handle` must be null or a live handle returned by `bridge_channel_request`.
pub(crate) unsafe fn promise_arg<'a>(handle: *mut std::ffi::c_void) -> Option<&'a PromiseHandle> {
    if handle.is_null() {
        let _ = error::set_invalid_argument("promise handle cannot be null");
        return None;
    }
    // SAFETY: Pointer validity is guaranteed by the caller.
    Some(unsafe { &*(handle as *const PromiseHandle) })
}

/// Store a copy of `payload` in `out`, releasing whatever `out` held before.
///
/// # Safety
/// `out` must be valid for writes, and any existing `data` must have come from this library.
pub(crate) unsafe fn write_buffer(out: &mut BridgeBuffer, payload: &[u8]) {
    // SAFETY: Forwarded caller guarantee.
    unsafe { release_buffer(out) };
    if payload.is_empty() {
        return;
    }

    let boxed: Box<[u8]> = payload.to_vec().into_boxed_slice();
    out.len = boxed.len();
    out.data = Box::into_raw(boxed) as *mut u8;
}

/// Free the memory held by `buf` and reset it.
///
/// # Safety
/// Non-null `buf.data` must have been allocated by [`write_buffer`].
pub(crate) unsafe fn release_buffer(buf: &mut BridgeBuffer) {
    if !buf.data.is_null() {
        let slice_ptr = std::ptr::slice_from_raw_parts_mut(buf.data, buf.len);
        // SAFETY: `data` was allocated by `Box<[u8]>` in write_buffer.
        unsafe {
            drop(Box::from_raw(slice_ptr));
        }
    }
    *buf = BridgeBuffer::default();
}
