use std::cell::RefCell;
use std::ffi::CString;
use std::os::raw::c_char;

use bridgewire_channel::ChannelError;
use bridgewire_frame::FrameError;

use crate::types::BridgeResult;

thread_local! {
    static LAST_ERROR: RefCell<CString> = RefCell::new(CString::default());
}

pub(crate) fn clear_error_state() {
    LAST_ERROR.with(|state| {
        *state.borrow_mut() = CString::default();
    });
}

pub(crate) fn set_error_message(message: impl Into<String>) {
    let sanitized = message.into().replace('\0', "?");
    LAST_ERROR.with(|state| {
        *state.borrow_mut() = CString::new(sanitized).unwrap_or_default();
    });
}

pub(crate) fn set_invalid_argument(message: impl Into<String>) -> BridgeResult {
    set_error_message(message);
    BridgeResult::InvalidArgument
}

pub(crate) fn set_panic_error() {
    set_error_message("panic across FFI boundary");
}

pub(crate) fn map_channel_error(err: &ChannelError) -> BridgeResult {
    set_error_message(err.to_string());
    match err {
        ChannelError::Frame(frame) => match frame {
            FrameError::MessageTooLarge { .. } => BridgeResult::MessageTooLarge,
            FrameError::InvalidMessage(_)
            | FrameError::SerializationFailed(_)
            | FrameError::DeserializationFailed(_) => BridgeResult::InvalidMessage,
            FrameError::Io(_) | FrameError::ConnectionClosed => BridgeResult::Transport,
        },
        ChannelError::Transport(_) => BridgeResult::Transport,
        ChannelError::Timeout(_) => BridgeResult::Timeout,
        ChannelError::ChannelClosed => BridgeResult::ChannelClosed,
        ChannelError::Rejected(_) => BridgeResult::Rejected,
        ChannelError::Cancelled => BridgeResult::Cancelled,
        ChannelError::TooManyPending { .. } => BridgeResult::TooManyPending,
    }
}

pub(crate) fn last_error_ptr() -> *const c_char {
    LAST_ERROR.with(|state| state.borrow().as_ptr())
}
