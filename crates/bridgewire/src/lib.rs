//! Message framing and request/response correlation for native web-view bridges.
//!
//! A native host and the script context inside its web-view exchange typed
//! messages over a byte transport. bridgewire defines the 14-byte wire header,
//! correlates requests with their replies, and offers a blocking promise that
//! any native thread can wait on.
//!
//! # Crate Structure
//!
//! - [`transport`]: the outbound byte-sink boundary and an in-process pipe
//! - [`frame`]: wire format, [`frame::Message`] and stream framing
//! - [`channel`]: [`channel::AsyncChannel`], [`channel::Promise`] and the pending-request table

/// Re-export transport types.
pub mod transport {
    pub use bridgewire_transport::*;
}

/// Re-export frame types.
pub mod frame {
    pub use bridgewire_frame::*;
}

/// Re-export channel types.
pub mod channel {
    pub use bridgewire_channel::*;
}
