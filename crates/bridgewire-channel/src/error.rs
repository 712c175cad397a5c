use std::time::Duration;

use bytes::Bytes;

/// Errors that can occur in channel operations.
#[derive(Debug, thiserror::Error)]
pub enum ChannelError {
    /// Frame-level error (message too large, malformed frame, payload codec).
    #[error("frame error: {0}")]
    Frame(#[from] bridgewire_frame::FrameError),

    /// The transport refused the outgoing frame.
    #[error("transport error: {0}")]
    Transport(#[from] bridgewire_transport::TransportError),

    /// A wait exceeded its deadline.
    #[error("request timed out after {0:?}")]
    Timeout(Duration),

    /// The channel was closed while the request was outstanding, or before it was issued.
    #[error("channel closed")]
    ChannelClosed,

    /// The peer answered with an `Error` message.
    #[error("request rejected by peer: {}", preview(.0))]
    Rejected(Bytes),

    /// The request was cancelled locally.
    #[error("request cancelled")]
    Cancelled,

    /// Too many requests are outstanding on this channel.
    #[error("too many pending requests ({pending}, max {max})")]
    TooManyPending { pending: usize, max: usize },
}

impl ChannelError {
    /// Returns true when issuing a new request may succeed where this one failed.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            ChannelError::Timeout(_) | ChannelError::TooManyPending { .. }
        )
    }
}

fn preview(payload: &Bytes) -> String {
    match std::str::from_utf8(payload) {
        Ok(text) => text.to_string(),
        Err(_) => format!("<binary {} bytes>", payload.len()),
    }
}

pub type Result<T> = std::result::Result<T, ChannelError>;
