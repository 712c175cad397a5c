use std::time::Duration;

use bridgewire_frame::MAX_PAYLOAD;

/// Default cap on outstanding requests per channel.
pub const DEFAULT_MAX_PENDING: usize = 4096;

/// Default deadline used by [`AsyncChannel::call`](crate::AsyncChannel::call).
pub const DEFAULT_CALL_TIMEOUT: Duration = Duration::from_secs(30);

/// Controls channel limits and blocking behavior.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelConfig {
    /// Largest payload accepted by `request`, `stream`, `send_binary` and `respond`.
    /// Never above the protocol maximum of `u32::MAX` bytes.
    pub max_payload_size: usize,
    /// Maximum number of requests awaiting a reply.
    pub max_pending: usize,
    /// Deadline for `call` when the caller passes none. `None` waits indefinitely.
    pub call_timeout: Option<Duration>,
}

impl Default for ChannelConfig {
    fn default() -> Self {
        Self {
            max_payload_size: MAX_PAYLOAD,
            max_pending: DEFAULT_MAX_PENDING,
            call_timeout: Some(DEFAULT_CALL_TIMEOUT),
        }
    }
}
