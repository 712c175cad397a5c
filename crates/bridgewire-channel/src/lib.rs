//! Request/response correlation for the web-view bridge.
//!
//! [`AsyncChannel`] allocates correlation ids, registers a [`Promise`] per
//! outstanding request, hands encoded frames to a [`Transport`] and routes
//! incoming `Response`/`Error` messages back to the waiting promise.
//! No async runtime is required: promises block on a condition variable and
//! can be settled from any thread.
//!
//! [`Transport`]: bridgewire_transport::Transport

pub mod channel;
pub mod config;
pub mod error;
pub mod pending;
pub mod promise;

pub use channel::{AsyncChannel, Inbound};
pub use config::{ChannelConfig, DEFAULT_CALL_TIMEOUT, DEFAULT_MAX_PENDING};
pub use error::{ChannelError, Result};
pub use pending::PendingTable;
pub use promise::{Promise, Rejection};
