//! Transport boundary for the bridgewire bridge.
//!
//! The bridge core defines framing and correlation, not the medium that moves
//! encoded frames between the native host and the script context. This crate
//! holds the seam the core consumes:
//! - [`Transport`], the outbound byte sink
//! - [`mem::pipe`], an in-process frame queue for a single memory space
//! - [`WriteTransport`], a sink over any `Write` stream

pub mod error;
pub mod mem;
pub mod traits;

pub use error::{Result, TransportError};
pub use mem::{pipe, MemoryReceiver, MemorySender};
pub use traits::{from_fn, FnTransport, Transport, WriteTransport};
