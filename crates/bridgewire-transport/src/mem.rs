//! In-process frame queue.
//!
//! Both ends live in the same memory space; frames move by handing over the
//! `Bytes` buffer, never by copying.

use std::sync::mpsc::{self, RecvTimeoutError, TryRecvError};
use std::time::Duration;

use bytes::Bytes;

use crate::error::{Result, TransportError};
use crate::traits::Transport;

/// Create a connected sender/receiver pair.
pub fn pipe() -> (MemorySender, MemoryReceiver) {
    let (tx, rx) = mpsc::channel();
    (MemorySender { tx }, MemoryReceiver { rx })
}

/// Sending half of an in-process pipe. Cloneable; each clone feeds the same queue.
#[derive(Debug, Clone)]
pub struct MemorySender {
    tx: mpsc::Sender<Bytes>,
}

impl Transport for MemorySender {
    fn send(&self, frame: Bytes) -> Result<()> {
        self.tx.send(frame).map_err(|_| TransportError::Closed)
    }
}

/// Receiving half of an in-process pipe.
#[derive(Debug)]
pub struct MemoryReceiver {
    rx: mpsc::Receiver<Bytes>,
}

impl MemoryReceiver {
    /// Block until the next frame arrives.
    ///
    /// Returns `Err(TransportError::Closed)` once every sender is gone and
    /// the queue is drained.
    pub fn recv(&self) -> Result<Bytes> {
        self.rx.recv().map_err(|_| TransportError::Closed)
    }

    /// Block for at most `timeout`. `Ok(None)` means nothing arrived in time.
    pub fn recv_timeout(&self, timeout: Duration) -> Result<Option<Bytes>> {
        match self.rx.recv_timeout(timeout) {
            Ok(frame) => Ok(Some(frame)),
            Err(RecvTimeoutError::Timeout) => Ok(None),
            Err(RecvTimeoutError::Disconnected) => Err(TransportError::Closed),
        }
    }

    /// Return a queued frame without blocking.
    pub fn try_recv(&self) -> Result<Option<Bytes>> {
        match self.rx.try_recv() {
            Ok(frame) => Ok(Some(frame)),
            Err(TryRecvError::Empty) => Ok(None),
            Err(TryRecvError::Disconnected) => Err(TransportError::Closed),
        }
    }

    /// Borrow an iterator that yields frames until the pipe closes.
    pub fn iter(&self) -> impl Iterator<Item = Bytes> + '_ {
        self.rx.iter()
    }
}
