use std::io::{ErrorKind, Write};
use std::sync::{Arc, Mutex, PoisonError};

use bytes::Bytes;

use crate::error::{Result, TransportError};

/// Outbound byte sink for encoded frames.
///
/// The bridge calls [`Transport::send`] once per frame, after encoding. Once
/// `send` returns the transport owns the bytes. Implementations must be safe
/// to call from several native threads at once.
pub trait Transport: Send + Sync {
    /// Hand one complete frame to the medium.
    fn send(&self, frame: Bytes) -> Result<()>;
}

impl<T: Transport + ?Sized> Transport for Arc<T> {
    fn send(&self, frame: Bytes) -> Result<()> {
        (**self).send(frame)
    }
}

impl<T: Transport + ?Sized> Transport for Box<T> {
    fn send(&self, frame: Bytes) -> Result<()> {
        (**self).send(frame)
    }
}

/// A transport backed by a closure, see [`from_fn`].
pub struct FnTransport<F> {
    f: F,
}

/// Build a transport from a closure that accepts each frame.
pub fn from_fn<F>(f: F) -> FnTransport<F>
where
    F: Fn(Bytes) -> Result<()> + Send + Sync,
{
    FnTransport { f }
}

impl<F> Transport for FnTransport<F>
where
    F: Fn(Bytes) -> Result<()> + Send + Sync,
{
    fn send(&self, frame: Bytes) -> Result<()> {
        (self.f)(frame)
    }
}

impl<F> std::fmt::Debug for FnTransport<F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FnTransport").finish_non_exhaustive()
    }
}

/// Writes frames back-to-back onto a byte stream.
///
/// Frames from concurrent senders never interleave: each frame is written
/// and flushed while holding the stream lock.
#[derive(Debug)]
pub struct WriteTransport<W> {
    inner: Mutex<W>,
}

impl<W: Write + Send> WriteTransport<W> {
    /// Wrap a stream.
    pub fn new(inner: W) -> Self {
        Self {
            inner: Mutex::new(inner),
        }
    }

    /// Consume the transport and return the inner stream.
    pub fn into_inner(self) -> W {
        self.inner
            .into_inner()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Run `f` with the inner stream locked.
    pub fn with_inner<R>(&self, f: impl FnOnce(&mut W) -> R) -> R {
        let mut guard = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        f(&mut guard)
    }
}

impl<W: Write + Send> Transport for WriteTransport<W> {
    fn send(&self, frame: Bytes) -> Result<()> {
        let mut stream = self.inner.lock().unwrap_or_else(PoisonError::into_inner);

        let mut offset = 0usize;
        while offset < frame.len() {
            match stream.write(&frame[offset..]) {
                Ok(0) => return Err(TransportError::Closed),
                Ok(n) => offset += n,
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) if err.kind() == ErrorKind::WouldBlock => continue,
                Err(err) => return Err(TransportError::Io(err)),
            }
        }

        loop {
            match stream.flush() {
                Ok(()) => break,
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) if err.kind() == ErrorKind::WouldBlock => continue,
                Err(err) => return Err(TransportError::Io(err)),
            }
        }

        tracing::trace!(len = frame.len(), "frame written to stream");
        Ok(())
    }
}
