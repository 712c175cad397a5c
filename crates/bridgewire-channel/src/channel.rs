use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use bridgewire_frame::{from_json_payload, to_json_payload, Message, MessageType};
use bridgewire_transport::Transport;
use bytes::Bytes;
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::config::ChannelConfig;
use crate::error::{ChannelError, Result};
use crate::pending::PendingTable;
use crate::promise::{Promise, Rejection};

/// What [`AsyncChannel::handle_incoming`] did with a decoded frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Inbound {
    /// A reply settled the outstanding request `id`.
    Routed { id: u32, kind: MessageType },
    /// A reply for an id with no outstanding request; dropped.
    Discarded { id: u32, kind: MessageType },
    /// The peer issued a request; answer it with [`AsyncChannel::respond`].
    Request(Message),
    /// A one-way stream chunk from the peer.
    Stream(Message),
    /// A one-way binary blob from the peer.
    Binary(Message),
}

/// Correlates outgoing requests with incoming replies over a [`Transport`].
///
/// Every method takes `&self`; share the channel between threads with an
/// `Arc`. Promises returned by [`request`](AsyncChannel::request) are settled
/// by whichever thread feeds replies into
/// [`handle_response`](AsyncChannel::handle_response) or
/// [`handle_incoming`](AsyncChannel::handle_incoming).
pub struct AsyncChannel<T: Transport> {
    transport: T,
    pending: PendingTable,
    next_id: AtomicU32,
    config: ChannelConfig,
}

impl<T: Transport> AsyncChannel<T> {
    pub fn new(transport: T) -> Self {
        Self::with_config(transport, ChannelConfig::default())
    }

    pub fn with_config(transport: T, config: ChannelConfig) -> Self {
        Self {
            transport,
            pending: PendingTable::new(config.max_pending),
            next_id: AtomicU32::new(1),
            config,
        }
    }

    // Wraps at u32::MAX; 0 is never handed out.
    fn allocate_id(&self) -> u32 {
        loop {
            let id = self.next_id.fetch_add(1, Ordering::Relaxed);
            if id != 0 {
                return id;
            }
        }
    }

    /// Send a request and return the promise that its reply will settle.
    pub fn request(&self, payload: &[u8]) -> Result<Promise> {
        self.request_with_id(payload).map(|(_, promise)| promise)
    }

    /// Like [`request`](AsyncChannel::request), also returning the correlation id.
    ///
    /// The entry is registered before the frame reaches the transport, so a
    /// reply delivered from inside `Transport::send` still finds it. If the
    /// send fails the entry is removed again.
    pub fn request_with_id(&self, payload: &[u8]) -> Result<(u32, Promise)> {
        let msg = Message::with_limit(
            MessageType::Request,
            0,
            payload,
            self.config.max_payload_size,
        )?;

        let promise = Promise::new();
        let id = self
            .pending
            .register(|| self.allocate_id(), promise.clone())?;
        let frame = msg.with_id(id).encode();

        if let Err(err) = self.transport.send(frame) {
            self.pending.remove(id);
            tracing::warn!(id, error = %err, "request send failed");
            return Err(err.into());
        }

        tracing::debug!(id, len = payload.len(), "request sent");
        Ok((id, promise))
    }

    /// Settle the outstanding request addressed by a `Response` or `Error` message.
    ///
    /// Returns false when no request with that id is outstanding, or when
    /// `msg` is not a reply type. Either way the message is dropped.
    pub fn handle_response(&self, msg: &Message) -> bool {
        let id = msg.id();
        if !msg.kind().is_reply() {
            tracing::trace!(id, kind = %msg.kind(), "ignoring non-reply message");
            return false;
        }

        let Some(promise) = self.pending.take(id) else {
            tracing::debug!(id, kind = %msg.kind(), "discarding reply for unknown id");
            return false;
        };

        match msg.kind() {
            MessageType::Error => {
                promise.reject(Rejection::Remote(Bytes::copy_from_slice(msg.payload())));
            }
            _ => {
                promise.resolve(msg.payload());
            }
        }
        tracing::debug!(id, kind = %msg.kind(), len = msg.payload().len(), "reply routed");
        true
    }

    /// Decode one frame from the transport and route it.
    ///
    /// Decode failures are returned to the caller; the channel state is not
    /// touched.
    pub fn handle_incoming(&self, frame: &[u8]) -> Result<Inbound> {
        let msg = Message::decode(frame)?;
        let (id, kind) = (msg.id(), msg.kind());

        Ok(match kind {
            MessageType::Response | MessageType::Error => {
                if self.handle_response(&msg) {
                    Inbound::Routed { id, kind }
                } else {
                    Inbound::Discarded { id, kind }
                }
            }
            MessageType::Request => Inbound::Request(msg),
            MessageType::Stream => Inbound::Stream(msg),
            MessageType::Binary => Inbound::Binary(msg),
        })
    }

    /// Send a one-way binary blob. Returns the id it was sent under.
    pub fn send_binary(&self, payload: &[u8]) -> Result<u32> {
        self.send_one_way(MessageType::Binary, payload)
    }

    /// Send a one-way stream chunk. Returns the id it was sent under.
    pub fn stream(&self, payload: &[u8]) -> Result<u32> {
        self.send_one_way(MessageType::Stream, payload)
    }

    fn send_one_way(&self, kind: MessageType, payload: &[u8]) -> Result<u32> {
        if self.pending.is_closed() {
            return Err(ChannelError::ChannelClosed);
        }
        let id = self.allocate_id();
        self.send_message(kind, id, payload)?;
        Ok(id)
    }

    /// Answer the peer's request `id` with a `Response`.
    pub fn respond(&self, id: u32, payload: &[u8]) -> Result<()> {
        self.send_reply(MessageType::Response, id, payload)
    }

    /// Answer the peer's request `id` with an `Error`.
    pub fn respond_error(&self, id: u32, payload: &[u8]) -> Result<()> {
        self.send_reply(MessageType::Error, id, payload)
    }

    fn send_reply(&self, kind: MessageType, id: u32, payload: &[u8]) -> Result<()> {
        if self.pending.is_closed() {
            return Err(ChannelError::ChannelClosed);
        }
        self.send_message(kind, id, payload)
    }

    fn send_message(&self, kind: MessageType, id: u32, payload: &[u8]) -> Result<()> {
        let msg = Message::with_limit(kind, id, payload, self.config.max_payload_size)?;
        self.transport.send(msg.encode()).map_err(|err| {
            tracing::warn!(id, %kind, error = %err, "send failed");
            ChannelError::from(err)
        })?;
        tracing::trace!(id, %kind, len = payload.len(), "message sent");
        Ok(())
    }

    /// Send a request and block for its reply.
    ///
    /// `timeout` of `None` uses [`ChannelConfig::call_timeout`]; a zero
    /// duration waits indefinitely. On timeout the entry is evicted, so a
    /// reply arriving later is discarded as an unknown id.
    pub fn call(&self, payload: &[u8], timeout: Option<Duration>) -> Result<Bytes> {
        let timeout = timeout.or(self.config.call_timeout);
        let (id, promise) = self.request_with_id(payload)?;

        match promise.wait(timeout) {
            Err(ChannelError::Timeout(after)) => {
                if self.pending.remove(id) {
                    tracing::debug!(id, ?after, "request timed out; evicted");
                    Err(ChannelError::Timeout(after))
                } else {
                    // Settled between the deadline and the eviction.
                    promise
                        .try_result()
                        .unwrap_or(Err(ChannelError::Timeout(after)))
                }
            }
            outcome => outcome,
        }
    }

    /// Reject the outstanding request `id` with [`Rejection::Cancelled`] and evict it.
    pub fn cancel(&self, id: u32) -> bool {
        match self.pending.take(id) {
            Some(promise) => {
                promise.reject(Rejection::Cancelled);
                tracing::debug!(id, "request cancelled");
                true
            }
            None => false,
        }
    }

    /// Reject every outstanding request with [`Rejection::ChannelClosed`] and
    /// refuse new traffic. Idempotent; returns how many requests were rejected.
    pub fn close(&self) -> usize {
        let was_closed = self.pending.is_closed();
        let rejected = self.pending.close();
        if !was_closed {
            tracing::debug!(rejected, "channel closed");
        }
        rejected
    }

    pub fn is_closed(&self) -> bool {
        self.pending.is_closed()
    }

    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    /// Outstanding request ids in ascending order.
    pub fn pending_ids(&self) -> Vec<u32> {
        self.pending.ids()
    }

    pub fn config(&self) -> &ChannelConfig {
        &self.config
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Send `value` as a JSON request.
    pub fn request_json<Req: Serialize + ?Sized>(&self, value: &Req) -> Result<Promise> {
        let payload = to_json_payload(value)?;
        self.request(&payload)
    }

    /// Send `value` as a JSON request and decode the JSON reply.
    pub fn call_json<Req, Resp>(&self, value: &Req, timeout: Option<Duration>) -> Result<Resp>
    where
        Req: Serialize + ?Sized,
        Resp: DeserializeOwned,
    {
        let payload = to_json_payload(value)?;
        let reply = self.call(&payload, timeout)?;
        Ok(from_json_payload(&reply)?)
    }
}

impl<T: Transport> Drop for AsyncChannel<T> {
    fn drop(&mut self) {
        self.close();
    }
}

impl<T: Transport> std::fmt::Debug for AsyncChannel<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AsyncChannel")
            .field("pending", &self.pending)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
