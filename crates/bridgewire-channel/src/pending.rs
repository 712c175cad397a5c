use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::error::{ChannelError, Result};
use crate::promise::{Promise, Rejection};

struct Inner {
    entries: HashMap<u32, Promise>,
    closed: bool,
}

/// Outstanding requests keyed by correlation id.
///
/// All access goes through one mutex that is never held across a blocking
/// call; promises are settled outside the lock except during [`close`](PendingTable::close),
/// where settling only takes each promise's own short-lived lock.
pub struct PendingTable {
    inner: Mutex<Inner>,
    max_pending: usize,
}

impl PendingTable {
    pub fn new(max_pending: usize) -> Self {
        Self {
            inner: Mutex::new(Inner {
                entries: HashMap::new(),
                closed: false,
            }),
            max_pending,
        }
    }

    /// Insert `promise` under the first id from `next_id` that is not outstanding.
    ///
    /// Fails with [`ChannelError::ChannelClosed`] once the table is closed and
    /// with [`ChannelError::TooManyPending`] when `max_pending` entries exist.
    pub fn register(&self, mut next_id: impl FnMut() -> u32, promise: Promise) -> Result<u32> {
        let mut inner = self.lock();
        if inner.closed {
            return Err(ChannelError::ChannelClosed);
        }
        if inner.entries.len() >= self.max_pending {
            tracing::warn!(
                pending = inner.entries.len(),
                max = self.max_pending,
                "rejecting request: too many pending"
            );
            return Err(ChannelError::TooManyPending {
                pending: inner.entries.len(),
                max: self.max_pending,
            });
        }

        let id = loop {
            let id = next_id();
            if !inner.entries.contains_key(&id) {
                break id;
            }
            tracing::debug!(id, "skipping correlation id still outstanding");
        };

        inner.entries.insert(id, promise);
        tracing::debug!(id, pending = inner.entries.len(), "registered request");
        Ok(id)
    }

    /// Remove and return the promise for `id`.
    pub fn take(&self, id: u32) -> Option<Promise> {
        self.lock().entries.remove(&id)
    }

    /// Remove the entry for `id` without settling it. Returns true if it existed.
    pub fn remove(&self, id: u32) -> bool {
        self.take(id).is_some()
    }

    pub fn contains(&self, id: u32) -> bool {
        self.lock().entries.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().entries.is_empty()
    }

    /// Outstanding ids in ascending order.
    pub fn ids(&self) -> Vec<u32> {
        let mut ids: Vec<u32> = self.lock().entries.keys().copied().collect();
        ids.sort_unstable();
        ids
    }

    pub fn max_pending(&self) -> usize {
        self.max_pending
    }

    pub fn is_closed(&self) -> bool {
        self.lock().closed
    }

    /// Refuse further registrations and reject every entry with
    /// [`Rejection::ChannelClosed`]. Returns the number of entries rejected;
    /// calling it again returns 0.
    pub fn close(&self) -> usize {
        let drained: Vec<Promise> = {
            let mut inner = self.lock();
            inner.closed = true;
            inner.entries.drain().map(|(_, promise)| promise).collect()
        };

        for promise in &drained {
            promise.reject(Rejection::ChannelClosed);
        }
        drained.len()
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl std::fmt::Debug for PendingTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let inner = self.lock();
        f.debug_struct("PendingTable")
            .field("pending", &inner.entries.len())
            .field("max_pending", &self.max_pending)
            .field("closed", &inner.closed)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn counter(start: u32) -> impl FnMut() -> u32 {
        let mut next = start;
        move || {
            let id = next;
            next = next.wrapping_add(1);
            id
        }
    }

    #[test]
    fn register_and_take() {
        let table = PendingTable::new(8);
        let promise = Promise::new();
        let id = table.register(counter(7), promise.clone()).unwrap();
        assert_eq!(id, 7);
        assert!(table.contains(7));

        let taken = table.take(7).unwrap();
        taken.resolve(b"ok");
        assert!(promise.is_settled());
        assert!(table.is_empty());
        assert!(table.take(7).is_none());
    }

    #[test]
    fn occupied_ids_are_skipped() {
        let table = PendingTable::new(8);
        table.register(|| 5, Promise::new()).unwrap();

        let mut ids = counter(5);
        let id = table.register(&mut ids, Promise::new()).unwrap();
        assert_eq!(id, 6);
        assert_eq!(table.ids(), vec![5, 6]);
    }

    #[test]
    fn enforces_max_pending() {
        let table = PendingTable::new(2);
        let mut ids = counter(1);
        table.register(&mut ids, Promise::new()).unwrap();
        table.register(&mut ids, Promise::new()).unwrap();

        let err = table.register(&mut ids, Promise::new()).unwrap_err();
        assert!(matches!(
            err,
            ChannelError::TooManyPending { pending: 2, max: 2 }
        ));

        assert!(table.remove(1));
        assert!(table.register(&mut ids, Promise::new()).is_ok());
    }

    #[test]
    fn close_rejects_everything_once() {
        let table = PendingTable::new(8);
        let mut ids = counter(1);
        let promises: Vec<Promise> = (0..3).map(|_| Promise::new()).collect();
        for promise in &promises {
            table.register(&mut ids, promise.clone()).unwrap();
        }

        assert_eq!(table.close(), 3);
        assert!(table.is_empty());
        assert!(table.is_closed());
        for promise in &promises {
            assert!(matches!(
                promise.try_result(),
                Some(Err(ChannelError::ChannelClosed))
            ));
        }

        assert_eq!(table.close(), 0);
        assert!(matches!(
            table.register(&mut ids, Promise::new()),
            Err(ChannelError::ChannelClosed)
        ));
    }

    #[test]
    fn close_leaves_settled_promises_alone() {
        let table = PendingTable::new(8);
        let promise = Promise::new();
        table.register(|| 1, promise.clone()).unwrap();
        promise.resolve(b"already");

        assert_eq!(table.close(), 1);
        assert_eq!(promise.wait(None).unwrap().as_ref(), b"already");
    }

    #[test]
    fn ids_are_sorted() {
        let table = PendingTable::new(8);
        for id in [30, 10, 20] {
            table.register(move || id, Promise::new()).unwrap();
        }
        assert_eq!(table.ids(), vec![10, 20, 30]);
    }
}
