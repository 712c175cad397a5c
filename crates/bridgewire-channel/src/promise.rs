//! Single-assignment promise that can be awaited without an event loop.

use std::fmt;
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use bytes::Bytes;

use crate::error::{ChannelError, Result};

/// Why a promise was rejected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Rejection {
    /// The peer answered with an `Error` message carrying this payload.
    Remote(Bytes),
    /// The channel closed while the request was outstanding.
    ChannelClosed,
    /// The request was cancelled locally.
    Cancelled,
}

impl From<Rejection> for ChannelError {
    fn from(rejection: Rejection) -> Self {
        match rejection {
            Rejection::Remote(payload) => ChannelError::Rejected(payload),
            Rejection::ChannelClosed => ChannelError::ChannelClosed,
            Rejection::Cancelled => ChannelError::Cancelled,
        }
    }
}

enum State {
    Pending,
    Resolved(Bytes),
    Rejected(Rejection),
}

impl State {
    fn outcome(&self) -> Option<Result<Bytes>> {
        match self {
            State::Pending => None,
            State::Resolved(payload) => Some(Ok(payload.clone())),
            State::Rejected(rejection) => Some(Err(rejection.clone().into())),
        }
    }

    fn name(&self) -> &'static str {
        match self {
            State::Pending => "pending",
            State::Resolved(_) => "resolved",
            State::Rejected(_) => "rejected",
        }
    }
}

struct Shared {
    state: Mutex<State>,
    settled: Condvar,
}

/// A write-once result slot shared between a producer and a waiter.
///
/// The producer (usually the thread delivering transport events) calls
/// [`resolve`](Promise::resolve) or [`reject`](Promise::reject) exactly once;
/// the first settlement wins and later calls are ignored. The consumer polls
/// with [`try_result`](Promise::try_result) or blocks in
/// [`wait`](Promise::wait). Cloning yields another handle to the same slot.
#[derive(Clone)]
pub struct Promise {
    shared: Arc<Shared>,
}

impl Promise {
    /// Create an unresolved promise.
    pub fn new() -> Self {
        Self {
            shared: Arc::new(Shared {
                state: Mutex::new(State::Pending),
                settled: Condvar::new(),
            }),
        }
    }

    /// Resolve with a copy of `payload`.
    ///
    /// Returns `false`, leaving the stored outcome untouched, if the promise
    /// was already settled.
    pub fn resolve(&self, payload: &[u8]) -> bool {
        self.settle(State::Resolved(Bytes::copy_from_slice(payload)))
    }

    /// Reject with `rejection`. Same single-assignment rule as [`resolve`](Promise::resolve).
    pub fn reject(&self, rejection: Rejection) -> bool {
        self.settle(State::Rejected(rejection))
    }

    fn settle(&self, next: State) -> bool {
        let mut state = self.lock();
        if !matches!(*state, State::Pending) {
            tracing::trace!(
                current = state.name(),
                ignored = next.name(),
                "promise already settled"
            );
            return false;
        }
        *state = next;
        drop(state);
        self.shared.settled.notify_all();
        true
    }

    /// Returns true once resolved or rejected.
    pub fn is_settled(&self) -> bool {
        !matches!(*self.lock(), State::Pending)
    }

    /// Non-blocking poll: `None` while unresolved.
    pub fn try_result(&self) -> Option<Result<Bytes>> {
        self.lock().outcome()
    }

    /// Block until the promise settles or `timeout` elapses.
    ///
    /// `None`, a zero duration, or a duration too large to form a deadline
    /// waits indefinitely. A timeout returns [`ChannelError::Timeout`] and
    /// leaves the promise unresolved, so a late settlement is still
    /// observable through a later `wait` or `try_result`.
    pub fn wait(&self, timeout: Option<Duration>) -> Result<Bytes> {
        let deadline = timeout
            .filter(|t| !t.is_zero())
            .and_then(|t| Instant::now().checked_add(t).map(|at| (at, t)));

        let mut state = self.lock();
        loop {
            if let Some(outcome) = state.outcome() {
                return outcome;
            }

            state = match deadline {
                Some((deadline, timeout)) => {
                    let now = Instant::now();
                    if now >= deadline {
                        return Err(ChannelError::Timeout(timeout));
                    }
                    let (guard, _) = self
                        .shared
                        .settled
                        .wait_timeout(state, deadline - now)
                        .unwrap_or_else(PoisonError::into_inner);
                    guard
                }
                None => self
                    .shared
                    .settled
                    .wait(state)
                    .unwrap_or_else(PoisonError::into_inner),
            };
        }
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.shared
            .state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for Promise {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Promise {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Promise")
            .field("state", &self.lock().name())
            .finish()
    }
}
