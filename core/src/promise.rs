//! One-shot promise: a single outcome handed from a producer to one consumer.
//!
//! [`channel`] returns a [`Resolver`] (producer side, cloneable) and a
//! [`Pending`] (consumer side). The first `resolve`/`reject` wins; every later
//! attempt is refused with [`SettleError::AlreadySettled`] and leaves the
//! stored outcome alone.
//!
//! The outcome travels over a `tokio::sync::oneshot` channel whose sender sits
//! in a mutex-guarded slot. Settling takes the sender out of the slot, so the
//! transition is a single-writer operation even when resolvers race on
//! different threads. Dropping every resolver without settling drops the
//! sender, and the consumer observes [`AwaitError::Abandoned`] instead of
//! waiting forever.

use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use thiserror::Error;
use tokio::sync::oneshot;
use tokio::sync::oneshot::error::TryRecvError;

/// Lifecycle of a promise. `Pending` is left exactly once.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum State {
    Pending,
    Resolved,
    Rejected,
}

impl State {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Resolved => "resolved",
            Self::Rejected => "rejected",
        }
    }

    #[must_use]
    pub fn is_settled(self) -> bool {
        self != Self::Pending
    }
}

impl fmt::Display for State {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A settle attempt on a promise that already has an outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum SettleError {
    #[error("promise already {0}")]
    AlreadySettled(State),
}

/// Why waiting on a promise did not produce a value.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AwaitError<E> {
    #[error("{0}")]
    Rejected(E),
    #[error("promise was dropped before it settled")]
    Abandoned,
}

struct Slot<T, E> {
    state: State,
    tx: Option<oneshot::Sender<Result<T, E>>>,
}

/// Producer side of a promise.
///
/// Clones share one slot; whichever clone settles first decides the outcome.
pub struct Resolver<T, E> {
    slot: Arc<Mutex<Slot<T, E>>>,
}

impl<T, E> Clone for Resolver<T, E> {
    fn clone(&self) -> Self {
        Self {
            slot: Arc::clone(&self.slot),
        }
    }
}

impl<T, E> fmt::Debug for Resolver<T, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Resolver")
            .field("state", &self.state())
            .finish()
    }
}

/// Consumer side of a promise.
pub struct Pending<T, E> {
    // Cleared once `try_take` has handed out the outcome.
    rx: Option<oneshot::Receiver<Result<T, E>>>,
}

impl<T, E> fmt::Debug for Pending<T, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pending").finish_non_exhaustive()
    }
}

/// Create a pending promise.
#[must_use]
pub fn channel<T, E>() -> (Resolver<T, E>, Pending<T, E>) {
    let (tx, rx) = oneshot::channel();
    let slot = Slot {
        state: State::Pending,
        tx: Some(tx),
    };
    (
        Resolver {
            slot: Arc::new(Mutex::new(slot)),
        },
        Pending { rx: Some(rx) },
    )
}

impl<T, E> Resolver<T, E> {
    pub fn resolve(&self, value: T) -> Result<(), SettleError> {
        self.settle(Ok(value))
    }

    pub fn reject(&self, error: E) -> Result<(), SettleError> {
        self.settle(Err(error))
    }

    #[must_use]
    pub fn state(&self) -> State {
        self.lock().state
    }

    #[must_use]
    pub fn is_settled(&self) -> bool {
        self.state().is_settled()
    }

    fn settle(&self, outcome: Result<T, E>) -> Result<(), SettleError> {
        let tx = {
            let mut slot = self.lock();
            if slot.state.is_settled() {
                tracing::debug!(state = %slot.state, "Ignoring settle on an already-settled promise");
                return Err(SettleError::AlreadySettled(slot.state));
            }
            slot.state = if outcome.is_ok() {
                State::Resolved
            } else {
                State::Rejected
            };
            slot.tx.take()
        };

        if let Some(tx) = tx
            && tx.send(outcome).is_err()
        {
            tracing::trace!("Promise settled after its consumer was dropped");
        }
        Ok(())
    }

    // A panic while the lock is held cannot leave the slot half-written:
    // `state` and `tx` are updated before anything that can unwind.
    fn lock(&self) -> MutexGuard<'_, Slot<T, E>> {
        self.slot.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl<T, E> Pending<T, E> {
    /// Wait for the outcome.
    ///
    /// Yields to the scheduler once before waiting, so a producer queued on
    /// the same carrier gets to run first.
    pub async fn wait(self) -> Result<T, AwaitError<E>> {
        tokio::task::yield_now().await;
        match self.rx {
            Some(rx) => flatten(rx.await.ok()),
            None => Err(AwaitError::Abandoned),
        }
    }

    /// Block the current OS thread until the outcome arrives.
    ///
    /// Must not be called from inside an async runtime.
    pub fn blocking_wait(self) -> Result<T, AwaitError<E>> {
        match self.rx {
            Some(rx) => flatten(rx.blocking_recv().ok()),
            None => Err(AwaitError::Abandoned),
        }
    }

    /// Take the outcome if it has already arrived.
    ///
    /// Returns `None` while pending. After an outcome has been taken, later
    /// calls report [`AwaitError::Abandoned`].
    pub fn try_take(&mut self) -> Option<Result<T, AwaitError<E>>> {
        let Some(rx) = self.rx.as_mut() else {
            return Some(Err(AwaitError::Abandoned));
        };
        let taken = match rx.try_recv() {
            Ok(outcome) => flatten(Some(outcome)),
            Err(TryRecvError::Empty) => return None,
            Err(TryRecvError::Closed) => Err(AwaitError::Abandoned),
        };
        self.rx = None;
        Some(taken)
    }
}

fn flatten<T, E>(received: Option<Result<T, E>>) -> Result<T, AwaitError<E>> {
    match received {
        Some(Ok(value)) => Ok(value),
        Some(Err(error)) => Err(AwaitError::Rejected(error)),
        None => Err(AwaitError::Abandoned),
    }
}
