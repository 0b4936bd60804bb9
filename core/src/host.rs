//! In-process host request.
//!
//! [`HostRequest`] behaves like an event-target request object: listeners
//! are registered per event kind, the outcome is stored before listeners
//! run, and the request fires at most once. It backs the scratch store in
//! the shell and the bridge's tests.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use hostbridge_types::{EventKind, HostError, HostValue, ListenerId};
use thiserror::Error;

use crate::handle::{ExternalHandle, Listener};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum FireError {
    #[error("request already fired {0}")]
    AlreadyFired(EventKind),
}

#[derive(Default)]
struct Inner {
    listeners: Vec<(EventKind, ListenerId, Listener)>,
    outcome: Option<Result<HostValue, HostError>>,
}

#[derive(Default)]
pub struct HostRequest {
    inner: Mutex<Inner>,
}

impl std::fmt::Debug for HostRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let inner = self.lock();
        f.debug_struct("HostRequest")
            .field("listeners", &inner.listeners.len())
            .field("outcome", &inner.outcome)
            .finish()
    }
}

impl HostRequest {
    #[must_use]
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Complete the request successfully and notify `success` listeners.
    pub fn succeed(&self, value: HostValue) -> Result<(), FireError> {
        self.fire(Ok(value))
    }

    /// Complete the request with an error and notify `error` listeners.
    pub fn fail(&self, error: HostError) -> Result<(), FireError> {
        self.fire(Err(error))
    }

    /// Invoke the listeners currently registered for `kind` without touching
    /// the stored outcome.
    ///
    /// Listeners are snapshotted before any of them runs, so a listener may
    /// remove itself or its sibling while being dispatched.
    pub fn dispatch_event(&self, kind: EventKind) {
        let snapshot: Vec<Listener> = self
            .lock()
            .listeners
            .iter()
            .filter(|(k, _, _)| *k == kind)
            .map(|(_, _, listener)| Arc::clone(listener))
            .collect();

        tracing::trace!(event = %kind, listeners = snapshot.len(), "Dispatching host event");
        for listener in snapshot {
            listener();
        }
    }

    #[must_use]
    pub fn listener_count(&self) -> usize {
        self.lock().listeners.len()
    }

    #[must_use]
    pub fn has_fired(&self) -> bool {
        self.lock().outcome.is_some()
    }

    fn fire(&self, outcome: Result<HostValue, HostError>) -> Result<(), FireError> {
        let kind = {
            let mut inner = self.lock();
            if let Some(previous) = &inner.outcome {
                return Err(FireError::AlreadyFired(event_kind(previous)));
            }
            let kind = event_kind(&outcome);
            inner.outcome = Some(outcome);
            kind
        };
        self.dispatch_event(kind);
        Ok(())
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn event_kind(outcome: &Result<HostValue, HostError>) -> EventKind {
    match outcome {
        Ok(_) => EventKind::Success,
        Err(_) => EventKind::Error,
    }
}

impl ExternalHandle for HostRequest {
    fn add_listener(&self, kind: EventKind, id: ListenerId, listener: Listener) {
        self.lock().listeners.push((kind, id, listener));
    }

    fn remove_listener(&self, kind: EventKind, id: ListenerId) {
        self.lock()
            .listeners
            .retain(|(k, existing, _)| !(*k == kind && *existing == id));
    }

    fn result(&self) -> Option<HostValue> {
        match &self.lock().outcome {
            Some(Ok(value)) => Some(value.clone()),
            _ => None,
        }
    }

    fn error(&self) -> Option<HostError> {
        match &self.lock().outcome {
            Some(Err(error)) => Some(error.clone()),
            _ => None,
        }
    }
}
