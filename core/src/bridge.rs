//! Request bridge: turns a host handle's success/error events into a value a
//! worker can wait for.
//!
//! ```text
//! submit(handle) ──► ObserverPair { success, error } registered on handle
//!        │                       │ first event fires
//!        ▼                       ▼
//!  BridgedRequest         detach both listeners
//!        │                spawn(resolve | reject)
//!        ▼                       │
//!   wait().await ◄──── Pending ◄─┘
//! ```
//!
//! Listeners never settle the promise inline. The host may be running them
//! from a context that must not block or re-enter, so the settle is handed to
//! a task on the bridge's runtime.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;

use hostbridge_types::{BoundaryError, BridgeSettings, EventKind, HostError, HostValue, ListenerId};
use serde::de::DeserializeOwned;
use tokio::runtime::Handle;

use crate::handle::{ExternalHandle, Listener};
use crate::promise::{self, AwaitError, Pending, Resolver};

type HostResolver = Resolver<HostValue, HostError>;

/// Submits host handles and hands back waitable requests.
#[derive(Debug, Clone)]
pub struct RequestBridge {
    runtime: Handle,
    settings: BridgeSettings,
}

impl RequestBridge {
    /// Bind to the runtime the caller is running on.
    pub fn new() -> Result<Self, BoundaryError> {
        let runtime = Handle::try_current().map_err(|_| BoundaryError::NoRuntime)?;
        Ok(Self::with_runtime(runtime))
    }

    /// Bind to an explicit runtime, for hosts that fire from foreign threads.
    #[must_use]
    pub fn with_runtime(runtime: Handle) -> Self {
        Self {
            runtime,
            settings: BridgeSettings::default(),
        }
    }

    #[must_use]
    pub fn with_settings(mut self, settings: BridgeSettings) -> Self {
        self.settings = settings;
        self
    }

    #[must_use]
    pub fn settings(&self) -> &BridgeSettings {
        &self.settings
    }

    /// Observe `handle` and return immediately.
    ///
    /// The error listener is registered before the success listener. Whichever
    /// fires first records the outcome and detaches both. A handle that has
    /// already completed is settled from its stored outcome.
    pub fn submit<H>(&self, handle: Arc<H>) -> BridgedRequest
    where
        H: ExternalHandle + 'static,
    {
        let handle: Arc<dyn ExternalHandle> = handle;
        let (resolver, pending) = promise::channel();
        let observers = Arc::new(ObserverPair {
            handle: Arc::clone(&handle),
            success: ListenerId::next(),
            error: ListenerId::next(),
            fired: AtomicBool::new(false),
            detached: AtomicBool::new(false),
        });

        let on_error = self.observer(&observers, &resolver, EventKind::Error);
        let on_success = self.observer(&observers, &resolver, EventKind::Success);
        handle.add_listener(EventKind::Error, observers.error, Arc::clone(&on_error));
        handle.add_listener(EventKind::Success, observers.success, Arc::clone(&on_success));

        // A host firing from another thread may have completed before the
        // listeners were attached. The claim flag keeps this from doubling up.
        if handle.error().is_some() {
            on_error();
        } else if handle.result().is_some() {
            on_success();
        }

        tracing::trace!(
            success = %observers.success,
            error = %observers.error,
            "Submitted host request"
        );

        BridgedRequest {
            pending,
            observers: ObserverGuard(observers),
            timeout: self.settings.wait_timeout(),
        }
    }

    fn observer(
        &self,
        observers: &Arc<ObserverPair>,
        resolver: &HostResolver,
        kind: EventKind,
    ) -> Listener {
        let observers: Weak<ObserverPair> = Arc::downgrade(observers);
        let resolver = resolver.clone();
        let runtime = self.runtime.clone();

        Arc::new(move || {
            // Request already dropped: its guard detached us.
            let Some(observers) = observers.upgrade() else {
                return;
            };
            if !observers.claim() {
                tracing::debug!(event = %kind, "Ignoring host event after the request settled");
                return;
            }

            let outcome = match kind {
                EventKind::Success => Ok(observers.handle.result().unwrap_or(HostValue::Null)),
                EventKind::Error => Err(observers.handle.error().unwrap_or_else(|| {
                    HostError::message_only("request failed without an error value")
                })),
            };
            observers.detach();

            let resolver = resolver.clone();
            runtime.spawn(async move {
                let settled = match outcome {
                    Ok(value) => resolver.resolve(value),
                    Err(error) => resolver.reject(error),
                };
                if let Err(e) = settled {
                    tracing::warn!("Host request settled twice: {e}");
                }
            });
        })
    }
}

/// The two listeners registered for one request.
struct ObserverPair {
    handle: Arc<dyn ExternalHandle>,
    success: ListenerId,
    error: ListenerId,
    fired: AtomicBool,
    detached: AtomicBool,
}

impl ObserverPair {
    /// True for the first caller only.
    fn claim(&self) -> bool {
        !self.fired.swap(true, Ordering::AcqRel)
    }

    fn detach(&self) {
        if self.detached.swap(true, Ordering::AcqRel) {
            return;
        }
        self.handle.remove_listener(EventKind::Error, self.error);
        self.handle.remove_listener(EventKind::Success, self.success);
        tracing::trace!(success = %self.success, error = %self.error, "Detached host listeners");
    }
}

/// Detaches the observer pair when the request goes away, whether it was
/// waited on, timed out, or abandoned.
struct ObserverGuard(Arc<ObserverPair>);

impl Drop for ObserverGuard {
    fn drop(&mut self) {
        self.0.detach();
    }
}

/// A submitted host request.
///
/// Dropping it without waiting detaches its listeners from the handle.
pub struct BridgedRequest {
    pending: Pending<HostValue, HostError>,
    observers: ObserverGuard,
    timeout: Option<Duration>,
}

impl std::fmt::Debug for BridgedRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BridgedRequest")
            .field("success", &self.observers.0.success)
            .field("error", &self.observers.0.error)
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

impl BridgedRequest {
    /// Wait for the host to settle the request.
    ///
    /// Uses the bridge's configured timeout, if any.
    pub async fn wait(self) -> Result<HostValue, BoundaryError> {
        match self.timeout {
            Some(limit) => self.wait_timeout(limit).await,
            None => {
                let Self {
                    pending, observers, ..
                } = self;
                let outcome = pending.wait().await;
                drop(observers);
                outcome.map_err(into_boundary)
            }
        }
    }

    /// Wait at most `limit`. On timeout the listeners are detached and the
    /// late outcome, if any, is discarded.
    pub async fn wait_timeout(self, limit: Duration) -> Result<HostValue, BoundaryError> {
        let Self {
            pending, observers, ..
        } = self;
        match tokio::time::timeout(limit, pending.wait()).await {
            Ok(outcome) => outcome.map_err(into_boundary),
            Err(_) => {
                tracing::warn!(
                    success = %observers.0.success,
                    "Host request timed out after {limit:?}; detaching listeners"
                );
                drop(observers);
                Err(BoundaryError::TimedOut(limit))
            }
        }
    }

    /// Wait, then interpret the payload as `T`.
    pub async fn wait_as<T: DeserializeOwned>(self) -> Result<T, BoundaryError> {
        let value = self.wait().await?;
        serde_json::from_value(value).map_err(|e| BoundaryError::Decode(e.to_string()))
    }
}

/// Free-function form of [`BridgedRequest::wait`].
pub async fn wait(request: BridgedRequest) -> Result<HostValue, BoundaryError> {
    request.wait().await
}

fn into_boundary(err: AwaitError<HostError>) -> BoundaryError {
    match err {
        AwaitError::Rejected(error) => BoundaryError::Rejected(error),
        AwaitError::Abandoned => {
            tracing::warn!("Host request abandoned before it settled");
            BoundaryError::Abandoned
        }
    }
}
