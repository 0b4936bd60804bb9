//! The contract an external handle must satisfy to be bridged.

use std::sync::Arc;

use hostbridge_types::{EventKind, HostError, HostValue, ListenerId};

/// Callback invoked when a handle emits an event.
///
/// Listeners read the outcome back from the handle, so they take no
/// arguments. They run in the host's context and must not block.
pub type Listener = Arc<dyn Fn() + Send + Sync>;

/// An in-flight operation owned by the host.
///
/// The host guarantees that exactly one of [`EventKind::Success`] and
/// [`EventKind::Error`] fires per handle, at most once. The bridge only
/// registers and removes listeners and reads the outcome; it never drives
/// the operation itself.
pub trait ExternalHandle: Send + Sync {
    fn add_listener(&self, kind: EventKind, id: ListenerId, listener: Listener);

    /// Remove a listener. Removing an unknown id is a no-op.
    fn remove_listener(&self, kind: EventKind, id: ListenerId);

    /// The success payload. Valid once `Success` has fired.
    fn result(&self) -> Option<HostValue>;

    /// The failure payload. Valid once `Error` has fired.
    fn error(&self) -> Option<HostError>;
}
