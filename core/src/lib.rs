//! Host request bridge for hostbridge.
//!
//! The host notifies completion of an operation through callbacks, exactly
//! once, as either a success or an error event. Workers want to call a
//! function and wait for a value. This crate joins the two:
//!
//! - **`promise`**: one-shot, single-writer promise (`Resolver` / `Pending`)
//! - **`bridge`**: registers the observer pair on an [`ExternalHandle`] and
//!   returns a [`BridgedRequest`] to wait on
//! - **`guard`**: recovers panics at the boundary as typed errors
//! - **`host`**: an in-process [`HostRequest`] implementing the handle contract

pub mod bridge;
pub mod guard;
pub mod handle;
pub mod host;
pub mod promise;

pub use bridge::{BridgedRequest, RequestBridge, wait};
pub use guard::{classify_panic, guard, guard_async};
pub use handle::{ExternalHandle, Listener};
pub use host::{FireError, HostRequest};
pub use promise::{AwaitError, Pending, Resolver, SettleError, State};
