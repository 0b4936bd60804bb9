//! Boundary guard: recover panics raised while calling into host-facing code
//! and return them as [`BoundaryError`]s.
//!
//! Wrap the body of any function that crosses the boundary:
//!
//! ```
//! use hostbridge_core::guard;
//! use hostbridge_types::BoundaryError;
//!
//! let result: Result<(), BoundaryError> = guard(|| panic!("boom"));
//! assert!(result.unwrap_err().to_string().contains("boom"));
//! ```
//!
//! Only panics raised inside the wrapped call are recovered. The panic hook
//! still runs, so the default hook prints the panic message to stderr.
//!
//! Payloads are classified in order:
//! 1. a value of the caller's error type, or a [`BoundaryError`], is returned
//!    unchanged;
//! 2. a [`HostError`] becomes [`BoundaryError::Thrown`];
//! 3. anything else becomes [`BoundaryError::Panic`] carrying its text when
//!    it has any (strings, `io::Error`, boxed errors).

use std::any::{self, Any};
use std::error::Error;
use std::future::Future;
use std::io;
use std::panic::{self, AssertUnwindSafe};

use futures_util::FutureExt;
use hostbridge_types::{BoundaryError, HostError};

/// Run `f`, converting a panic into an error.
pub fn guard<T, E, F>(f: F) -> Result<T, E>
where
    F: FnOnce() -> Result<T, E>,
    E: From<BoundaryError> + 'static,
{
    match panic::catch_unwind(AssertUnwindSafe(f)) {
        Ok(result) => result,
        Err(payload) => Err(recovered(payload)),
    }
}

/// Await `fut`, converting a panic during any poll into an error.
pub async fn guard_async<T, E, F>(fut: F) -> Result<T, E>
where
    F: Future<Output = Result<T, E>>,
    E: From<BoundaryError> + 'static,
{
    match AssertUnwindSafe(fut).catch_unwind().await {
        Ok(result) => result,
        Err(payload) => Err(recovered(payload)),
    }
}

fn recovered<E>(payload: Box<dyn Any + Send>) -> E
where
    E: From<BoundaryError> + 'static,
{
    match payload.downcast::<E>() {
        Ok(err) => {
            tracing::warn!(
                error_type = any::type_name::<E>(),
                "Recovered error value thrown across host boundary"
            );
            *err
        }
        Err(payload) => {
            let err = classify_panic(payload);
            tracing::warn!("Recovered panic at host boundary: {err}");
            err.into()
        }
    }
}

/// Map a panic payload to the error it represents.
#[must_use]
pub fn classify_panic(payload: Box<dyn Any + Send>) -> BoundaryError {
    let payload = match payload.downcast::<BoundaryError>() {
        Ok(err) => return *err,
        Err(other) => other,
    };
    let payload = match payload.downcast::<HostError>() {
        Ok(err) => return BoundaryError::Thrown(*err),
        Err(other) => other,
    };
    BoundaryError::Panic(panic_payload_to_string(payload.as_ref()))
}

fn panic_payload_to_string(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else if let Some(err) = payload.downcast_ref::<io::Error>() {
        err.to_string()
    } else if let Some(err) = payload.downcast_ref::<Box<dyn Error + Send + Sync>>() {
        err.to_string()
    } else {
        "unknown panic payload".to_string()
    }
}
