//! Normalized errors for calls that cross the host boundary.

use std::time::Duration;

use thiserror::Error;

use crate::host::HostError;

/// Every way a bridged call can fail.
///
/// `Rejected` is the host saying no through the normal failure path.
/// `Thrown` and `Panic` mean code at the boundary itself failed and the
/// failure was recovered by a guard. Callers match on the variant to tell
/// the two apart.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BoundaryError {
    /// The external operation fired its failure notification.
    #[error("{0}")]
    Rejected(HostError),
    /// A recovered panic whose payload was the host's native error value.
    #[error("host error thrown across boundary: {0}")]
    Thrown(HostError),
    /// A recovered panic with any other payload, formatted as text.
    #[error("panic at host boundary: {0}")]
    Panic(String),
    /// Every producer handle was dropped before the outcome was settled.
    #[error("request was abandoned before it settled")]
    Abandoned,
    #[error("request did not settle within {0:?}")]
    TimedOut(Duration),
    /// The success payload did not have the shape the caller asked for.
    #[error("unexpected payload: {0}")]
    Decode(String),
    #[error("no async runtime available to settle requests")]
    NoRuntime,
}

impl BoundaryError {
    /// The host error carried by `Rejected` or `Thrown`, if any.
    #[must_use]
    pub fn host_error(&self) -> Option<&HostError> {
        match self {
            Self::Rejected(err) | Self::Thrown(err) => Some(err),
            _ => None,
        }
    }

    #[must_use]
    pub fn is_rejection(&self) -> bool {
        matches!(self, Self::Rejected(_))
    }

    /// True for failures recovered from a panic.
    #[must_use]
    pub fn is_panic(&self) -> bool {
        matches!(self, Self::Thrown(_) | Self::Panic(_))
    }
}

impl From<HostError> for BoundaryError {
    fn from(err: HostError) -> Self {
        Self::Rejected(err)
    }
}
