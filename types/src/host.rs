//! Values that cross the host boundary.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Opaque payload produced by the host for a successful operation.
///
/// The bridge never inspects it. Callers know what shape the operation they
/// submitted produces and interpret it with `serde_json::from_value`.
pub type HostValue = serde_json::Value;

/// The host's native error representation.
///
/// Shaped like a DOM exception: a short machine-readable `name`
/// (e.g. `"NotFoundError"`) plus a human-readable `message`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HostError {
    name: String,
    message: String,
}

impl HostError {
    pub const GENERIC_NAME: &'static str = "Error";

    #[must_use]
    pub fn new(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            message: message.into(),
        }
    }

    /// An error with the generic `"Error"` name.
    #[must_use]
    pub fn message_only(message: impl Into<String>) -> Self {
        Self::new(Self::GENERIC_NAME, message)
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl fmt::Display for HostError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.name == Self::GENERIC_NAME || self.name.is_empty() {
            f.write_str(&self.message)
        } else {
            write!(f, "{}: {}", self.name, self.message)
        }
    }
}

impl std::error::Error for HostError {}
