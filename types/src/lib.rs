//! Core domain types for hostbridge.
//!
//! This crate contains pure domain types with no IO, no async, and minimal dependencies.
//! Everything here can be used from any layer of the application.

// Pedantic lint configuration - these are intentional design choices
#![allow(clippy::missing_errors_doc)] // Result-returning functions are self-explanatory
#![allow(clippy::missing_panics_doc)] // Panics are documented in assertions

mod error;
mod host;
mod ids;
mod settings;

pub use error::BoundaryError;
pub use host::{HostError, HostValue};
pub use ids::{EventKind, ListenerId};
pub use settings::{BridgeSettings, SettingsError, ShellSettings, StoreSettings};
