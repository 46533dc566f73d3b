//! Core types shared by the parameter engine and the storage layer.
//!
//! - [`error`] - [`HubError`] and user-facing [`ErrorContext`]
//! - [`diagnostics`] - the [`Diagnostics`] sink that collects warnings and
//!   per-item errors alongside results

pub mod diagnostics;
pub mod error;

pub use diagnostics::{Diagnostic, Diagnostics, Severity};
pub use error::{ErrorContext, HubError, user_friendly_error};
