//! Shared utilities.
//!
//! - [`fs`] - Atomic file writes used by filesystem replicas and configuration

pub mod fs;

pub use fs::{atomic_write, ensure_dir};
