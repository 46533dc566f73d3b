//! Configuration for stackhub.
//!
//! A single global file, `~/.stackhub/config.toml` (`%LOCALAPPDATA%\stackhub\config.toml`
//! on Windows), holds the storage and resolution policy. Every setting has a
//! default, so the file is optional. The encryption key can also come from the
//! `STACKHUB_ENCRYPTION_KEY` environment variable, which takes precedence.

mod global;

pub use global::{HubConfig, ResolutionConfig, StorageConfig};
