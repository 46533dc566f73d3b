//! Global constants used throughout the stackhub codebase.
//!
//! This module contains timeouts, expansion limits, placeholder values and
//! storage framing constants that are shared between the parameter engine and
//! the storage layer. Defining them centrally keeps the magic numbers
//! discoverable.

use std::time::Duration;

/// Default timeout for a single remote stat, read or write (30 seconds).
///
/// Each network-backed call carries its own timeout so one unreachable
/// backend fails only its own replica.
pub const DEFAULT_REMOTE_TIMEOUT: Duration = Duration::from_secs(30);

/// Maximum recursion depth for template expansion.
///
/// Reaching this depth abandons the value and records a probable loop.
pub const MAX_EXPANSION_DEPTH: usize = 10;

/// Value substituted for a parameter whose expansion hit [`MAX_EXPANSION_DEPTH`].
pub const LOOP_PLACEHOLDER: &str = "(loop)";

/// Value substituted for a reference that could not be resolved.
pub const UNKNOWN_PLACEHOLDER: &str = "(unknown)";

/// Synthetic binding holding the name of the component being expanded.
pub const COMPONENT_NAME_BINDING: &str = "hub.componentName";

/// Width of the recency window used when choosing between replicas (10 seconds).
pub const RECENCY_WINDOW: Duration = Duration::from_secs(10);

/// Leading bytes identifying an encrypted payload.
pub const ENCRYPTION_MARKER: &[u8] = b"hubenc1\n";

/// AES-GCM nonce length in bytes.
pub const NONCE_LEN: usize = 12;

/// AES-GCM authentication tag length in bytes.
pub const TAG_LEN: usize = 16;

/// Number of bytes encryption adds to a payload (marker, nonce and tag).
///
/// The replica selector uses this to match an unencrypted filesystem copy
/// against an encrypted remote copy of the same content.
pub const ENCRYPTION_OVERHEAD: u64 = (ENCRYPTION_MARKER.len() + NONCE_LEN + TAG_LEN) as u64;

/// Gzip magic bytes.
pub const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];

/// Suffix of the advisory lock sentinel placed next to a replica.
pub const LOCK_SUFFIX: &str = ".lock";

/// Environment variable overriding the configured encryption key.
pub const ENCRYPTION_KEY_ENV: &str = "STACKHUB_ENCRYPTION_KEY";

/// Maximum Levenshtein distance, as a percentage of the reference length,
/// for a namespace key to be suggested as a replacement.
pub const SIMILARITY_THRESHOLD_PERCENT: usize = 50;
