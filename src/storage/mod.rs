//! Replicated storage of stack files.
//!
//! A logical file (state, parameters, manifest) is kept as several physical
//! [`Replica`]s on heterogeneous backends: the local filesystem and the S3, GCS
//! and Azure object stores. Backends give no common consistency guarantee, so:
//!
//! - [`StorageSession::check`] stats every replica and its `<path>.lock` sentinel;
//! - [`StorageSession::read`] picks the authoritative replica with
//!   [`choose_file`] and decodes it;
//! - [`StorageSession::write`] encodes once and fans out to every replica,
//!   recording each outcome independently in a [`WriteReport`].
//!
//! # Locations
//!
//! | Form | Backend |
//! |------|---------|
//! | `s3://bucket/key` | Amazon S3 |
//! | `gs://bucket/key` | Google Cloud Storage |
//! | `az://container/key` | Azure Blob Storage |
//! | anything else | filesystem path |
//!
//! # Example
//!
//! ```rust,no_run
//! use stackhub_cli::core::Diagnostics;
//! use stackhub_cli::storage::{Codec, StorageOptions, StorageSession};
//!
//! # async fn example() -> anyhow::Result<()> {
//! let session = StorageSession::new(StorageOptions::default(), Codec::plain());
//! let mut diags = Diagnostics::new();
//! let locations = vec!["hub.state".to_string(), "s3://states/dev/hub.state".to_string()];
//!
//! let file = session.check(&locations, "state", &mut diags).await?;
//! let (bytes, from) = session.read(&file).await?;
//! println!("read {} bytes from {from}", bytes.len());
//! # Ok(())
//! # }
//! ```

mod codec;
mod file;
mod location;
mod replicated;
mod selector;
mod session;

pub use codec::{Codec, EncryptionKey};
pub use file::{FileKind, Replica, ReplicatedFile};
pub use location::{BackendKind, Location, classify};
pub use replicated::{
    ReplicaWrite, WriteReport, WriteStatus, classify_write_error, ensure_no_lock_files,
};
pub use selector::choose_file;
pub use session::{ObjectStat, StorageOptions, StorageSession, is_throttling_message};
