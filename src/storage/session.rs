//! Storage session: options, codec and the backend client cache.
//!
//! Every backend call goes through a [`StorageSession`]. Remote clients are
//! built lazily on first use of a `(backend, bucket)` pair and reused for the
//! lifetime of the session. Each remote call carries its own timeout so one
//! unreachable backend fails only its own replica.

use std::collections::HashMap;
use std::future::Future;
use std::path::Path as FsPath;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use chrono::{DateTime, Utc};
use object_store::aws::AmazonS3Builder;
use object_store::azure::MicrosoftAzureBuilder;
use object_store::gcp::GoogleCloudStorageBuilder;
use object_store::path::Path as ObjectPath;
use object_store::{ObjectStore, PutPayload};

use super::codec::Codec;
use super::location::{BackendKind, Location};
use crate::constants::DEFAULT_REMOTE_TIMEOUT;
use crate::core::HubError;
use crate::utils::fs::atomic_write;

/// Write and timeout policy of a session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageOptions {
    /// Gzip payloads before storing them
    pub gzip: bool,
    /// Encrypt the payload whenever any target replica is remote
    pub encrypt_remote: bool,
    /// Timeout for each remote stat, read or write
    pub remote_timeout: Duration,
    /// Overwrite locked replicas and tolerate throttling on a single replica
    pub force: bool,
}

impl Default for StorageOptions {
    fn default() -> Self {
        Self {
            gzip: true,
            encrypt_remote: true,
            remote_timeout: DEFAULT_REMOTE_TIMEOUT,
            force: false,
        }
    }
}

/// Metadata of an existing object.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ObjectStat {
    pub size: u64,
    pub modified: DateTime<Utc>,
}

type StoreKey = (BackendKind, String);

/// Context shared by every storage operation of one run.
pub struct StorageSession {
    pub(crate) options: StorageOptions,
    pub(crate) codec: Codec,
    stores: Mutex<HashMap<StoreKey, Arc<dyn ObjectStore>>>,
}

impl std::fmt::Debug for StorageSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StorageSession")
            .field("options", &self.options)
            .field("codec", &self.codec)
            .finish_non_exhaustive()
    }
}

impl StorageSession {
    #[must_use]
    pub fn new(options: StorageOptions, codec: Codec) -> Self {
        Self {
            options,
            codec,
            stores: Mutex::new(HashMap::new()),
        }
    }

    /// Serve `bucket` on `kind` from `store` instead of a client built from the
    /// environment.
    #[must_use]
    pub fn with_store(self, kind: BackendKind, bucket: impl Into<String>, store: Arc<dyn ObjectStore>) -> Self {
        self.stores
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert((kind, bucket.into()), store);
        self
    }

    #[must_use]
    pub const fn options(&self) -> &StorageOptions {
        &self.options
    }

    #[must_use]
    pub const fn codec(&self) -> &Codec {
        &self.codec
    }

    fn store(&self, location: &Location) -> Result<Arc<dyn ObjectStore>, HubError> {
        let key = (location.kind, location.bucket.clone());
        let mut stores = self.stores.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(store) = stores.get(&key) {
            return Ok(Arc::clone(store));
        }

        tracing::debug!("Creating {} client for bucket {}", location.kind, location.bucket);
        let store = build_store(location)?;
        stores.insert(key, Arc::clone(&store));
        Ok(store)
    }

    async fn timed<T, F>(&self, operation: &str, location: &Location, call: F) -> Result<T, HubError>
    where
        F: Future<Output = object_store::Result<T>>,
    {
        match tokio::time::timeout(self.options.remote_timeout, call).await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(e)) => Err(remote_error(operation, location, &e)),
            Err(_) => Err(HubError::Timeout {
                operation: operation.to_string(),
                path: location.to_string(),
                seconds: self.options.remote_timeout.as_secs(),
            }),
        }
    }

    /// Size and modification time of `location`, `None` when it does not exist.
    pub async fn stat(&self, location: &Location) -> Result<Option<ObjectStat>, HubError> {
        if location.kind == BackendKind::Fs {
            return match tokio::fs::metadata(&location.path).await {
                Ok(meta) => {
                    let modified = meta.modified().map_err(|e| io_error(location, &e))?;
                    Ok(Some(ObjectStat {
                        size: meta.len(),
                        modified: DateTime::<Utc>::from(modified),
                    }))
                }
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
                Err(e) => Err(io_error(location, &e)),
            };
        }

        let store = self.store(location)?;
        let path = ObjectPath::from(location.path.as_str());
        let head = self
            .timed("stat", location, async {
                match store.head(&path).await {
                    Ok(meta) => Ok(Some(meta)),
                    Err(object_store::Error::NotFound { .. }) => Ok(None),
                    Err(e) => Err(e),
                }
            })
            .await?;

        Ok(head.map(|meta| ObjectStat {
            size: meta.size,
            modified: meta.last_modified,
        }))
    }

    /// Whether `location` exists.
    pub async fn exists(&self, location: &Location) -> Result<bool, HubError> {
        Ok(self.stat(location).await?.is_some())
    }

    /// Raw bytes stored at `location`.
    pub async fn get(&self, location: &Location) -> Result<Vec<u8>, HubError> {
        if location.kind == BackendKind::Fs {
            return tokio::fs::read(&location.path).await.map_err(|e| io_error(location, &e));
        }

        let store = self.store(location)?;
        let path = ObjectPath::from(location.path.as_str());
        let bytes = self
            .timed("read", location, async { store.get(&path).await?.bytes().await })
            .await?;
        Ok(bytes.to_vec())
    }

    /// Store `bytes` at `location`, replacing any previous content.
    pub async fn put(&self, location: &Location, bytes: &[u8]) -> Result<(), HubError> {
        if location.kind == BackendKind::Fs {
            return atomic_write(FsPath::new(&location.path), bytes).map_err(|e| HubError::Backend {
                operation: "write".to_string(),
                path: location.to_string(),
                message: format!("{e:#}"),
            });
        }

        let store = self.store(location)?;
        let path = ObjectPath::from(location.path.as_str());
        let payload = PutPayload::from(bytes.to_vec());
        self.timed("write", location, store.put(&path, payload)).await?;
        Ok(())
    }
}

fn build_store(location: &Location) -> Result<Arc<dyn ObjectStore>, HubError> {
    let bucket = location.bucket.as_str();
    let built: object_store::Result<Arc<dyn ObjectStore>> = match location.kind {
        BackendKind::S3 => AmazonS3Builder::from_env()
            .with_bucket_name(bucket)
            .build()
            .map(|s| Arc::new(s) as Arc<dyn ObjectStore>),
        BackendKind::Gcs => GoogleCloudStorageBuilder::from_env()
            .with_bucket_name(bucket)
            .build()
            .map(|s| Arc::new(s) as Arc<dyn ObjectStore>),
        BackendKind::Azure => MicrosoftAzureBuilder::from_env()
            .with_container_name(bucket)
            .build()
            .map(|s| Arc::new(s) as Arc<dyn ObjectStore>),
        BackendKind::Fs => {
            return Err(HubError::Backend {
                operation: "connect".to_string(),
                path: location.to_string(),
                message: "the filesystem has no object store client".to_string(),
            });
        }
    };
    built.map_err(|e| remote_error("connect", location, &e))
}

fn io_error(location: &Location, e: &std::io::Error) -> HubError {
    HubError::Io {
        path: location.to_string(),
        message: e.to_string(),
    }
}

/// Map a backend error, recognizing throttling rejections.
///
/// Only generic service errors can be throttling: not-found, precondition and
/// permission errors never are. The object path is removed before matching so
/// a key such as `releases/4290/hub.state` cannot look like a status code.
fn remote_error(operation: &str, location: &Location, e: &object_store::Error) -> HubError {
    let mut message = e.to_string();
    let mut source = std::error::Error::source(e);
    while let Some(inner) = source {
        message = format!("{message}: {inner}");
        source = inner.source();
    }

    let throttled = match e {
        object_store::Error::Generic { .. } => {
            let without_path = message
                .replace(&location.to_string(), "")
                .replace(location.path.as_str(), "");
            is_throttling_message(&without_path)
        }
        _ => false,
    };

    if throttled {
        HubError::Throttled {
            operation: operation.to_string(),
            path: location.to_string(),
            message,
        }
    } else {
        HubError::Backend {
            operation: operation.to_string(),
            path: location.to_string(),
            message,
        }
    }
}

/// Whether a backend message describes a request-rate rejection.
#[must_use]
pub fn is_throttling_message(message: &str) -> bool {
    const MARKERS: [&str; 9] = [
        "slowdown",
        "slow down",
        "too many requests",
        "toomanyrequests",
        "status: 429",
        "status 429",
        "throttl",
        "rate exceeded",
        "ratelimit",
    ];
    let lower = message.to_lowercase();
    MARKERS.iter().any(|m| lower.contains(m))
}
