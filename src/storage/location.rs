//! Backend classification of location strings.

use std::fmt;

use url::Url;

use crate::constants::LOCK_SUFFIX;
use crate::core::{Diagnostics, HubError};

/// Storage backend a replica lives on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum BackendKind {
    /// Local filesystem path
    Fs,
    /// Amazon S3 (`s3://bucket/key`)
    S3,
    /// Google Cloud Storage (`gs://bucket/key`)
    Gcs,
    /// Azure Blob Storage (`az://container/key`)
    Azure,
}

impl BackendKind {
    /// Backend for a URL scheme, `None` for unknown schemes.
    #[must_use]
    pub fn from_scheme(scheme: &str) -> Option<Self> {
        match scheme {
            "s3" => Some(Self::S3),
            "gs" => Some(Self::Gcs),
            "az" => Some(Self::Azure),
            _ => None,
        }
    }

    #[must_use]
    pub const fn scheme(self) -> &'static str {
        match self {
            Self::Fs => "file",
            Self::S3 => "s3",
            Self::Gcs => "gs",
            Self::Azure => "az",
        }
    }

    #[must_use]
    pub const fn is_remote(self) -> bool {
        !matches!(self, Self::Fs)
    }
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Fs => "fs",
            Self::S3 => "s3",
            Self::Gcs => "gcs",
            Self::Azure => "azure",
        })
    }
}

/// A classified location.
///
/// For the filesystem `bucket` is empty and `path` is the file path. For remote
/// backends `bucket` is the bucket or container and `path` the object key.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Location {
    pub kind: BackendKind,
    pub bucket: String,
    pub path: String,
}

impl Location {
    #[must_use]
    pub fn fs(path: impl Into<String>) -> Self {
        Self {
            kind: BackendKind::Fs,
            bucket: String::new(),
            path: path.into(),
        }
    }

    #[must_use]
    pub fn remote(kind: BackendKind, bucket: impl Into<String>, key: impl Into<String>) -> Self {
        Self {
            kind,
            bucket: bucket.into(),
            path: key.into(),
        }
    }

    /// Location of the advisory lock sentinel next to this one.
    #[must_use]
    pub fn lock_sentinel(&self) -> Self {
        Self {
            kind: self.kind,
            bucket: self.bucket.clone(),
            path: format!("{}{}", self.path, LOCK_SUFFIX),
        }
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            BackendKind::Fs => f.write_str(&self.path),
            kind => write!(f, "{}://{}/{}", kind.scheme(), self.bucket, self.path),
        }
    }
}

/// Classify a location string.
///
/// Strings containing `://` must be URLs with a known remote scheme, a bucket and
/// a key. Anything else is a filesystem path. A comma in the string is flagged as
/// a probable list that was not split, but does not fail classification.
///
/// # Errors
///
/// [`HubError::UnsupportedScheme`] for an unknown scheme and
/// [`HubError::InvalidLocation`] for an unparsable URL or one without bucket or key.
///
/// ```
/// use stackhub_cli::core::Diagnostics;
/// use stackhub_cli::storage::{BackendKind, classify};
///
/// let mut diags = Diagnostics::new();
/// let loc = classify("s3://states/dev/hub.state", &mut diags).unwrap();
/// assert_eq!(loc.kind, BackendKind::S3);
/// assert_eq!(loc.bucket, "states");
/// assert_eq!(loc.path, "dev/hub.state");
/// ```
pub fn classify(location: &str, diagnostics: &mut Diagnostics) -> Result<Location, HubError> {
    if location.contains(',') {
        diagnostics.warn(
            location,
            "location contains a comma; a list of locations may not have been split",
        );
    }

    if !location.contains("://") {
        if location.is_empty() {
            return Err(HubError::InvalidLocation {
                location: location.to_string(),
                reason: "empty path".to_string(),
            });
        }
        return Ok(Location::fs(location));
    }

    let url = Url::parse(location).map_err(|e| HubError::InvalidLocation {
        location: location.to_string(),
        reason: e.to_string(),
    })?;

    let kind = BackendKind::from_scheme(url.scheme()).ok_or_else(|| HubError::UnsupportedScheme {
        scheme: url.scheme().to_string(),
        location: location.to_string(),
    })?;

    let bucket = url.host_str().unwrap_or_default();
    if bucket.is_empty() {
        return Err(HubError::InvalidLocation {
            location: location.to_string(),
            reason: "missing bucket".to_string(),
        });
    }

    let key = url.path().trim_start_matches('/');
    if key.is_empty() {
        return Err(HubError::InvalidLocation {
            location: location.to_string(),
            reason: "missing object key".to_string(),
        });
    }

    Ok(Location::remote(kind, bucket, key))
}
