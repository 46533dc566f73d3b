//! Physical replicas and the logical files they make up.

use std::fmt;

use chrono::{DateTime, Utc};

use super::location::{BackendKind, Location};

/// What a logical file holds. Only used for messages.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum FileKind {
    Manifest,
    Parameters,
    State,
    Other(String),
}

impl fmt::Display for FileKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Manifest => f.write_str("manifest"),
            Self::Parameters => f.write_str("parameters"),
            Self::State => f.write_str("state"),
            Self::Other(kind) => f.write_str(kind),
        }
    }
}

impl From<&str> for FileKind {
    fn from(kind: &str) -> Self {
        match kind {
            "manifest" => Self::Manifest,
            "parameters" => Self::Parameters,
            "state" => Self::State,
            other => Self::Other(other.to_string()),
        }
    }
}

/// One physical copy of a logical file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Replica {
    pub location: Location,
    pub exists: bool,
    /// Last modification time, `None` when the replica does not exist
    pub modified: Option<DateTime<Utc>>,
    pub size: u64,
    /// Whether the `<path>.lock` sentinel is present
    pub locked: bool,
}

impl Replica {
    /// A replica that has not been stat'ed or does not exist.
    #[must_use]
    pub const fn missing(location: Location) -> Self {
        Self {
            location,
            exists: false,
            modified: None,
            size: 0,
            locked: false,
        }
    }

    #[must_use]
    pub const fn existing(location: Location, size: u64, modified: DateTime<Utc>) -> Self {
        Self {
            location,
            exists: true,
            modified: Some(modified),
            size,
            locked: false,
        }
    }

    #[must_use]
    pub const fn kind(&self) -> BackendKind {
        self.location.kind
    }

    #[must_use]
    pub const fn is_remote(&self) -> bool {
        self.location.kind.is_remote()
    }
}

/// A logical file replicated across backends.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReplicatedFile {
    pub kind: FileKind,
    pub replicas: Vec<Replica>,
}

impl ReplicatedFile {
    #[must_use]
    pub fn new(kind: impl Into<FileKind>, replicas: Vec<Replica>) -> Self {
        Self {
            kind: kind.into(),
            replicas,
        }
    }

    /// Replicas that exist.
    pub fn existing(&self) -> impl Iterator<Item = &Replica> {
        self.replicas.iter().filter(|r| r.exists)
    }

    /// Replicas guarded by a lock sentinel.
    pub fn locked(&self) -> impl Iterator<Item = &Replica> {
        self.replicas.iter().filter(|r| r.locked)
    }

    #[must_use]
    pub fn has_remote(&self) -> bool {
        self.replicas.iter().any(Replica::is_remote)
    }

    /// Every replica location, for messages.
    #[must_use]
    pub fn locations(&self) -> Vec<String> {
        self.replicas.iter().map(|r| r.location.to_string()).collect()
    }
}
