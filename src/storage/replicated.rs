//! `check`, `read` and `write` over replicated files.

use std::fmt;

use futures::future::join_all;

use super::file::{FileKind, Replica, ReplicatedFile};
use super::location::{Location, classify};
use super::selector::choose_file;
use super::session::StorageSession;
use crate::core::{Diagnostics, HubError};

/// What happened to one replica during a write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WriteStatus {
    Written,
    /// Not written, but tolerated
    Warning(HubError),
    Failed(HubError),
}

/// Per-replica write outcome.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReplicaWrite {
    pub location: Location,
    pub status: WriteStatus,
}

/// Outcome of writing a replicated file, one entry per replica in order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WriteReport {
    pub replicas: Vec<ReplicaWrite>,
}

impl WriteReport {
    /// Whether no replica failed hard.
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.failures().next().is_none()
    }

    pub fn failures(&self) -> impl Iterator<Item = (&Location, &HubError)> {
        self.replicas.iter().filter_map(|r| match &r.status {
            WriteStatus::Failed(e) => Some((&r.location, e)),
            _ => None,
        })
    }

    pub fn warnings(&self) -> impl Iterator<Item = (&Location, &HubError)> {
        self.replicas.iter().filter_map(|r| match &r.status {
            WriteStatus::Warning(e) => Some((&r.location, e)),
            _ => None,
        })
    }

    /// Number of replicas written.
    #[must_use]
    pub fn written(&self) -> usize {
        self.replicas.iter().filter(|r| r.status == WriteStatus::Written).count()
    }

    /// Record the warnings in `diagnostics` and turn hard failures into an error.
    ///
    /// # Errors
    ///
    /// The single failure, or [`HubError::Multiple`] when several replicas failed.
    pub fn into_result(self, diagnostics: &mut Diagnostics) -> Result<(), HubError> {
        let mut failures = Vec::new();
        for replica in self.replicas {
            match replica.status {
                WriteStatus::Written => {}
                WriteStatus::Warning(e) => diagnostics.warn(replica.location.to_string(), e.to_string()),
                WriteStatus::Failed(e) => failures.push(e),
            }
        }
        match failures.len() {
            0 => Ok(()),
            1 => Err(failures.remove(0)),
            _ => Err(HubError::Multiple { errors: failures }),
        }
    }
}

impl fmt::Display for WriteReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for replica in &self.replicas {
            match &replica.status {
                WriteStatus::Written => writeln!(f, "  wrote   {}", replica.location)?,
                WriteStatus::Warning(e) => writeln!(f, "  warning {}: {e}", replica.location)?,
                WriteStatus::Failed(e) => writeln!(f, "  failed  {}: {e}", replica.location)?,
            }
        }
        Ok(())
    }
}

/// Classify a replica write error.
///
/// Throttling is tolerated when another replica carries the data or the caller
/// forces the write. Everything else fails the replica.
#[must_use]
pub fn classify_write_error(error: HubError, replica_count: usize, force: bool) -> WriteStatus {
    if error.is_throttling() && (replica_count > 1 || force) {
        WriteStatus::Warning(error)
    } else {
        WriteStatus::Failed(error)
    }
}

impl StorageSession {
    /// Stat every location of a logical file.
    ///
    /// Locations that fail to classify or stat are reported in `diagnostics` and
    /// left out. Each remaining replica records existence, size, modification
    /// time, and whether its `<path>.lock` sentinel exists.
    ///
    /// # Errors
    ///
    /// [`HubError::NoReplicas`] when no location is usable.
    pub async fn check(
        &self,
        locations: &[String],
        kind: impl Into<FileKind>,
        diagnostics: &mut Diagnostics,
    ) -> Result<ReplicatedFile, HubError> {
        let kind = kind.into();

        let mut classified = Vec::with_capacity(locations.len());
        for raw in locations {
            match classify(raw, diagnostics) {
                Ok(location) => classified.push(location),
                Err(e) => diagnostics.error(e),
            }
        }

        let stats = join_all(classified.into_iter().map(|location| self.stat_replica(location))).await;

        let mut replicas = Vec::with_capacity(stats.len());
        for stat in stats {
            match stat {
                Ok(replica) => replicas.push(replica),
                Err(e) => diagnostics.error(e),
            }
        }

        if replicas.is_empty() {
            return Err(HubError::NoReplicas {
                kind: kind.to_string(),
            });
        }

        tracing::debug!(
            "Checked {} {} replica(s), {} existing",
            replicas.len(),
            kind,
            replicas.iter().filter(|r| r.exists).count()
        );
        Ok(ReplicatedFile::new(kind, replicas))
    }

    async fn stat_replica(&self, location: Location) -> Result<Replica, HubError> {
        let sentinel = location.lock_sentinel();
        let (stat, locked) = futures::join!(self.stat(&location), self.exists(&sentinel));
        let (stat, locked) = (stat?, locked?);

        let mut replica = match stat {
            Some(stat) => Replica::existing(location, stat.size, stat.modified),
            None => Replica::missing(location),
        };
        replica.locked = locked;
        Ok(replica)
    }

    /// Read and decode the authoritative replica.
    ///
    /// Returns the decoded bytes and the location they were read from.
    ///
    /// # Errors
    ///
    /// [`HubError::NotFound`] when no replica exists, or the backend or codec error
    /// of the chosen replica.
    pub async fn read(&self, file: &ReplicatedFile) -> Result<(Vec<u8>, Location), HubError> {
        let chosen = choose_file(file)?;
        let raw = self.get(&chosen.location).await?;
        let decoded = self.codec.decode(&raw)?;
        tracing::info!("Read {} from {}", file.kind, chosen.location);
        Ok((decoded, chosen.location.clone()))
    }

    /// Encode `data` once and write it to every replica concurrently.
    ///
    /// The payload is encrypted when any replica is remote and the session
    /// encrypts remote data. Locked replicas are refused unless the session
    /// forces writes. Replica errors are independent: every replica is attempted
    /// and its outcome recorded in the report.
    ///
    /// # Errors
    ///
    /// [`HubError::NoReplicas`] for a file without replicas, or
    /// [`HubError::Codec`] when encoding fails.
    pub async fn write(&self, data: &[u8], file: &ReplicatedFile) -> Result<WriteReport, HubError> {
        if file.replicas.is_empty() {
            return Err(HubError::NoReplicas {
                kind: file.kind.to_string(),
            });
        }

        let encrypt = self.options.encrypt_remote && file.has_remote();
        let payload = self.codec.encode(data, encrypt)?;
        let force = self.options.force;
        let count = file.replicas.len();

        let writes = file.replicas.iter().map(|replica| {
            let payload = &payload;
            async move {
                let status = if replica.locked && !force {
                    WriteStatus::Failed(HubError::Locked {
                        path: replica.location.to_string(),
                    })
                } else {
                    match self.put(&replica.location, payload).await {
                        Ok(()) => WriteStatus::Written,
                        Err(e) => classify_write_error(e, count, force),
                    }
                };
                ReplicaWrite {
                    location: replica.location.clone(),
                    status,
                }
            }
        });

        let report = WriteReport {
            replicas: join_all(writes).await,
        };
        tracing::info!("Wrote {} to {}/{} replica(s)", file.kind, report.written(), count);
        Ok(report)
    }
}

/// Check that no replica of `files` is guarded by a lock sentinel.
///
/// Under `force` each locked replica is only warned about.
///
/// # Errors
///
/// [`HubError::Locked`] for one locked replica, [`HubError::Multiple`] for several.
pub fn ensure_no_lock_files(
    files: &[ReplicatedFile],
    force: bool,
    diagnostics: &mut Diagnostics,
) -> Result<(), HubError> {
    let mut locked = Vec::new();
    for replica in files.iter().flat_map(ReplicatedFile::locked) {
        let error = HubError::Locked {
            path: replica.location.to_string(),
        };
        if force {
            diagnostics.warn(replica.location.to_string(), format!("{error}; continuing under force"));
        } else {
            locked.push(error);
        }
    }

    match locked.len() {
        0 => Ok(()),
        1 => Err(locked.remove(0)),
        _ => Err(HubError::Multiple { errors: locked }),
    }
}
