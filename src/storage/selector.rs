//! Choosing the authoritative replica of a logical file.
//!
//! No backend guarantees a single source of truth, so the choice is a heuristic
//! over modification time and size:
//!
//! 1. Only existing replicas count. None is a not-found error, one is the answer.
//! 2. Replicas modified within [`RECENCY_WINDOW`] of the newest one are candidates.
//!    A single candidate is the answer.
//! 3. Among candidates, the largest size wins. A filesystem candidate of that size
//!    is preferred, as is a filesystem candidate exactly [`ENCRYPTION_OVERHEAD`]
//!    bytes smaller (a plaintext local copy of an encrypted remote one).
//! 4. Otherwise the first remote candidate of the largest size, in replica order.

use chrono::{DateTime, TimeDelta, Utc};

use super::file::{Replica, ReplicatedFile};
use crate::constants::{ENCRYPTION_OVERHEAD, RECENCY_WINDOW};
use crate::core::HubError;

/// Pick the replica to read.
///
/// # Errors
///
/// [`HubError::NotFound`] when no replica exists.
pub fn choose_file(file: &ReplicatedFile) -> Result<&Replica, HubError> {
    let existing: Vec<&Replica> = file.existing().collect();

    match existing.as_slice() {
        [] => {
            return Err(HubError::NotFound {
                kind: file.kind.to_string(),
                locations: file.locations(),
            });
        }
        [only] => return Ok(*only),
        _ => {}
    }

    let newest = existing.iter().map(|r| modified(r)).max().unwrap_or(DateTime::<Utc>::MIN_UTC);
    let window = TimeDelta::from_std(RECENCY_WINDOW).unwrap_or_else(|_| TimeDelta::zero());
    let oldest_allowed = newest.checked_sub_signed(window).unwrap_or(newest);

    let candidates: Vec<&Replica> =
        existing.into_iter().filter(|r| modified(r) >= oldest_allowed).collect();

    if let [only] = candidates.as_slice() {
        tracing::debug!("Chose {} as the only recent {} replica", only.location, file.kind);
        return Ok(*only);
    }

    let largest = candidates.iter().map(|r| r.size).max().unwrap_or_default();
    let plaintext_size = largest.checked_sub(ENCRYPTION_OVERHEAD);

    let local = candidates
        .iter()
        .find(|r| !r.is_remote() && r.size == largest)
        .or_else(|| {
            candidates
                .iter()
                .find(|r| !r.is_remote() && Some(r.size) == plaintext_size)
        });
    if let Some(local) = local {
        tracing::debug!("Chose local {} replica {}", file.kind, local.location);
        return Ok(*local);
    }

    // `candidates` is non-empty, so a replica of the largest size exists.
    let chosen = candidates
        .into_iter()
        .find(|r| r.size == largest)
        .ok_or_else(|| HubError::NotFound {
            kind: file.kind.to_string(),
            locations: file.locations(),
        })?;
    tracing::debug!("Chose {} replica {} ({} bytes)", file.kind, chosen.location, chosen.size);
    Ok(chosen)
}

fn modified(replica: &Replica) -> DateTime<Utc> {
    replica.modified.unwrap_or(DateTime::<Utc>::MIN_UTC)
}
