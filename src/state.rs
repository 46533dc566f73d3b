//! Persisted stack state.
//!
//! After a run the locked parameters, every captured output and the expanded
//! stack outputs are saved as one JSON document to all state replicas. A later
//! invocation loads it back through the replica selector.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::core::{Diagnostics, HubError};
use crate::parameters::{CapturedOutput, CapturedOutputs, ExpandedOutput, LockedParameters, merge_outputs};
use crate::storage::{FileKind, ReplicatedFile, StorageSession};

/// Everything a later step needs to know about a stack.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StackState {
    #[serde(default, skip_serializing_if = "LockedParameters::is_empty")]
    pub locked_parameters: LockedParameters,

    #[serde(default, skip_serializing_if = "CapturedOutputs::is_empty")]
    pub outputs: CapturedOutputs,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub stack_outputs: Vec<ExpandedOutput>,

    /// Components deployed so far, in deployment order
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub components: Vec<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated: Option<DateTime<Utc>>,
}

impl StackState {
    #[must_use]
    pub fn new(locked_parameters: LockedParameters) -> Self {
        Self {
            locked_parameters,
            ..Self::default()
        }
    }

    /// Record a deployed component and merge the outputs it produced.
    pub fn record_component(
        &mut self,
        component: &str,
        outputs: impl IntoIterator<Item = CapturedOutput>,
        diagnostics: &mut Diagnostics,
    ) {
        merge_outputs(&mut self.outputs, outputs, diagnostics);
        if !self.components.iter().any(|c| c == component) {
            self.components.push(component.to_string());
        }
    }

    /// Load state from its replicas. `Ok(None)` when no replica exists yet.
    ///
    /// # Errors
    ///
    /// Returns an error if the chosen replica cannot be read, decoded or parsed.
    pub async fn load(session: &StorageSession, file: &ReplicatedFile) -> Result<Option<Self>> {
        let (bytes, from) = match session.read(file).await {
            Ok(read) => read,
            Err(e) if e.is_not_found() => return Ok(None),
            Err(e) => return Err(e).context("Failed to read stack state"),
        };

        let state = serde_json::from_slice(&bytes)
            .with_context(|| format!("Failed to parse stack state from {from}"))?;
        Ok(Some(state))
    }

    /// Save state to every replica of `file`.
    ///
    /// Tolerated replica failures are recorded in `diagnostics`.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails or any replica fails hard.
    pub async fn save(
        &mut self,
        session: &StorageSession,
        file: &ReplicatedFile,
        diagnostics: &mut Diagnostics,
    ) -> Result<()> {
        if file.kind != FileKind::State {
            return Err(HubError::Config {
                message: format!("cannot save stack state into a {} file", file.kind),
            }
            .into());
        }

        self.updated = Some(Utc::now());
        let bytes = serde_json::to_vec_pretty(self).context("Failed to serialize stack state")?;
        session
            .write(&bytes, file)
            .await
            .context("Failed to save stack state")?
            .into_result(diagnostics)
            .context("Failed to save stack state")
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use object_store::memory::InMemory;

    use super::*;
    use crate::parameters::{Key, Parameter};
    use crate::storage::{BackendKind, Codec, EncryptionKey, StorageOptions};

    #[test]
    fn test_json_shape() {
        let mut state =
            StackState::new(vec![Parameter::new("size", "small").with_component("db").to_locked()]
                .into_iter()
                .collect());
        let mut diags = Diagnostics::new();
        state.record_component("db", vec![CapturedOutput::new("db", "endpoint", "h")], &mut diags);

        let json = serde_json::to_value(&state).unwrap();
        assert_eq!(json["lockedParameters"]["size|db"]["value"], "small");
        assert_eq!(json["outputs"]["db:endpoint"]["value"], "h");
        assert_eq!(json["components"][0], "db");

        let back: StackState = serde_json::from_value(json).unwrap();
        assert_eq!(back, state);
    }

    #[test]
    fn test_record_component_is_idempotent() {
        let mut state = StackState::default();
        let mut diags = Diagnostics::new();
        state.record_component("db", vec![CapturedOutput::new("db", "a", "1")], &mut diags);
        state.record_component("db", vec![CapturedOutput::new("db", "a", "1")], &mut diags);

        assert_eq!(state.components, vec!["db"]);
        assert_eq!(state.outputs.len(), 1);
        assert!(diags.is_empty());
    }

    #[tokio::test]
    async fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let session = StorageSession::new(
            StorageOptions::default(),
            Codec::new(true, Some(EncryptionKey::from_secret("k"))),
        )
        .with_store(BackendKind::Gcs, "states", Arc::new(InMemory::new()));
        let locations = vec![
            dir.path().join("hub.state").to_string_lossy().into_owned(),
            "gs://states/hub.state".to_string(),
        ];
        let mut diags = Diagnostics::new();
        let file = session.check(&locations, FileKind::State, &mut diags).await.unwrap();

        assert_eq!(StackState::load(&session, &file).await.unwrap(), None);

        let mut state = StackState::default();
        state.record_component("db", vec![CapturedOutput::new("db", "endpoint", "h")], &mut diags);
        state.save(&session, &file, &mut diags).await.unwrap();

        let file = session.check(&locations, FileKind::State, &mut diags).await.unwrap();
        let loaded = StackState::load(&session, &file).await.unwrap().unwrap();
        assert_eq!(loaded, state);
        assert_eq!(
            loaded.outputs.get(&Key::output("db", "endpoint")).map(|o| o.value.as_str()),
            Some("h")
        );
    }

    #[tokio::test]
    async fn test_save_refuses_other_file_kinds() {
        let session = StorageSession::new(StorageOptions::default(), Codec::plain());
        let file = ReplicatedFile::new(FileKind::Parameters, Vec::new());
        let mut diags = Diagnostics::new();
        assert!(StackState::default().save(&session, &file, &mut diags).await.is_err());
    }
}
