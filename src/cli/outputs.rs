//! `stackhub outputs`: expand requested stack outputs against saved state.

use anyhow::{Context, Result, bail};
use clap::Args;
use serde::Deserialize;
use std::path::{Path, PathBuf};

use super::common::CommandContext;
use crate::core::Diagnostics;
use crate::parameters::{RequestedOutput, expand_requested_outputs};
use crate::state::StackState;
use crate::storage::FileKind;

/// Requested outputs: `outputs:` followed by a list of `{name, value, brief, kind}`.
#[derive(Debug, Default, Deserialize)]
pub struct OutputsFile {
    #[serde(default)]
    pub outputs: Vec<RequestedOutput>,
}

impl OutputsFile {
    /// # Errors
    /// Returns an error if the file cannot be read or is not valid YAML.
    pub async fn load(path: &Path) -> Result<Self> {
        let content = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read {}", path.display()))?;
        serde_yaml::from_str(&content)
            .with_context(|| format!("Failed to parse outputs file {}", path.display()))
    }
}

/// Expand requested outputs and print them as JSON.
#[derive(Args, Debug)]
pub struct OutputsCommand {
    /// Requested outputs file (YAML)
    #[arg(value_name = "FILE")]
    pub file: PathBuf,

    /// Stack state replicas
    #[arg(long = "state", value_name = "LOCATION", required = true)]
    pub state: Vec<String>,

    /// Warn about outputs whose references are missing
    #[arg(long)]
    pub must_exist: bool,

    /// Store the expanded outputs back into the stack state
    #[arg(long)]
    pub save: bool,
}

impl OutputsCommand {
    pub async fn execute(self, ctx: &CommandContext) -> Result<()> {
        let requested = OutputsFile::load(&self.file).await?.outputs;
        let mut diags = Diagnostics::new();

        let session = ctx.session();
        let file = session.check(&self.state, FileKind::State, &mut diags).await?;
        let Some(mut state) = StackState::load(&session, &file).await? else {
            bail!("No stack state found at {}", self.state.join(", "));
        };

        let expanded = expand_requested_outputs(
            &state.locked_parameters,
            &state.outputs,
            &requested,
            self.must_exist,
            &mut diags,
        );
        ctx.report(&diags);
        let expanded = expanded.context("Failed to expand stack outputs")?;

        println!("{}", serde_json::to_string_pretty(&expanded)?);

        if self.save {
            state.stack_outputs = expanded;
            let mut save_diags = Diagnostics::new();
            let saved = state.save(&session, &file, &mut save_diags).await;
            ctx.report(&save_diags);
            saved?;
            ctx.success(format!("Saved {} stack output(s)", state.stack_outputs.len()));
        }
        Ok(())
    }
}
