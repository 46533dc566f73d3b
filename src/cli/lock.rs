//! `stackhub lock`: lock a parameters file.

use anyhow::{Context, Result, anyhow};
use clap::Args;
use colored::Colorize;
use serde::Deserialize;
use std::io::{BufRead, IsTerminal, Write};
use std::path::PathBuf;

use super::common::CommandContext;
use crate::core::Diagnostics;
use crate::parameters::{Expander, Parameter, TeraEvaluator, flatten_parameters, lock_parameters};
use crate::state::StackState;
use crate::storage::FileKind;

/// A parameters file: `parameters:` followed by a list of parameters.
#[derive(Debug, Default, Deserialize)]
pub struct ParametersFile {
    #[serde(default)]
    pub parameters: Vec<Parameter>,
}

impl ParametersFile {
    /// # Errors
    /// Returns an error if the file cannot be read or is not valid YAML.
    pub async fn load(path: &std::path::Path) -> Result<Self> {
        let content = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read {}", path.display()))?;
        serde_yaml::from_str(&content)
            .with_context(|| format!("Failed to parse parameters file {}", path.display()))
    }
}

/// Lock a parameters file and print the locked values as JSON.
#[derive(Args, Debug)]
pub struct LockCommand {
    /// Parameters file (YAML)
    #[arg(value_name = "FILE")]
    pub file: PathBuf,

    /// Stack state replicas: previously locked values seed the namespace and the
    /// result is saved back
    #[arg(long = "state", value_name = "LOCATION")]
    pub state: Vec<String>,

    /// Never prompt for `kind: user` parameters
    #[arg(long)]
    pub no_input: bool,
}

impl LockCommand {
    pub async fn execute(self, ctx: &CommandContext) -> Result<()> {
        let file = ParametersFile::load(&self.file).await?;
        let mut parameters = flatten_parameters(&file.parameters);
        let mut diags = Diagnostics::new();

        let session = ctx.session();
        let state_file = if self.state.is_empty() {
            None
        } else {
            Some(session.check(&self.state, FileKind::State, &mut diags).await?)
        };
        let mut state = match &state_file {
            Some(f) => StackState::load(&session, f).await?.unwrap_or_default(),
            None => StackState::default(),
        };

        let interactive = !self.no_input && std::io::stdin().is_terminal();
        let mut ask = |parameter: &mut Parameter| ask_value(parameter, interactive);

        let evaluator = TeraEvaluator::new();
        let expander = Expander::new(&evaluator).with_max_depth(ctx.config.resolution.max_depth);
        let locked = lock_parameters(
            &mut parameters,
            &state.locked_parameters,
            &mut ask,
            &expander,
            &mut diags,
        );

        let escalated = diags.escalate(ctx.force_resolution());
        ctx.report(&diags);
        escalated.context("Failed to lock parameters")?;

        println!("{}", serde_json::to_string_pretty(&locked)?);

        if let Some(f) = &state_file {
            state.locked_parameters = state.locked_parameters.merged(&locked);
            let mut save_diags = Diagnostics::new();
            let saved = state.save(&session, f, &mut save_diags).await;
            ctx.report(&save_diags);
            saved?;
            ctx.success(format!("Saved {} locked parameter(s) to stack state", locked.len()));
        }
        Ok(())
    }
}

/// Obtain a value for an empty `kind: user` parameter.
///
/// Non-interactive runs fall back to the default and fail without one.
fn ask_value(parameter: &mut Parameter, interactive: bool) -> Result<()> {
    if !interactive {
        if parameter.default.is_empty() {
            return Err(anyhow!(
                "no value, no default, and stdin is not a terminal; set `fromEnv` or `default`"
            ));
        }
        parameter.value = parameter.default.clone();
        return Ok(());
    }

    let stdin = std::io::stdin();
    let mut reader = stdin.lock();
    prompt(parameter, &mut reader, &mut std::io::stderr())
}

fn prompt(parameter: &mut Parameter, input: &mut impl BufRead, output: &mut impl Write) -> Result<()> {
    let name = parameter.qualified_name();
    if parameter.default.is_empty() {
        write!(output, "{} {}: ", "Enter value for".cyan(), name.bold())?;
    } else {
        write!(output, "{} {} [{}]: ", "Enter value for".cyan(), name.bold(), parameter.default)?;
    }
    output.flush()?;

    let mut line = String::new();
    input.read_line(&mut line).context("Failed to read from stdin")?;
    let answer = line.trim();

    parameter.value = if answer.is_empty() {
        parameter.default.clone()
    } else {
        answer.to_string()
    };
    Ok(())
}
