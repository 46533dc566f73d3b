//! Replicated file commands: `check`, `get`, `put` and `locks`.

use anyhow::{Context, Result};
use clap::{Args, ValueEnum};
use colored::Colorize;
use serde_json::json;
use std::path::PathBuf;

use super::common::{CommandContext, read_input};
use crate::core::Diagnostics;
use crate::storage::{ReplicatedFile, StorageSession, choose_file, ensure_no_lock_files};
use crate::utils::atomic_write;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

/// Replica locations of one logical file.
#[derive(Args, Debug, Clone)]
pub struct Locations {
    /// Replica locations: filesystem paths or s3://, gs://, az:// URLs
    #[arg(required = true, value_name = "LOCATION")]
    pub locations: Vec<String>,

    /// Logical file kind (state, parameters, manifest)
    #[arg(long, default_value = "state")]
    pub kind: String,
}

impl Locations {
    async fn check(
        &self,
        ctx: &CommandContext,
        diagnostics: &mut Diagnostics,
    ) -> Result<(StorageSession, ReplicatedFile)> {
        let session = ctx.session();
        let file = session
            .check(&self.locations, self.kind.as_str(), diagnostics)
            .await
            .context("Failed to check replicas")?;
        Ok((session, file))
    }
}

/// Stat every replica and show which one would be read.
#[derive(Args, Debug)]
pub struct CheckCommand {
    #[command(flatten)]
    pub target: Locations,

    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,
}

impl CheckCommand {
    pub async fn execute(self, ctx: &CommandContext) -> Result<()> {
        let mut diags = Diagnostics::new();
        let (_, file) = self.target.check(ctx, &mut diags).await?;
        let chosen = choose_file(&file).ok().map(|r| r.location.to_string());

        match self.format {
            OutputFormat::Json => {
                let replicas: Vec<_> = file
                    .replicas
                    .iter()
                    .map(|r| {
                        json!({
                            "location": r.location.to_string(),
                            "backend": r.kind().to_string(),
                            "exists": r.exists,
                            "size": r.size,
                            "modified": r.modified,
                            "locked": r.locked,
                        })
                    })
                    .collect();
                let doc = json!({
                    "kind": file.kind.to_string(),
                    "replicas": replicas,
                    "chosen": chosen,
                });
                println!("{}", serde_json::to_string_pretty(&doc)?);
            }
            OutputFormat::Text => {
                println!("{} {}", "File kind:".bold(), file.kind);
                for replica in &file.replicas {
                    let marker = if chosen.as_deref() == Some(replica.location.to_string().as_str()) {
                        "*".green().bold()
                    } else {
                        " ".normal()
                    };
                    let status = if replica.exists {
                        let modified = replica
                            .modified
                            .map(|m| m.to_rfc3339())
                            .unwrap_or_default();
                        format!("{} bytes, {}", replica.size, modified).normal()
                    } else {
                        "missing".yellow()
                    };
                    let lock = if replica.locked { " [locked]".red() } else { "".normal() };
                    println!("{marker} {:6} {} ({status}){lock}", replica.kind(), replica.location);
                }
                if chosen.is_none() {
                    println!("{}", "No replica exists".yellow());
                }
            }
        }

        ctx.report(&diags);
        Ok(())
    }
}

/// Read the authoritative replica.
#[derive(Args, Debug)]
pub struct GetCommand {
    #[command(flatten)]
    pub target: Locations,

    /// Write the content to a file instead of stdout
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

impl GetCommand {
    pub async fn execute(self, ctx: &CommandContext) -> Result<()> {
        let mut diags = Diagnostics::new();
        let (session, file) = self.target.check(ctx, &mut diags).await?;
        let (bytes, from) = session.read(&file).await?;

        match self.output {
            Some(path) => {
                atomic_write(&path, &bytes)?;
                ctx.success(format!("Read {} bytes from {from} into {}", bytes.len(), path.display()));
            }
            None => {
                use std::io::Write;
                std::io::stdout().write_all(&bytes).context("Failed to write stdout")?;
                tracing::info!("Read {} bytes from {}", bytes.len(), from);
            }
        }

        ctx.report(&diags);
        Ok(())
    }
}

/// Write content to every replica.
#[derive(Args, Debug)]
pub struct PutCommand {
    #[command(flatten)]
    pub target: Locations,

    /// File to store, `-` for stdin
    #[arg(short, long, value_name = "FILE")]
    pub input: PathBuf,
}

impl PutCommand {
    pub async fn execute(self, ctx: &CommandContext) -> Result<()> {
        let data = read_input(&self.input).await?;
        let mut diags = Diagnostics::new();
        let (session, file) = self.target.check(ctx, &mut diags).await?;

        let report = session.write(&data, &file).await?;
        if !ctx.quiet {
            eprint!("{report}");
        }
        let written = report.written();
        let result = report.into_result(&mut diags);
        ctx.report(&diags);
        result?;

        ctx.success(format!("Wrote {} bytes to {written} replica(s)", data.len()));
        Ok(())
    }
}

/// Fail if any replica is guarded by a lock sentinel.
#[derive(Args, Debug)]
pub struct LocksCommand {
    #[command(flatten)]
    pub target: Locations,
}

impl LocksCommand {
    pub async fn execute(self, ctx: &CommandContext) -> Result<()> {
        let mut diags = Diagnostics::new();
        let (session, file) = self.target.check(ctx, &mut diags).await?;

        let result = ensure_no_lock_files(
            std::slice::from_ref(&file),
            session.options().force,
            &mut diags,
        );
        ctx.report(&diags);
        result?;

        ctx.success("No locked replicas");
        Ok(())
    }
}
