//! Shared context and output helpers for CLI commands

use anyhow::{Context, Result};
use colored::Colorize;
use std::path::Path;

use super::CliConfig;
use crate::config::HubConfig;
use crate::core::Diagnostics;
use crate::storage::StorageSession;

/// Configuration and global flags every command runs with.
#[derive(Debug, Clone, Default)]
pub struct CommandContext {
    /// Loaded configuration with `--force` already applied
    pub config: HubConfig,
    pub quiet: bool,
}

impl CommandContext {
    /// Load the configuration named by `--config`, or the default one.
    ///
    /// # Errors
    /// Returns an error if the configuration file exists but cannot be parsed.
    pub async fn load(cli: &CliConfig) -> Result<Self> {
        let mut config = HubConfig::load_with_optional(cli.config_path.clone()).await?;
        if cli.force {
            config.storage.force = true;
            config.resolution.force = true;
        }
        Ok(Self::new(config, cli.quiet))
    }

    #[must_use]
    pub const fn new(config: HubConfig, quiet: bool) -> Self {
        Self {
            config,
            quiet,
        }
    }

    /// A storage session for this run.
    #[must_use]
    pub fn session(&self) -> StorageSession {
        self.config.storage.session()
    }

    /// Whether resolution errors are downgraded to warnings.
    #[must_use]
    pub const fn force_resolution(&self) -> bool {
        self.config.resolution.force
    }

    /// Print collected warnings to stderr unless `--quiet`.
    pub fn report(&self, diagnostics: &Diagnostics) {
        if self.quiet {
            return;
        }
        for warning in diagnostics.warnings() {
            eprintln!("{} {}", "warning:".yellow().bold(), warning);
        }
    }

    /// Print a success line to stderr unless `--quiet`.
    pub fn success(&self, message: impl AsRef<str>) {
        if !self.quiet {
            eprintln!("{} {}", "✓".green(), message.as_ref());
        }
    }
}

/// Read a file, or stdin when `path` is `-`.
///
/// # Errors
/// Returns an error if the input cannot be read.
pub async fn read_input(path: &Path) -> Result<Vec<u8>> {
    if path == Path::new("-") {
        use tokio::io::AsyncReadExt;
        let mut buf = Vec::new();
        tokio::io::stdin().read_to_end(&mut buf).await.context("Failed to read stdin")?;
        return Ok(buf);
    }
    tokio::fs::read(path).await.with_context(|| format!("Failed to read {}", path.display()))
}
