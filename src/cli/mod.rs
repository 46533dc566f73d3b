//! Command-line interface for stackhub.
//!
//! The commands are thin wrappers over the library:
//!
//! | Command | Does |
//! |---------|------|
//! | `check` | stat every replica of a file and show which one would be read |
//! | `get` | read the authoritative replica |
//! | `put` | write to every replica |
//! | `locks` | fail if any replica is guarded by a `.lock` sentinel |
//! | `lock` | lock a parameters file, optionally saving it into stack state |
//! | `outputs` | expand requested outputs against saved stack state |
//!
//! # Global Options
//!
//! - `--verbose` / `-v`: debug logging
//! - `--quiet` / `-q`: errors only
//! - `--config` / `-c`: configuration file instead of `~/.stackhub/config.toml`
//! - `--force`: overwrite locked replicas and downgrade resolution errors to warnings
//!
//! `RUST_LOG` overrides the log level chosen by the flags.

mod common;
mod lock;
mod outputs;
mod storage;

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

pub use common::CommandContext;

/// Settings derived from the global flags.
#[derive(Debug, Clone, Default)]
pub struct CliConfig {
    /// Log filter, `None` for errors only
    pub log_level: Option<String>,

    /// Configuration file given with `--config`
    pub config_path: Option<PathBuf>,

    pub force: bool,

    pub quiet: bool,
}

impl CliConfig {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Install the global tracing subscriber. Later calls are ignored.
    pub fn init_logging(&self) {
        let filter = if std::env::var("RUST_LOG").is_ok() {
            EnvFilter::from_default_env()
        } else {
            EnvFilter::new(self.log_level.as_deref().unwrap_or("error"))
        };

        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .with_target(false)
            .try_init();
    }
}

/// Parameter resolution and replicated state storage for infrastructure stacks.
#[derive(Parser)]
#[command(
    name = "stackhub",
    about = "Resolve stack parameters and keep stack state across replicated storage",
    version,
    long_about = "stackhub locks and expands stack parameters and outputs, and stores stack \
                  state redundantly on the local filesystem and S3, GCS or Azure object stores."
)]
pub struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Only print errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    quiet: bool,

    /// Path to the configuration file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Overwrite locked replicas and downgrade resolution errors to warnings
    #[arg(long, global = true)]
    force: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Stat every replica of a file
    Check(storage::CheckCommand),

    /// Read the authoritative replica of a file
    Get(storage::GetCommand),

    /// Write a file to every replica
    Put(storage::PutCommand),

    /// Fail if any replica is locked
    Locks(storage::LocksCommand),

    /// Lock a parameters file
    Lock(lock::LockCommand),

    /// Expand requested outputs against saved stack state
    Outputs(outputs::OutputsCommand),
}

impl Cli {
    /// Execute the parsed command.
    ///
    /// # Errors
    ///
    /// Returns the command's error; `main` renders it with
    /// [`user_friendly_error`](crate::core::user_friendly_error).
    pub async fn execute(self) -> Result<()> {
        let config = self.build_config();
        config.init_logging();
        self.execute_with_config(config).await
    }

    /// Derive the [`CliConfig`] from the global flags.
    #[must_use]
    pub fn build_config(&self) -> CliConfig {
        let log_level = if self.verbose {
            Some("debug".to_string())
        } else if self.quiet {
            None
        } else {
            Some("info".to_string())
        };

        CliConfig {
            log_level,
            config_path: self.config.clone(),
            force: self.force,
            quiet: self.quiet,
        }
    }

    /// Execute with an explicit configuration, without touching logging.
    ///
    /// # Errors
    ///
    /// Returns the command's error.
    pub async fn execute_with_config(self, config: CliConfig) -> Result<()> {
        let ctx = CommandContext::load(&config).await?;

        match self.command {
            Commands::Check(cmd) => cmd.execute(&ctx).await,
            Commands::Get(cmd) => cmd.execute(&ctx).await,
            Commands::Put(cmd) => cmd.execute(&ctx).await,
            Commands::Locks(cmd) => cmd.execute(&ctx).await,
            Commands::Lock(cmd) => cmd.execute(&ctx).await,
            Commands::Outputs(cmd) => cmd.execute(&ctx).await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_config_levels() {
        let cli = Cli::parse_from(["stackhub", "-v", "locks", "a.state"]);
        assert_eq!(cli.build_config().log_level.as_deref(), Some("debug"));

        let cli = Cli::parse_from(["stackhub", "--quiet", "--force", "locks", "a.state"]);
        let config = cli.build_config();
        assert_eq!(config.log_level, None);
        assert!(config.force);
        assert!(config.quiet);

        let cli = Cli::parse_from(["stackhub", "locks", "a.state", "-c", "/tmp/hub.toml"]);
        let config = cli.build_config();
        assert_eq!(config.log_level.as_deref(), Some("info"));
        assert_eq!(config.config_path, Some(PathBuf::from("/tmp/hub.toml")));
    }

    #[test]
    fn test_verbose_conflicts_with_quiet() {
        assert!(Cli::try_parse_from(["stackhub", "-v", "-q", "locks", "a"]).is_err());
    }

    #[test]
    fn test_locations_are_required() {
        assert!(Cli::try_parse_from(["stackhub", "check"]).is_err());
    }

    #[test]
    fn test_command_definition() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }
}
