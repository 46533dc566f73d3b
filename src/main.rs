//! stackhub CLI entry point
//!
//! Parses arguments, runs the selected command and renders errors with
//! context and suggestions.
//!
//! - `check` - stat every replica of a file
//! - `get` / `put` - read the authoritative replica, write every replica
//! - `locks` - fail on `.lock` sentinels
//! - `lock` - lock a parameters file
//! - `outputs` - expand requested stack outputs

use anyhow::Result;
use clap::Parser;
use stackhub_cli::cli;
use stackhub_cli::core::user_friendly_error;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = cli::Cli::parse();

    // Set up colored output for Windows
    #[cfg(windows)]
    colored::control::set_virtual_terminal(true).ok();

    match cli.execute().await {
        Ok(()) => Ok(()),
        Err(e) => {
            let error_ctx = user_friendly_error(e);
            error_ctx.display();
            std::process::exit(1);
        }
    }
}
