//! # FS-Online Init-Submodules Command
//!
//! File: cli/src/commands/submodules.rs
//!
//! ## Overview
//!
//! Odoo and most addon sources are git submodules of the core and instance
//! repositories. This command initializes all of them, recursively:
//!
//! ```bash
//! git -C <repo_dir> submodule update --init --recursive
//! ```
//!
//! `--path` runs it for another checkout instead of the detected repository.
//!
use crate::commands::CommandContext;
use crate::common::process::{preview_command, run_command};
use crate::core::error::{FsonlineError, Result};
use anyhow::bail;
use clap::Parser;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

#[derive(Parser, Debug, Clone)]
#[command(about = "Initialize all git submodules recursively")]
pub struct SubmodulesArgs {
    /// Repository to initialize. Defaults to the detected repository root.
    #[arg(long, value_name = "DIR")]
    pub path: Option<PathBuf>,

    /// Only print the git command.
    #[arg(long)]
    pub dry: bool,
}

/// Arguments for `git` that initialize every submodule below `repo`.
pub fn submodule_update_args(repo: &Path) -> Vec<String> {
    vec![
        "-C".to_string(),
        repo.to_string_lossy().into_owned(),
        "submodule".to_string(),
        "update".to_string(),
        "--init".to_string(),
        "--recursive".to_string(),
    ]
}

/// # Handle Init-Submodules Command (`handle_submodules`)
///
/// # Errors
///
/// - `FsonlineError::Validation` if the target is not a directory.
/// - `FsonlineError::ExternalCommand` if `git` fails.
pub async fn handle_submodules(ctx: &CommandContext, args: SubmodulesArgs) -> Result<()> {
    debug!("Submodules args: {:?}", args);
    let repo = args
        .path
        .clone()
        .unwrap_or_else(|| ctx.conventions.repo_dir.clone());
    if !repo.is_dir() {
        bail!(FsonlineError::Validation(format!(
            "Submodule path {:?} is not a directory",
            repo
        )));
    }

    let git_args = submodule_update_args(&repo);
    if args.dry {
        println!("{}", preview_command("git", &git_args));
        return Ok(());
    }

    info!("Initializing submodules in {:?}", repo);
    run_command("git", &git_args, None).await
}
