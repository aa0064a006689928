//! # FS-Online Init Command
//!
//! File: cli/src/commands/init.rs
//!
//! ## Overview
//!
//! Prepares a fresh checkout for development in one step:
//!
//! 1. `init-submodules` for the repository root
//! 2. `symlink-odoo` with the given options
//!
//! With `--dry` the git command is only printed and the tree is only planned.
//!
use crate::commands::submodules::{self, SubmodulesArgs};
use crate::commands::symlink::{self, SymlinkArgs};
use crate::commands::CommandContext;
use crate::core::error::Result;
use clap::Parser;
use tracing::info;

#[derive(Parser, Debug, Clone)]
#[command(about = "Initialize submodules and build the development tree")]
pub struct InitArgs {
    #[command(flatten)]
    pub symlink: SymlinkArgs,
}

pub async fn handle_init(ctx: &CommandContext, args: InitArgs) -> Result<()> {
    info!("Initializing {} repository {:?}", ctx.conventions.mode, ctx.conventions.repo_dir);

    submodules::handle_submodules(
        ctx,
        SubmodulesArgs {
            path: None,
            dry: args.symlink.dry,
        },
    )
    .await?;

    symlink::handle_symlink(ctx, args.symlink)
}
