//! # FS-Online Main Entry Point
//!
//! File: cli/src/main.rs
//!
//! ## Overview
//!
//! Entry point of the `fsonline` developer tool. It handles:
//! - Command-line argument parsing using Clap
//! - Setting up logging (`RUST_LOG`, `LOG_LEVEL`, `-v`)
//! - Detecting the repository layout once per run
//! - Routing execution to the command handlers
//!
//! ## Architecture
//!
//! - Each top-level command is a variant of the `Commands` enum, backed by a
//!   module in `commands/`.
//! - Global flags (`--core-dir`, `--env`, `--set`) become a `CommandContext`
//!   shared by every handler; settings are resolved by the handlers that need them.
//! - All errors propagate to this level, are logged with their full chain and
//!   end the process with exit code 1.
//!
//! ## Examples
//!
//! ```bash
//! # Build dev/fsonline from the detected repository
//! fsonline symlink-odoo
//!
//! # Use another checkout and environment, with extra logging
//! fsonline -v --core-dir ~/src/fsonline --env STG show-settings
//!
//! # Override a setting for a single run
//! fsonline --set CORE_ADDON_SRC='["src/OCA/web/*"]' symlink-odoo --dry
//! ```
//!
use clap::{Parser, Subcommand};
use indexmap::IndexMap;
use std::path::PathBuf;
use std::time::Instant;

mod commands; // One module per subcommand
mod common; // Filesystem and process helpers
mod core; // Conventions, settings, addons, errors, logging

use crate::commands::CommandContext;
use crate::core::conventions::Conventions;
use crate::core::envfile::{EnvironmentName, ENVIRONMENT_KEY};
use crate::core::logging;

#[derive(Parser, Debug)]
#[command(
    name = "fsonline",
    about = "FS-Online developer tooling for Odoo core and instance repositories",
    long_about = "Detects the core/instance repository layout, resolves layered env settings,\n\
                  builds the Odoo development and build trees, and scaffolds addons.",
    propagate_version = true,
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Core repository (or any directory inside it). Detected when omitted.
    #[arg(long, global = true, env = "FSONLINE_CORE_DIR", value_name = "DIR")]
    core_dir: Option<PathBuf>,

    /// Target environment (DEV, STG, PRD). Overrides FSONLINE_ENVIRONMENT.
    #[arg(long = "env", global = true, value_name = "ENV")]
    environment: Option<EnvironmentName>,

    /// Override a setting for this run, e.g. --set CORE_ODOO_SRC=src/odoo.
    #[arg(long = "set", global = true, value_name = "KEY=VALUE", value_parser = commands::parse_key_val)]
    overrides: Vec<(String, String)>,

    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,
}

#[derive(Subcommand, Debug)]
enum Commands {
    Init(commands::init::InitArgs),
    InitSubmodules(commands::submodules::SubmodulesArgs),
    #[command(alias = "symlink")]
    SymlinkOdoo(commands::symlink::SymlinkArgs),
    #[command(alias = "build")]
    BuildOdoo(commands::build::BuildArgs),
    CreateAddon(commands::addon::CreateAddonArgs),
    CreateModel(commands::addon::CreateModelArgs),
    ShowSettings(commands::settings::ShowSettingsArgs),
}

impl Commands {
    fn name(&self) -> &'static str {
        match self {
            Commands::Init(_) => "init",
            Commands::InitSubmodules(_) => "init-submodules",
            Commands::SymlinkOdoo(_) => "symlink-odoo",
            Commands::BuildOdoo(_) => "build-odoo",
            Commands::CreateAddon(_) => "create-addon",
            Commands::CreateModel(_) => "create-model",
            Commands::ShowSettings(_) => "show-settings",
        }
    }
}

impl Cli {
    /// `--set` pairs in order, then `--env`, later entries winning.
    fn settings_overrides(&self) -> IndexMap<String, String> {
        let mut overrides: IndexMap<String, String> = self.overrides.iter().cloned().collect();
        if let Some(env) = self.environment {
            overrides.insert(ENVIRONMENT_KEY.to_string(), env.to_string());
        }
        overrides
    }
}

async fn run(cli: Cli) -> crate::core::error::Result<()> {
    let conventions = Conventions::detect(&Conventions::start_points(cli.core_dir.as_deref()))?;
    tracing::debug!("Repository conventions: {:?}", conventions);
    let ctx = CommandContext::new(conventions, cli.settings_overrides());

    match cli.command {
        Commands::Init(args) => commands::init::handle_init(&ctx, args).await,
        Commands::InitSubmodules(args) => commands::submodules::handle_submodules(&ctx, args).await,
        Commands::SymlinkOdoo(args) => commands::symlink::handle_symlink(&ctx, args),
        Commands::BuildOdoo(args) => commands::build::handle_build(&ctx, args),
        Commands::CreateAddon(args) => commands::addon::handle_create_addon(&ctx, args).await,
        Commands::CreateModel(args) => commands::addon::handle_create_model(&ctx, args).await,
        Commands::ShowSettings(args) => commands::settings::handle_show_settings(&ctx, args),
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    let cli = Cli::parse();
    logging::init(cli.verbose);
    tracing::debug!("Parsed CLI arguments: {:?}", cli);

    let command = cli.command.name();
    let started = Instant::now();
    let command_result = run(cli).await;
    logging::log_elapsed(command, started);

    if let Err(e) = command_result {
        match crate::core::error::error_class(&e) {
            Some(class) => tracing::error!("{} failed: {}", command, class),
            None => tracing::error!("Command execution failed: {:?}", e),
        }
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}

// --- Unit Tests ---
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_env_and_set_become_overrides() {
        let cli = Cli::try_parse_from([
            "fsonline",
            "--set",
            "fsonline_environment=PRD",
            "--set",
            "CORE_ODOO_SRC=src/odoo",
            "show-settings",
            "--env",
            "stg",
        ])
        .unwrap();
        let overrides = cli.settings_overrides();
        assert_eq!(overrides.get(ENVIRONMENT_KEY).map(String::as_str), Some("STG"));
        assert_eq!(overrides.get("CORE_ODOO_SRC").map(String::as_str), Some("src/odoo"));
        assert_eq!(cli.command.name(), "show-settings");
    }

    #[test]
    fn test_unknown_environment_is_rejected() {
        assert!(Cli::try_parse_from(["fsonline", "--env", "qa", "show-settings"]).is_err());
    }
}
