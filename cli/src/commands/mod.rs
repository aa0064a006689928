//! # FS-Online Command Modules
//!
//! File: cli/src/commands/mod.rs
//!
//! ## Overview
//!
//! One module per top-level subcommand. Each module defines a `clap` argument
//! struct and a `handle_*` function; `main.rs` routes to them.
//!
//! | Command           | Module       | Purpose                                              |
//! |-------------------|--------------|------------------------------------------------------|
//! | `init`            | `init`       | submodules, then the development tree                |
//! | `init-submodules` | `submodules` | `git submodule update --init --recursive`            |
//! | `symlink-odoo`    | `symlink`    | build `dev/fsonline` from Odoo and all addons        |
//! | `build-odoo`      | `build`      | build the `build/` tree described by `build.yml`     |
//! | `create-addon`    | `addon`      | scaffold a new addon with `copier`                   |
//! | `create-model`    | `addon`      | scaffold a model into an addon and wire it up        |
//! | `show-settings`   | `settings`   | print the resolved settings                          |
//!
//! Handlers receive a `CommandContext`: the repository conventions detected
//! once at startup plus the settings overrides given on the command line.
//!
use crate::common::fs::mirror::{PlanAction, SymlinkPlan};
use crate::core::conventions::Conventions;
use crate::core::error::Result;
use crate::core::settings::Settings;
use indexmap::IndexMap;

/// `create-addon` and `create-model`.
pub mod addon;
/// `build-odoo`.
pub mod build;
/// `init`.
pub mod init;
/// `show-settings`.
pub mod settings;
/// `init-submodules`.
pub mod submodules;
/// `symlink-odoo`.
pub mod symlink;

/// State shared by all command handlers.
#[derive(Debug, Clone)]
pub struct CommandContext {
    pub conventions: Conventions,
    /// Settings overrides from `--env` and `--set`, highest precedence.
    pub overrides: IndexMap<String, String>,
}

impl CommandContext {
    pub fn new(conventions: Conventions, overrides: IndexMap<String, String>) -> Self {
        Self {
            conventions,
            overrides,
        }
    }

    /// Resolves fresh settings for this command run.
    pub fn settings(&self) -> Result<Settings> {
        Settings::resolve(&self.conventions, &self.overrides)
    }
}

/// Prints one line per plan entry. Dry runs show the whole plan this way.
pub fn print_plan(plan: &SymlinkPlan) {
    for entry in plan.entries() {
        let verb = match entry.action {
            PlanAction::Link => "link",
            PlanAction::Copy => "copy",
            PlanAction::Skip => "keep",
        };
        println!(
            "  {} {} -> {}",
            verb,
            entry.target.display(),
            entry.source.display()
        );
    }
}

/// Parses a `KEY=VALUE` argument (used by `--set`).
pub fn parse_key_val(s: &str) -> std::result::Result<(String, String), String> {
    let (key, value) = s
        .split_once('=')
        .ok_or_else(|| format!("invalid KEY=VALUE: no '=' found in '{}'", s))?;
    let key = key.trim();
    if key.is_empty() {
        return Err(format!("invalid KEY=VALUE: empty key in '{}'", s));
    }
    Ok((key.to_ascii_uppercase(), value.to_string()))
}

/// Parses a directory permission given in octal, e.g. `770`.
pub fn parse_dir_mode(s: &str) -> std::result::Result<u32, String> {
    let mode = u32::from_str_radix(s.trim().trim_start_matches("0o"), 8)
        .map_err(|e| format!("invalid octal mode '{}': {}", s, e))?;
    if mode > 0o7777 {
        return Err(format!("mode '{}' is out of range", s));
    }
    Ok(mode)
}

// --- Unit Tests ---
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_key_val() {
        assert_eq!(
            parse_key_val("core_addon_src=[\"a/*\"]").unwrap(),
            ("CORE_ADDON_SRC".to_string(), "[\"a/*\"]".to_string())
        );
        assert_eq!(
            parse_key_val("A=b=c").unwrap(),
            ("A".to_string(), "b=c".to_string())
        );
        assert!(parse_key_val("novalue").is_err());
        assert!(parse_key_val("=x").is_err());
    }

    #[test]
    fn test_parse_dir_mode() {
        assert_eq!(parse_dir_mode("770").unwrap(), 0o770);
        assert_eq!(parse_dir_mode("0o755").unwrap(), 0o755);
        assert!(parse_dir_mode("999").is_err());
        assert!(parse_dir_mode("77777").is_err());
    }
}
