//! # FS-Online Show-Settings Command
//!
//! File: cli/src/commands/settings.rs
//!
//! ## Overview
//!
//! Prints the repository layout and the fully resolved settings, including
//! which env files contributed and every addon that was discovered.
//!
use crate::commands::CommandContext;
use crate::core::error::Result;
use crate::core::settings::Settings;
use clap::Parser;
use std::fmt::Write;
use std::path::{Path, PathBuf};

#[derive(Parser, Debug, Clone)]
#[command(about = "Print the resolved settings and discovered addons")]
pub struct ShowSettingsArgs {}

pub fn handle_show_settings(ctx: &CommandContext, _args: ShowSettingsArgs) -> Result<()> {
    let settings = ctx.settings()?;
    print!("{}", render_settings(&settings)?);
    Ok(())
}

fn join_patterns(patterns: &[PathBuf]) -> String {
    if patterns.is_empty() {
        return "-".to_string();
    }
    patterns
        .iter()
        .map(|p| p.display().to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

fn display_opt(path: Option<&Path>) -> String {
    path.map_or_else(|| "-".to_string(), |p| p.display().to_string())
}

/// Renders `settings` as aligned `key: value` lines.
pub fn render_settings(settings: &Settings) -> Result<String> {
    let conventions = &settings.conventions;
    let mut out = String::new();
    writeln!(out, "Repository")?;
    writeln!(out, "  {:<16} {}", "mode:", conventions.mode)?;
    writeln!(out, "  {:<16} {}", "core_dir:", conventions.core_dir.display())?;
    writeln!(out, "  {:<16} {}", "inst_dir:", display_opt(conventions.inst_dir.as_deref()))?;
    writeln!(out, "  {:<16} {}", "repo_dir:", conventions.repo_dir.display())?;
    writeln!(out, "  {:<16} {}", "tools:", conventions.tools_dir.display())?;
    writeln!(out, "  {:<16} {}", "templates:", conventions.templates_dir.display())?;
    writeln!(out, "  {:<16} {}", "dev_dir:", conventions.dev_dir.display())?;
    writeln!(out, "  {:<16} {}", "stg_dir:", conventions.stg_dir.display())?;
    writeln!(out, "  {:<16} {}", "prd_dir:", conventions.prd_dir.display())?;
    writeln!(out, "  {:<16} {}", "dev_tree:", conventions.dev_fson_tgt_dir.display())?;
    writeln!(out, "  {:<16} {}", "build_config:", conventions.build_config_file.display())?;

    writeln!(out, "Settings")?;
    writeln!(out, "  {:<16} {}", "environment:", settings.env)?;
    writeln!(out, "  {:<16} {}", "core_odoo_src:", settings.core_odoo_src.display())?;
    writeln!(out, "  {:<16} {}", "odoo_dir:", settings.core_odoo_dir.display())?;
    writeln!(out, "  {:<16} {}", "core_addon_src:", join_patterns(&settings.core_addon_src))?;
    writeln!(out, "  {:<16} {}", "inst_addon_src:", join_patterns(&settings.inst_addon_src))?;
    writeln!(out, "  {:<16} {}", "core_addon_tgt:", settings.core_addon_tgt.display())?;
    writeln!(out, "  {:<16} {}", "inst_addon_tgt:", settings.inst_addon_tgt.display())?;

    writeln!(out, "Env files")?;
    if settings.env_file_data.is_empty() {
        writeln!(out, "  (none)")?;
    }
    for source in settings.env_file_data.sources() {
        writeln!(out, "  {}", source.display())?;
    }

    let addons = settings.all_addon_dirs()?;
    writeln!(out, "Addons ({})", addons.len())?;
    for (name, path) in addons.iter() {
        writeln!(out, "  {:<24} {}", name, path.display())?;
    }
    Ok(out)
}
