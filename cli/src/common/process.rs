//! # FS-Online Process Execution Utilities (`common::process`)
//!
//! File: cli/src/common/process.rs
//!
//! ## Overview
//!
//! Runs the external tools the commands delegate to (`git` for submodules,
//! `copier` for addon and model templates). Standard streams are inherited so
//! the operator sees the tool's own output and prompts. A non-zero exit
//! becomes `FsonlineError::ExternalCommand`.
//!
//! `preview_command` renders the same command line as text for `--preview`
//! and dry runs.
//!
use crate::core::error::{FsonlineError, Result};
use anyhow::Context;
use std::path::Path;
use std::process::Stdio;
use tracing::{error, info};

/// Renders `program` and `args` as a shell-like command line.
///
/// Arguments containing whitespace or quotes are single-quoted.
pub fn preview_command(program: &str, args: &[String]) -> String {
    std::iter::once(program.to_string())
        .chain(args.iter().map(|arg| quote(arg)))
        .collect::<Vec<_>>()
        .join(" ")
}

fn quote(arg: &str) -> String {
    if arg.is_empty() || arg.chars().any(|c| c.is_whitespace() || c == '\'' || c == '"') {
        format!("'{}'", arg.replace('\'', r"'\''"))
    } else {
        arg.to_string()
    }
}

/// # Run External Command (`run_command`)
///
/// Executes `program` with `args`, inheriting stdin, stdout and stderr, and
/// waits for it to finish.
///
/// # Errors
///
/// - An error with context if the program can not be started (e.g. not installed).
/// - `FsonlineError::ExternalCommand` if it exits unsuccessfully.
pub async fn run_command(program: &str, args: &[String], cwd: Option<&Path>) -> Result<()> {
    let rendered = preview_command(program, args);
    info!("Executing command: {}", rendered);

    let mut command = tokio::process::Command::new(program);
    command.args(args);
    if let Some(dir) = cwd {
        command.current_dir(dir);
        info!("Setting CWD for command to {}", dir.display());
    }
    command.stdin(Stdio::inherit());
    command.stdout(Stdio::inherit());
    command.stderr(Stdio::inherit());

    let status = command.status().await.with_context(|| {
        format!(
            "Failed to execute command '{}'. Is it installed and in PATH?",
            program
        )
    })?;

    if !status.success() {
        let exit_code = status.code().map_or("?".to_string(), |c| c.to_string());
        error!("Command '{}' failed with exit code {}", rendered, exit_code);
        anyhow::bail!(FsonlineError::ExternalCommand {
            cmd: rendered,
            status: exit_code,
        });
    }

    info!("Command '{}' completed successfully.", rendered);
    Ok(())
}

// --- Unit Tests ---
#[cfg(test)]
mod tests {
    use super::*;

    fn args(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_preview_command_quotes_when_needed() {
        assert_eq!(
            preview_command("git", &args(&["-C", "/repo", "submodule", "update"])),
            "git -C /repo submodule update"
        );
        assert_eq!(
            preview_command("copier", &args(&["-d", "addon_name=My Addon", "it's"])),
            r"copier -d 'addon_name=My Addon' 'it'\''s'"
        );
        assert_eq!(preview_command("echo", &args(&[""])), "echo ''");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_run_command_success_and_failure() {
        assert!(run_command("true", &[], None).await.is_ok());

        let err = run_command("false", &[], None).await.unwrap_err();
        match crate::core::error::error_class(&err) {
            Some(FsonlineError::ExternalCommand { cmd, status }) => {
                assert_eq!(cmd, "false");
                assert_eq!(status, "1");
            }
            other => panic!("unexpected error class: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_run_command_missing_program() {
        let err = run_command("fsonline-no-such-program", &[], None)
            .await
            .unwrap_err();
        assert!(err.to_string().contains("Is it installed"));
    }
}
