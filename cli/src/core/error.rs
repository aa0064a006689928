//! # FS-Online Error Types
//!
//! File: cli/src/core/error.rs
//!
//! ## Overview
//!
//! This module defines the error taxonomy shared by every command. Each variant
//! names the offending path or key so that an aborted command tells the
//! operator exactly what to fix.
//!
//! ## Architecture
//!
//! - `FsonlineError`: a `thiserror` enum with one variant per failure class
//! - `Result<T>`: an alias for `anyhow::Result<T>`, so call sites can add
//!   context with `anyhow::Context` while callers (and tests) can still
//!   `downcast_ref::<FsonlineError>()` to match on the class
//!
//! The classes are:
//! - `Configuration`: missing or malformed config file, invalid path shape, missing marker
//! - `Validation`: a resolved path fails its existence or type precondition
//! - `AddonConfig`: a search path matching nothing, or an addon name found twice
//! - `FilesystemConflict`: an entry already exists where a link or copy should go,
//!   or a clean rebuild target lies outside the expected root
//! - `ExternalCommand`: `git` or `copier` exited unsuccessfully
//!
//! ## Examples
//!
//! ```rust
//! if !path.is_dir() {
//!     anyhow::bail!(FsonlineError::Validation(format!("'{}' is not a directory", path.display())));
//! }
//!
//! if let Err(e) = &result {
//!     if matches!(error_class(e), Some(FsonlineError::AddonConfig(_))) { ... }
//! }
//! ```
//!
use thiserror::Error;

/// Custom error type for the FS-Online tooling.
#[derive(Error, Debug)]
pub enum FsonlineError {
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Addon configuration error: {0}")]
    AddonConfig(String),

    #[error("Filesystem conflict: {0}")]
    FilesystemConflict(String),

    #[error("External command failed: {cmd}, Status: {status}")]
    ExternalCommand { cmd: String, status: String },
}

/// Type alias for Result using anyhow::Error for broad compatibility.
pub type Result<T> = anyhow::Result<T>;

/// Returns the `FsonlineError` class carried by an `anyhow::Error`, if any.
///
/// Looks through the whole context chain so that errors wrapped with
/// `.context(...)` still report their class.
pub fn error_class(err: &anyhow::Error) -> Option<&FsonlineError> {
    err.chain().find_map(|cause| cause.downcast_ref::<FsonlineError>())
}
