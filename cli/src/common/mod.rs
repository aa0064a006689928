//! # FS-Online Common Utilities (`common`)
//!
//! File: cli/src/common/mod.rs
//!
//! ## Overview
//!
//! Cross-cutting helpers shared by the command handlers. Nothing in here knows
//! about repository conventions or settings; that lives in `core::`.
//!
//! - **`fs`**: links, copies, directory mirroring and small I/O helpers.
//! - **`process`**: running external tools (`git`, `copier`) and rendering
//!   their command lines for previews.
//!

/// Utilities for filesystem operations (I/O, links, copies, mirrors).
pub mod fs;
/// Utilities for executing external processes.
pub mod process;
