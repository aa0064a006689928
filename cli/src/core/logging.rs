//! # FS-Online Logging Setup
//!
//! File: cli/src/core/logging.rs
//!
//! ## Overview
//!
//! Installs the `tracing` subscriber (compact, stderr, no targets). The filter
//! is chosen from, in order of precedence:
//!
//! 1. `RUST_LOG`, as a full `EnvFilter` directive
//! 2. `LOG_LEVEL`: `DEBUG`, `INFO`, `WARNING`, `ERROR`, `CRITICAL`, or a
//!    numeric level on the 0-50 scale used by Python's `logging`
//! 3. The `-v` count: none for info, `-v` for debug, `-vv` for trace
//!
//! An unusable `LOG_LEVEL` is reported once the subscriber is up and the
//! level falls back to info.
//!
use std::time::Instant;
use tracing::{info, warn};
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::{fmt, EnvFilter};

pub const LOG_LEVEL_VAR: &str = "LOG_LEVEL";

/// Maps a `LOG_LEVEL` value to a level filter.
pub fn parse_log_level(value: &str) -> Option<LevelFilter> {
    let value = value.trim();
    if let Ok(number) = value.parse::<u32>() {
        return Some(match number {
            0 => LevelFilter::TRACE,
            1..=10 => LevelFilter::DEBUG,
            11..=20 => LevelFilter::INFO,
            21..=30 => LevelFilter::WARN,
            31..=50 => LevelFilter::ERROR,
            _ => LevelFilter::OFF,
        });
    }
    match value.to_ascii_uppercase().as_str() {
        "DEBUG" => Some(LevelFilter::DEBUG),
        "INFO" => Some(LevelFilter::INFO),
        "WARNING" | "WARN" => Some(LevelFilter::WARN),
        "ERROR" | "CRITICAL" => Some(LevelFilter::ERROR),
        _ => None,
    }
}

fn verbosity_level(verbose: u8) -> LevelFilter {
    match verbose {
        0 => LevelFilter::INFO,
        1 => LevelFilter::DEBUG,
        _ => LevelFilter::TRACE,
    }
}

/// Picks the level when `RUST_LOG` is not set. The second value is a warning
/// to emit once logging works.
pub fn choose_level(log_level: Option<&str>, verbose: u8) -> (LevelFilter, Option<String>) {
    match log_level.map(str::trim).filter(|v| !v.is_empty()) {
        Some(value) => match parse_log_level(value) {
            Some(level) => (level, None),
            None => (
                LevelFilter::INFO,
                Some(format!(
                    "Wrong value '{}' in ${}, falling back to INFO",
                    value, LOG_LEVEL_VAR
                )),
            ),
        },
        None => (verbosity_level(verbose), None),
    }
}

/// Installs the global subscriber. Call once, before anything logs.
pub fn init(verbose: u8) {
    let log_level = std::env::var(LOG_LEVEL_VAR).ok();
    let (level, warning) = choose_level(log_level.as_deref(), verbose);

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::default().add_directive(level.into()));
    fmt::Subscriber::builder()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .compact()
        .init();

    if let Some(message) = warning {
        warn!("{}", message);
    }
}

/// Logs how long `command` took, e.g. `symlink-odoo ran in 0.42s`.
pub fn log_elapsed(command: &str, started: Instant) {
    info!("{} ran in {:.2}s", command, started.elapsed().as_secs_f64());
}
