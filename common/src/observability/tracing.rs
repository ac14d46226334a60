//! Tracing initialization.
//!
//! Both binaries log through the same `fmt` subscriber so their output
//! lines up when run side by side.

use crate::ColorWhen;
use anyhow::Result;
use tracing_subscriber::{fmt, EnvFilter};

/// Default filter when `RUST_LOG` is unset.
pub const DEFAULT_FILTER: &str = "info";

/// Installs the global tracing subscriber.
///
/// - `RUST_LOG` overrides `DEFAULT_FILTER` (e.g. `RUST_LOG=receiver=trace`
///   to dump payload bytes).
/// - ANSI color controlled by `ColorWhen`.
///
/// # Errors
///
/// Returns error if a global subscriber is already installed.
pub fn init_tracing(color: ColorWhen) -> Result<()> {
    // ---
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    fmt()
        .with_env_filter(env_filter)
        .with_ansi(color.should_color_stderr())
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|e| anyhow::anyhow!("failed to install tracing subscriber: {e}"))?;

    Ok(())
}
