// src/logging.rs

//! Logging setup using `tracing` + `tracing-subscriber`.
//!
//! Priority for determining the log filter:
//! 1. `RUST_LOG` (standard env filter)
//! 2. `DIRTYDAG_LOG` (e.g. "info", "debug")
//! 3. default to `info`

use anyhow::Result;
use tracing_subscriber::{fmt, EnvFilter};

/// Initialise the global logging subscriber.
///
/// Intended for binaries embedding this crate; call once at startup.
pub fn init_logging() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        match std::env::var("DIRTYDAG_LOG") {
            Ok(s) => EnvFilter::new(s),
            Err(_) => EnvFilter::new("info"),
        }
    });

    fmt().with_env_filter(filter).with_target(true).init();

    Ok(())
}
