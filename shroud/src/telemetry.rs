// Copyright (c) 2024 Shroud Foundation

//! Tracing subscriber setup.
//!
//! The filter comes from `RUST_LOG` when set, otherwise from the configured
//! level, raised to `debug` by `--verbose`:
//!
//! ```toml
//! [logging]
//! level = "info"
//! ```

use anyhow::{anyhow, Result};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Filter directive for the given configured level.
pub fn filter_directive(level: &str, verbose: bool) -> String {
    if verbose {
        "debug".to_string()
    } else {
        level.to_string()
    }
}

/// Install the global subscriber.
pub fn init_tracing(level: &str, verbose: bool) -> Result<()> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(filter_directive(level, verbose))
            .map_err(|e| anyhow!("Invalid log level {}: {}", level, e))?,
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(false))
        .try_init()
        .map_err(|e| anyhow!("Failed to install tracing subscriber: {}", e))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_verbose_overrides_level() {
        assert_eq!(filter_directive("warn", false), "warn");
        assert_eq!(filter_directive("warn", true), "debug");
    }

    #[test]
    fn test_configured_levels_parse() {
        for level in ["error", "info", "shroud=trace,lmdb=warn"] {
            assert!(EnvFilter::try_new(filter_directive(level, false)).is_ok());
        }
    }
}
