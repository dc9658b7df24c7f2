//! Logging infrastructure for Aqueduct.
//!
//! Structured logging controlled by environment variables:
//!
//! - `AQUEDUCT_DEBUG=true|1|yes` - enable debug logging
//! - `AQUEDUCT_LOG_LEVEL=trace|debug|info|warn|error` - set a specific level
//! - `AQUEDUCT_LOG_FORMAT=json|pretty|compact` - output format (default: json)
//!
//! Initialization requires the `logging` feature; the inspection helpers
//! work without it.
//!
//! ```rust,no_run
//! use aqueduct_odm::logging;
//!
//! // Call once at startup.
//! logging::init();
//! ```

use std::env;
use std::sync::Once;

static INIT: Once = Once::new();

/// Check if debug logging is enabled via `AQUEDUCT_DEBUG`.
#[inline]
pub fn is_debug_enabled() -> bool {
    env::var("AQUEDUCT_DEBUG")
        .map(|v| matches!(v.to_lowercase().as_str(), "true" | "1" | "yes"))
        .unwrap_or(false)
}

/// The configured log level.
///
/// Defaults to "debug" when `AQUEDUCT_DEBUG` is set, "warn" otherwise.
pub fn get_log_level() -> &'static str {
    if let Ok(level) = env::var("AQUEDUCT_LOG_LEVEL") {
        match level.to_lowercase().as_str() {
            "trace" => "trace",
            "debug" => "debug",
            "info" => "info",
            "warn" => "warn",
            "error" => "error",
            _ => {
                if is_debug_enabled() {
                    "debug"
                } else {
                    "warn"
                }
            }
        }
    } else if is_debug_enabled() {
        "debug"
    } else {
        "warn"
    }
}

/// The configured log format, defaulting to "json".
pub fn get_log_format() -> &'static str {
    env::var("AQUEDUCT_LOG_FORMAT")
        .map(|f| match f.to_lowercase().as_str() {
            "pretty" => "pretty",
            "compact" => "compact",
            _ => "json",
        })
        .unwrap_or("json")
}

/// Initialize the logging system. Subsequent calls are no-ops.
pub fn init() {
    INIT.call_once(|| {
        if !is_debug_enabled() && env::var("AQUEDUCT_LOG_LEVEL").is_err() {
            // No logging requested.
            return;
        }

        #[cfg(feature = "logging")]
        {
            use tracing_subscriber::{EnvFilter, fmt, prelude::*};

            let level = get_log_level();
            let filter = EnvFilter::try_new(format!("aqueduct={level}"))
                .unwrap_or_else(|_| EnvFilter::new("warn"));

            match get_log_format() {
                "pretty" => {
                    tracing_subscriber::registry()
                        .with(filter)
                        .with(fmt::layer().pretty())
                        .init();
                }
                "compact" => {
                    tracing_subscriber::registry()
                        .with(filter)
                        .with(fmt::layer().compact())
                        .init();
                }
                _ => {
                    tracing_subscriber::registry()
                        .with(filter)
                        .with(fmt::layer().json())
                        .init();
                }
            }
        }
    });
}

/// Initialize with an explicit level, ignoring the environment.
///
/// Call before spawning threads; it seeds the process environment.
pub fn init_with_level(level: &str) {
    unsafe {
        env::set_var("AQUEDUCT_LOG_LEVEL", level);
    }
    init();
}
