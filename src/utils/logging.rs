use std::env;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Tracing setup shared by the CLI and embedding applications.
pub struct LoggingConfig;

impl LoggingConfig {
    /// Initializes the global subscriber.
    ///
    /// Environment variables:
    /// - `RUST_LOG`: standard level filter (error, warn, info, debug, trace)
    /// - `CONDUCTOR_DEBUG`: verbose output with targets, files and thread ids
    ///
    /// Call once, early in `main`.
    pub fn init() {
        let is_debug = env::var("CONDUCTOR_DEBUG").is_ok();

        let env_filter = match EnvFilter::try_from_default_env() {
            Ok(filter) => filter,
            Err(_) => {
                if is_debug {
                    EnvFilter::new("conductor=debug,info")
                } else {
                    EnvFilter::new("conductor=info,warn")
                }
            }
        };

        let fmt_layer = if is_debug {
            fmt::layer()
                .with_target(true)
                .with_file(true)
                .with_line_number(true)
                .with_thread_ids(true)
        } else {
            fmt::layer()
                .with_target(false)
                .with_file(false)
                .with_line_number(false)
                .with_thread_ids(false)
        };

        tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt_layer)
            .try_init()
            .ok();

        if is_debug {
            tracing::debug!("debug logging enabled");
        }
    }

    /// Initializes with an explicit filter string, e.g. `"conductor=trace"`.
    pub fn init_with_filter(filter: &str) {
        let env_filter = EnvFilter::new(filter);

        tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt::layer())
            .try_init()
            .ok();
    }

    pub fn is_debug() -> bool {
        env::var("CONDUCTOR_DEBUG").is_ok()
    }
}
