//! Tracing initialization.
//!
//! Uses `config::ObservabilityConfig` for DORMTWIN_QUIET, DORMTWIN_LOG_LEVEL
//! and DORMTWIN_LOG_JSON. `RUST_LOG` takes precedence when set.

use tracing_subscriber::{prelude::*, EnvFilter};

/// Tracing initialization mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TracingMode {
    /// Use the configured level as is.
    Default,
    /// Interactive REPL: keep agent-internal INFO lines out of the prompt area.
    Chat,
}

/// Build the filter directive string for a mode. Split out for testing.
pub fn filter_directives(mode: TracingMode, quiet: bool, log_level: &str) -> String {
    let mut level = if quiet {
        "dormtwin=warn".to_string()
    } else {
        log_level.to_string()
    };
    if mode == TracingMode::Chat {
        level = format!("{},dormtwin_agent=warn", level);
    }
    level
}

/// Initialize tracing. Call once at process startup; later calls are no-ops.
pub fn init_tracing(mode: TracingMode) {
    let cfg = crate::config::ObservabilityConfig::from_env();
    let level = filter_directives(mode, cfg.quiet, &cfg.log_level);
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&level));

    let _ = if cfg.log_json {
        tracing_subscriber::registry()
            .with(filter)
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_target(true)
                    .with_thread_ids(false)
                    .with_writer(std::io::stderr),
            )
            .try_init()
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(
                tracing_subscriber::fmt::layer()
                    .with_target(true)
                    .with_thread_ids(false)
                    .with_writer(std::io::stderr),
            )
            .try_init()
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_filter_directives() {
        assert_eq!(filter_directives(TracingMode::Default, false, "dormtwin=debug"), "dormtwin=debug");
        assert_eq!(filter_directives(TracingMode::Default, true, "dormtwin=debug"), "dormtwin=warn");
        assert_eq!(
            filter_directives(TracingMode::Chat, false, "dormtwin=info"),
            "dormtwin=info,dormtwin_agent=warn"
        );
    }
}
