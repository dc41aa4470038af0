//! Logging and tracing utilities for the OGF codec
//!
//! This module provides structured logging using the `tracing` crate,
//! with support for spans, events, and instrumentation.

use std::sync::atomic::{AtomicBool, Ordering};

/// Whether tracing has been initialized
static TRACING_INITIALIZED: AtomicBool = AtomicBool::new(false);

/// Initialize the default tracing subscriber
///
/// This should be called once at application startup. Multiple calls are safe
/// and will be ignored.
pub fn init_default() {
    init_with_config(TracingConfig::default());
}

/// Initialize tracing with a custom configuration
pub fn init_with_config(config: TracingConfig) {
    if TRACING_INITIALIZED
        .compare_exchange(false, true, Ordering::SeqCst, Ordering::Relaxed)
        .is_ok()
    {
        use tracing_subscriber::{fmt, prelude::*, EnvFilter};

        let filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(&config.default_level));

        let fmt_layer = fmt::layer()
            .with_target(config.show_target)
            .with_thread_ids(config.show_thread_ids)
            .with_file(config.show_file)
            .with_line_number(config.show_line_number)
            .with_writer(std::io::stderr);

        // A subscriber installed by the host application wins.
        let _ = tracing_subscriber::registry()
            .with(fmt_layer)
            .with(filter)
            .try_init();
    }
}

/// Configuration for tracing initialization
#[derive(Debug, Clone)]
pub struct TracingConfig {
    /// Default log level filter (e.g., "info", "debug", "warn")
    pub default_level: String,
    /// Show the target (module path) in log output
    pub show_target: bool,
    /// Show thread IDs in log output
    pub show_thread_ids: bool,
    /// Show source file in log output
    pub show_file: bool,
    /// Show line number in log output
    pub show_line_number: bool,
}

impl Default for TracingConfig {
    fn default() -> Self {
        Self {
            default_level: "warn,xray_ogf=info".to_string(),
            show_target: true,
            show_thread_ids: false,
            show_file: false,
            show_line_number: false,
        }
    }
}

/// Macros for common logging patterns
#[macro_export]
macro_rules! log_decode_start {
    ($what:expr, $path:expr) => {
        tracing::info!(
            decoder = %$what,
            path = %$path,
            "Starting decode"
        )
    };
}

#[macro_export]
macro_rules! log_decode_complete {
    ($what:expr, $duration:expr, $items:expr) => {
        tracing::info!(
            decoder = %$what,
            duration_ms = %$duration.as_millis(),
            items = %$items,
            "Decode complete"
        )
    };
}

#[macro_export]
macro_rules! log_decode_error {
    ($what:expr, $error:expr) => {
        tracing::error!(
            decoder = %$what,
            error = %$error,
            "Decode failed"
        )
    };
}

/// Instrument a decode operation with timing
pub fn instrument_decode<T, F>(name: &str, f: F) -> T
where
    F: FnOnce() -> T,
{
    let span = tracing::info_span!("decode", decoder = %name);
    let _guard = span.enter();

    let start = std::time::Instant::now();
    let result = f();
    let duration = start.elapsed();

    tracing::debug!(duration_ms = %duration.as_millis(), "Decode operation complete");

    result
}
