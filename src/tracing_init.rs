//! Tracing initialization for tests and binaries.
//!
//! Library code never prints; it emits `tracing` events gated by the
//! standard `RUST_LOG`/`EnvFilter` mechanism. These helpers exist only to
//! give tests and embedding binaries a one-line way to turn that on.

use std::sync::Once;

static TRACING: Once = Once::new();

/// Initialize tracing for tests with environment-based filtering.
///
/// - `RUST_LOG=js8core=debug` - show all debug output
/// - `RUST_LOG=js8core::coarse=trace` - trace one module
/// - `RUST_LOG=js8core=debug,js8core::fine=trace` - mixed levels
///
/// Call this once at the start of each test that needs tracing. Multiple
/// calls are safe.
pub fn init_test_tracing() {
    TRACING.call_once(|| {
        use tracing_subscriber::{fmt, EnvFilter};

        let filter =
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("js8core=warn"));

        let _ = fmt()
            .with_env_filter(filter)
            .with_target(true)
            .with_thread_ids(false)
            .with_line_number(true)
            .with_test_writer()
            .try_init();
    });
}

/// Initialize tracing for binaries with environment-based filtering.
pub fn init_tracing() {
    TRACING.call_once(|| {
        use tracing_subscriber::{fmt, EnvFilter};

        let filter =
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("js8core=info"));

        let _ = fmt()
            .with_env_filter(filter)
            .with_target(true)
            .with_thread_ids(true)
            .with_line_number(true)
            .try_init();
    });
}
