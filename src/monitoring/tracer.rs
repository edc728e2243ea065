/*!
 * Structured Tracing
 * Supervisor log output using the tracing crate
 *
 * Environment variables:
 * - RUST_LOG: log filter (default: info)
 * - SUPERVISOR_TRACE_JSON: JSON output, also settable with --log-json
 */

use tracing::info;
use tracing_subscriber::{
    fmt::format::FmtSpan, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter,
};

/// Default filter when RUST_LOG is unset
const DEFAULT_FILTER: &str = "info";

/// Install the global subscriber.
///
/// Safe to call more than once; only the first call installs a subscriber.
pub fn init_tracing(json: bool) {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    let registry = tracing_subscriber::registry().with(env_filter);

    let installed = if json {
        // JSON output for log shipping
        registry
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_target(true)
                    .with_current_span(true)
                    .with_span_list(true),
            )
            .try_init()
    } else {
        // Human-readable output for operators
        registry
            .with(
                tracing_subscriber::fmt::layer()
                    .with_target(false)
                    .with_span_events(FmtSpan::NONE)
                    .compact(),
            )
            .try_init()
    };

    if installed.is_ok() {
        info!(json, "Structured tracing initialized");
    }
}
