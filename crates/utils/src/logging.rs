//! provides logging helpers

use tracing_subscriber::filter::{self};
use tracing_subscriber::fmt::layer;
use tracing_subscriber::prelude::*;
use tracing_subscriber::registry;

/// initiate the global tracing subscriber
///
/// Events go to stderr so that command output on stdout stays machine readable.
/// The level defaults to `INFO` and can be overridden with `RUST_LOG`.
pub fn init() {
    let env_filter = filter::EnvFilter::builder()
        .with_default_directive(filter::LevelFilter::INFO.into())
        .from_env_lossy();

    let fmt_layer = layer()
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_filter(env_filter);

    registry().with(fmt_layer).init();
}

/// like [`init`] but with an explicit default directive, e.g. `pod_runner=debug`
///
/// Returns `false` if a global subscriber was already installed.
pub fn try_init_with(default_directive: &str) -> bool {
    let env_filter = filter::EnvFilter::builder()
        .with_default_directive(filter::LevelFilter::INFO.into())
        .parse_lossy(default_directive);

    let fmt_layer = layer()
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_filter(env_filter);

    registry().with(fmt_layer).try_init().is_ok()
}
