//! Logging initialization for the CLI.
//!
//! Only diagnostics go through tracing. The status lines a user reads come
//! from the core's `Logger` and the console sink in `output`.

use tracing::Level;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Initialize the tracing subscriber.
///
/// # Arguments
/// * `verbosity` - 0-1 = WARN, 2 = DEBUG, 3+ = TRACE
/// * `json` - If true, emit JSON lines to stderr
///
/// When `RUST_LOG` is set it decides the filter on its own, unless `-vv` or
/// more is given; then crown's targets are forced to the verbosity level.
pub fn init(verbosity: u8, json: bool) {
    let from_env = EnvFilter::try_from_default_env().ok();
    let rust_log_set = from_env.is_some();
    let mut filter = from_env.unwrap_or_else(|| EnvFilter::new("warn"));
    for directive in target_directives(verbosity, rust_log_set) {
        if let Ok(directive) = directive.parse() {
            filter = filter.add_directive(directive);
        }
    }

    let subscriber = tracing_subscriber::registry().with(filter);

    if json {
        subscriber
            .with(
                fmt::layer()
                    .json()
                    .with_current_span(true)
                    .with_span_list(false)
                    .with_writer(std::io::stderr),
            )
            .init();
    } else {
        subscriber
            .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
            .init();
    }
}

/// Per-target directives layered over the base filter.
fn target_directives(verbosity: u8, rust_log_set: bool) -> Vec<String> {
    if rust_log_set && verbosity < 2 {
        return Vec::new();
    }
    let level = match verbosity {
        0 | 1 => Level::WARN,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    };
    ["crown", "crown_core"]
        .iter()
        .map(|target| format!("{target}={level}"))
        .collect()
}
