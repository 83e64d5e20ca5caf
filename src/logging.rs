//! Diagnostic output on stderr.
//!
//! Warnings (skipped requests, dropped members, unknown groups) are always
//! shown. `ENUMGEN_LOG` takes a `RUST_LOG`-style filter and wins over
//! `RUST_LOG`; `--debug` forces `debug` for the whole crate.
//!
//! ```bash
//! ENUMGEN_LOG=enumgen::resolve=debug enumgen -s vk.xml requests.txt
//! ```

use tracing_subscriber::EnvFilter;

pub const LOG_ENV: &str = "ENUMGEN_LOG";

fn build_filter(debug: bool) -> EnvFilter {
    if debug {
        return EnvFilter::new("enumgen=debug");
    }
    match std::env::var(LOG_ENV) {
        Ok(val) => EnvFilter::builder().parse_lossy(val),
        Err(_) => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
    }
}

/// Install the global subscriber. Safe to call more than once; later calls
/// are ignored.
pub fn init_tracing(debug: bool) {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(build_filter(debug))
        .with_writer(std::io::stderr)
        .without_time()
        .with_target(debug)
        .try_init();
}
