//! Log output for the host tools.

use tracing_subscriber::{EnvFilter, fmt, prelude::*};

/// Installs the global subscriber.
///
/// `RUST_LOG` overrides the default filter, which shows queue lifecycle
/// events and device open/close at info level.
pub fn init_tracing(verbose: bool) {
    let default = if verbose {
        "mq_core=trace,mq_device=debug,mq_host=debug"
    } else {
        "mq_core=info,mq_device=info,mq_host=info"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_target(true)
                .with_thread_ids(true)
                .with_file(false)
                .with_line_number(false)
                .with_timer(fmt::time::uptime()),
        )
        .with(filter)
        .init();
}
