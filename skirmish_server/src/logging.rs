// Tracing subscriber setup for the server binary.
//
// Console output with uptime timestamps and thread names (setup threads are
// named per slot, the session thread is `session`). `RUST_LOG` overrides the
// configured level.

use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

pub const DEFAULT_FILTER: &str = "info";

/// Build the filter: `RUST_LOG` if set, else `level`, else `DEFAULT_FILTER`.
pub fn env_filter(level: &str) -> EnvFilter {
    let fallback = if level.is_empty() { DEFAULT_FILTER } else { level };
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback))
}

/// Install the global subscriber. A second call is reported and ignored.
pub fn init_logging(level: &str) {
    let console_layer = fmt::layer()
        .with_target(true)
        .with_thread_names(true)
        .with_level(true)
        .with_timer(fmt::time::uptime());

    if let Err(e) = tracing_subscriber::registry()
        .with(env_filter(level))
        .with(console_layer)
        .try_init()
    {
        eprintln!("logging already initialised: {e}");
    }
}
