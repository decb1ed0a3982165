use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Install the global subscriber: `RUST_LOG` filter (default `info`), human-readable
/// events on stderr. Stdout is left to the programs' printed results.
pub fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
        .init();
}
