use tracing_subscriber::{EnvFilter, fmt, prelude::*};

/// Installs a stderr subscriber for the command line tools.
///
/// `RUST_LOG` wins when set. Otherwise `verbose` picks `info` over `warn`.
/// Calling this twice is harmless.
pub fn init_logging(verbose: bool) {
    let fallback = if verbose { "silkpatch=info" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback));

    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
        .try_init();
}
