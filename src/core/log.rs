use tracing_subscriber::{EnvFilter, fmt, prelude::*};

/// Directive used when `RUST_LOG` is unset. Other crates (fjall, tokio) stay
/// at warn even in verbose mode.
fn default_directives(verbose: bool) -> &'static str {
    if verbose {
        "warn,cropdesk=debug"
    } else {
        "warn"
    }
}

/// Installs a stderr subscriber so tables on stdout stay clean.
pub fn init_logging(verbose: bool) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directives(verbose)));

    tracing_subscriber::registry()
        .with(
            fmt::layer()
                .pretty()
                .without_time()
                .with_writer(std::io::stderr),
        )
        .with(filter)
        .init();
}
