use tracing_subscriber::{EnvFilter, fmt, prelude::*};

/// Install the global tracing subscriber.
///
/// `ROTOR_LOG` (or `RUST_LOG`) wins over the defaults: `debug` with
/// `--verbose`, `info` otherwise.
pub fn init(verbose: bool) {
    let default = if verbose { "rotor=debug" } else { "rotor=info" };
    let filter = std::env::var("ROTOR_LOG")
        .ok()
        .and_then(|spec| EnvFilter::try_new(spec).ok())
        .or_else(|| EnvFilter::try_from_default_env().ok())
        .unwrap_or_else(|| EnvFilter::new(default));

    tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_file(false)
                .with_line_number(false)
                .with_target(false)
                .compact()
                .with_writer(std::io::stderr)
                .with_timer(fmt::time::ChronoUtc::rfc_3339())
                .with_filter(filter),
        )
        .init();
}
