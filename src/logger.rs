use tracing_subscriber::EnvFilter;

/// Level used when neither `--verbose`, `--quiet` nor `RUST_LOG` say otherwise
fn default_directive(verbose: bool, quiet: bool) -> &'static str {
    if quiet {
        "error"
    } else if verbose {
        "tiny_squeeze=debug,warn"
    } else {
        "warn"
    }
}

/// Install the global tracing subscriber, writing to stderr.
///
/// `RUST_LOG` takes precedence over the command line flags. Calling this twice
/// is harmless; the second subscriber is ignored.
pub fn init(verbose: bool, quiet: bool) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directive(verbose, quiet)));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .without_time()
        .try_init();
}
