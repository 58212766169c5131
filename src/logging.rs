use tracing_subscriber::EnvFilter;

pub const LOG_ENV: &str = "CARMART_LOG";

/// Stderr subscriber; stdout stays reserved for command output.
pub fn init(verbosity: u8) {
    let filter = EnvFilter::try_from_env(LOG_ENV)
        .unwrap_or_else(|_| EnvFilter::new(default_directive(verbosity)));

    // A second init (tests driving `run` twice) is harmless.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(verbosity > 1)
        .compact()
        .try_init();
}

fn default_directive(verbosity: u8) -> &'static str {
    match verbosity {
        0 => "warn",
        1 => "carmart=info",
        _ => "carmart=debug",
    }
}
