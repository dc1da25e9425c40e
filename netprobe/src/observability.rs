use tracing_subscriber::EnvFilter;

/// Map `-v` occurrences to a default filter directive.
pub fn default_directive(verbosity: u8) -> &'static str {
    match verbosity {
        0 => "netprobe=warn",
        1 => "netprobe=info",
        2 => "netprobe=debug,netprobe_config=debug",
        _ => "trace",
    }
}

/// Install the global fmt subscriber, logging to stderr.
///
/// `RUST_LOG` takes precedence over `verbosity` when set.
pub fn init_tracing(verbosity: u8) -> anyhow::Result<()> {
    let filter = match std::env::var(EnvFilter::DEFAULT_ENV) {
        Ok(value) if !value.is_empty() => EnvFilter::try_new(value)?,
        _ => EnvFilter::try_new(default_directive(verbosity))?,
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|e| anyhow::anyhow!("{e}"))?;
    Ok(())
}
