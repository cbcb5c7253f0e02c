use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// Install the global subscriber. Events go to stderr so they never interleave
/// with the progress report on stdout.
///
/// The filter comes from `level` when given, otherwise from `RUST_LOG`,
/// otherwise `warn`.
pub fn init_tracing(level: Option<&str>) -> Result<(), Box<dyn std::error::Error>> {
    let filter = match level {
        Some(level) => EnvFilter::try_new(level)?,
        None => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
    };

    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false);

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt_layer)
        .try_init()?;

    Ok(())
}
