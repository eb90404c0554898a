//! Installs the global `tracing` subscriber used by the binary.
use std::error::Error;
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::{fmt, layer::SubscriberExt, Registry};

/// Log events at `level` and above to stderr. `level` is one of `off`, `error`,
/// `warn`, `info`, `debug`, `trace`.
pub fn init_logging(level: &str) -> Result<(), Box<dyn Error>> {
    let filter: LevelFilter = level.parse()?;
    let subscriber = Registry::default()
        .with(filter)
        .with(fmt::layer().with_target(false).without_time().with_writer(std::io::stderr));
    tracing::subscriber::set_global_default(subscriber).map_err(Box::from)
}
