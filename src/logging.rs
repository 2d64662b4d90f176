//! Setting up `tracing` output for the ledger.

use std::{fs::OpenOptions, io, path::Path, sync::Arc};

use tracing_subscriber::{EnvFilter, Layer, layer::SubscriberExt, util::SubscriberInitExt};

/// Install a global tracing subscriber.
///
/// Events at `default_level` and above are written to stderr. The level can be
/// overridden with the `RUST_LOG` environment variable. If `log_file` is given,
/// debug level events are also appended to that file.
///
/// Calling this more than once has no further effect.
///
/// # Errors
/// Returns an error if the log file cannot be opened.
pub fn init_logging(default_level: &str, log_file: Option<&Path>) -> Result<(), io::Error> {
    let stderr_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let stderr_log = tracing_subscriber::fmt::layer()
        .with_writer(io::stderr)
        .with_filter(stderr_filter);

    let file_log = match log_file {
        Some(path) => {
            let file = OpenOptions::new().create(true).append(true).open(path)?;

            Some(
                tracing_subscriber::fmt::layer()
                    .with_ansi(false)
                    .with_writer(Arc::new(file))
                    .with_filter(EnvFilter::new("debug")),
            )
        }
        None => None,
    };

    if tracing_subscriber::registry()
        .with(stderr_log)
        .with(file_log)
        .try_init()
        .is_err()
    {
        tracing::debug!("Tracing subscriber already installed");
    }

    Ok(())
}
