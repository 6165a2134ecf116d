use anyhow::{Context, Result};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;

/// Initialise logging to a file next to the binary. The default level is
/// `info`; `--debug` raises it to `debug`, and `RUST_LOG` can override
/// either. Logs go to a file because stdout belongs to the terminal UI.
pub fn init(debug: bool) -> Result<WorkerGuard> {
    let level = if debug { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let file = std::fs::File::create("overchat.log").context("create log file")?;
    let (writer, guard) = tracing_appender::non_blocking(file);
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(writer)
        .with_ansi(false)
        .try_init();
    Ok(guard)
}
