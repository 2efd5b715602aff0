use std::fs::OpenOptions;
use std::io;
use std::sync::Mutex;

use tracing_subscriber::EnvFilter;

use crate::config::Config;
use crate::error::Result;

/// Installs the global `tracing` subscriber.
///
/// `TASKDESK_LOG` (already folded into `config.log_level`) selects the filter.
/// Logs go to `config.log_file` when set. Otherwise they go to stderr, unless
/// `quiet` is set (the TUI owns the terminal), in which case nothing is
/// installed.
pub fn init(config: &Config, quiet: bool) -> Result<()> {
    let filter = EnvFilter::try_new(&config.log_level).unwrap_or_else(|_| EnvFilter::new("warn"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false);

    match &config.log_file {
        Some(path) => {
            let file = OpenOptions::new().create(true).append(true).open(path)?;
            let _ = builder
                .with_ansi(false)
                .with_writer(Mutex::new(file))
                .try_init();
        }
        None if quiet => {}
        None => {
            let _ = builder.with_writer(io::stderr).try_init();
        }
    }
    Ok(())
}
