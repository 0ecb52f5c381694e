use std::fs::{self, OpenOptions};
use std::sync::Mutex;

use anyhow::{Context, Result};
use tracing_subscriber::EnvFilter;

use crate::config::LogConfig;

pub const LOG_ENV: &str = "APOD_TUI_LOG";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Target {
    /// Append to the configured log file; the terminal belongs to the UI.
    File,
    Stderr,
}

fn filter(cfg: &LogConfig) -> EnvFilter {
    EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| {
        EnvFilter::try_new(&cfg.filter).unwrap_or_else(|_| EnvFilter::new("apod_tui=info"))
    })
}

/// Installs the global subscriber. Safe to call more than once; later calls
/// are ignored.
pub fn init(cfg: &LogConfig, target: Target) -> Result<()> {
    let builder = tracing_subscriber::fmt().with_env_filter(filter(cfg));

    match (target, cfg.file.as_ref()) {
        (Target::File, Some(path)) => {
            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent)
                    .with_context(|| format!("log: create directory {}", parent.display()))?;
            }
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("log: open {}", path.display()))?;
            let _ = builder
                .with_ansi(false)
                .with_writer(Mutex::new(file))
                .try_init();
        }
        (Target::File, None) => {}
        (Target::Stderr, _) => {
            let _ = builder.with_writer(std::io::stderr).try_init();
        }
    }
    Ok(())
}
