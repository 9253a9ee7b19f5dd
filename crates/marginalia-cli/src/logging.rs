//! Logging setup
//!
//! Logging is off unless MARGINALIA_LOG is set; its value is the level
//! (or any `EnvFilter` directive) applied to the marginalia crates.
//! Output goes to `log_file` when configured, stderr otherwise.

use std::fs::OpenOptions;
use std::sync::Mutex;

use tracing::debug;
use tracing_subscriber::EnvFilter;

use marginalia_core::Config;

/// Environment variable that enables logging
const LOG_ENV: &str = "MARGINALIA_LOG";

/// Initialize logging for the CLI
pub fn init_logging(config: &Config) {
    let Ok(log_level) = std::env::var(LOG_ENV) else {
        return;
    };

    let env_filter = EnvFilter::new(filter_directives(&log_level));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false);

    match config.log_file {
        Some(ref log_path) => {
            let log_file = match OpenOptions::new().create(true).append(true).open(log_path) {
                Ok(f) => f,
                Err(e) => {
                    eprintln!("Warning: Could not open log file {:?}: {}", log_path, e);
                    return;
                }
            };
            // Ignore the error if a subscriber is already installed
            let _ = builder
                .with_ansi(false)
                .with_writer(Mutex::new(log_file))
                .try_init();
            debug!("Logging to {:?}", log_path);
        }
        None => {
            let _ = builder.with_writer(std::io::stderr).try_init();
        }
    }
}

/// Filter directives scoping a level to the marginalia crates
fn filter_directives(log_level: &str) -> String {
    let level = log_level.trim();
    let level = if level.is_empty() { "info" } else { level };
    format!("marginalia_core={},marginalia_cli={}", level, level)
}
