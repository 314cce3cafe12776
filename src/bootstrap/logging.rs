//! Setup for the application logging.
//!
//! Log lines go to the standard output with the level from the
//! configuration; the `--debug`, `--json` and `--nocolors` flags override
//! the format.
use std::sync::Once;

use swarm_tracker_configuration::{Configuration, LogLevel};
use tracing::level_filters::LevelFilter;
use tracing::info;

use super::config::Args;

static INIT: Once = Once::new();

/// Initializes the global tracing subscriber. Safe to call more than once;
/// only the first call has an effect.
pub fn setup(config: &Configuration, args: &Args) {
    let level = if args.debug {
        LevelFilter::DEBUG
    } else {
        level_filter(config.log_level)
    };

    if level == LevelFilter::OFF {
        return;
    }

    INIT.call_once(|| {
        stdout_config(level, args);

        info!("logging initialized");
    });
}

fn level_filter(log_level: LogLevel) -> LevelFilter {
    match log_level {
        LogLevel::Off => LevelFilter::OFF,
        LogLevel::Error => LevelFilter::ERROR,
        LogLevel::Warn => LevelFilter::WARN,
        LogLevel::Info => LevelFilter::INFO,
        LogLevel::Debug => LevelFilter::DEBUG,
        LogLevel::Trace => LevelFilter::TRACE,
    }
}

fn stdout_config(level: LevelFilter, args: &Args) {
    let builder = tracing_subscriber::fmt()
        .with_max_level(level)
        .with_ansi(!args.nocolors);

    if args.json {
        builder.json().init();
    } else {
        builder.init();
    }
}
