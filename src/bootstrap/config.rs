//! Command line arguments and configuration loading.
use std::path::PathBuf;

use clap::Parser;
use swarm_tracker_configuration::Configuration;

/// A customizable, multi-protocol `BitTorrent` tracker.
#[derive(Parser, Debug, Clone)]
#[command(name = "swarm_tracker", version, about)]
pub struct Args {
    /// Location of the configuration file.
    #[arg(long, default_value = "/etc/swarm-tracker.yaml")]
    pub config: PathBuf,

    /// Enable debug logging.
    #[arg(long)]
    pub debug: bool,

    /// Enable JSON logging.
    #[arg(long)]
    pub json: bool,

    /// Disable log coloring.
    #[arg(long)]
    pub nocolors: bool,
}

/// Loads and validates the configuration file named by the arguments.
///
/// # Errors
///
/// Will return an error if the file cannot be read, does not match the
/// configuration model, or fails validation. All of these are fatal.
pub fn initialize_configuration(args: &Args) -> Result<Configuration, swarm_tracker_configuration::Error> {
    Configuration::load_from_file(&args.config)
}
