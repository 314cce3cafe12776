//! The configurable hooks of the request pipeline.
//!
//! Hooks are assembled by an explicit builder at startup from the typed
//! configuration; there is no process-wide registry. The order of the
//! configured lists is the execution order.
use swarm_tracker_configuration::HookConfig;
use thiserror::Error;

use crate::core::pipeline::Hook;

pub mod client_approval;
pub mod torrent_approval;
pub mod varinterval;

/// Errors building a hook from its configuration. Fatal at startup.
#[derive(Error, Debug)]
pub enum BuildError {
    #[error("invalid infohash \"{value}\" in the torrent approval list")]
    InvalidApprovalHash { value: String },
}

/// Builds one hook chain (pre or post) from its configured list.
///
/// # Errors
///
/// Will return a [`BuildError`] if a hook rejects its options.
pub fn build_hooks(configs: &[HookConfig]) -> Result<Vec<Box<dyn Hook>>, BuildError> {
    let mut hooks: Vec<Box<dyn Hook>> = Vec::with_capacity(configs.len());

    for config in configs {
        match config {
            HookConfig::ClientApproval { options } => {
                hooks.push(Box::new(client_approval::ClientApproval::new(options)));
            }
            HookConfig::TorrentApproval { options } => {
                hooks.push(Box::new(torrent_approval::TorrentApproval::new(options)?));
            }
            HookConfig::Varinterval { options } => {
                hooks.push(Box::new(varinterval::Varinterval::new(options)));
            }
        }
    }

    Ok(hooks)
}
