//! Long-lived tasks spawned by the application.
//!
//! Each frontend job owns a halt channel; the application keeps the sending
//! half to stop the job on shutdown or live reload. Store-bound jobs
//! (garbage collection, statistics) hold a weak store reference and exit by
//! themselves when the store is dropped.
use std::net::SocketAddr;

use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::servers::signals::Halted;

pub mod http_tracker;
pub mod metrics_api;
pub mod stats_reporter;
pub mod swarm_cleanup;
pub mod udp_tracker;

/// The message a started service sends back with its bound address.
#[derive(Debug, Clone, Copy)]
pub struct Started {
    pub address: SocketAddr,
}

/// A running service with its halt channel.
pub struct ServiceJob {
    pub name: &'static str,
    pub address: SocketAddr,
    pub handle: JoinHandle<()>,
    pub tx_halt: tokio::sync::oneshot::Sender<Halted>,
}

impl ServiceJob {
    /// Signals the service to stop and waits for it to exit.
    pub async fn stop(self) {
        // The service may already be gone when the global shutdown signal
        // raced the halt channel.
        if self.tx_halt.send(Halted::Normal).is_err() {
            debug!("{} on {} was already gone", self.name, self.address);
        }

        if let Err(e) = self.handle.await {
            warn!("{} on {} exited abnormally: {e}", self.name, self.address);
        }
    }
}
