//! Job starting the HTTP tracker frontend.
use std::sync::Arc;

use swarm_tracker_configuration::HttpTrackerConfig;
use tokio::sync::oneshot;

use super::{ServiceJob, Started};
use crate::core::pipeline::Logic;
use crate::core::statistics;
use crate::servers::http::handlers::HttpService;
use crate::servers::http::server;
use crate::servers::signals::Halted;

/// Starts the HTTP tracker.
///
/// # Panics
///
/// Panics if the server does not report back its bound address.
pub async fn start_job(
    config: &HttpTrackerConfig,
    logic: Arc<Logic>,
    stats_event_sender: Option<Arc<dyn statistics::EventSender>>,
) -> ServiceJob {
    let service = Arc::new(HttpService {
        logic,
        on_reverse_proxy: config.on_reverse_proxy,
        stats_event_sender,
    });

    let (tx_start, rx_start) = oneshot::channel::<Started>();
    let (tx_halt, rx_halt) = oneshot::channel::<Halted>();

    let handle = server::start_job(config.bind_address, service, config.request_timeout(), tx_start, rx_halt);

    let address = rx_start
        .await
        .expect("the http tracker should report its bound address")
        .address;

    ServiceJob {
        name: "http tracker",
        address,
        handle,
        tx_halt,
    }
}
