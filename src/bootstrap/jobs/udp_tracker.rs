//! Job starting the UDP tracker frontend.
use std::sync::Arc;
use std::time::Duration;

use swarm_tracker_configuration::UdpTrackerConfig;
use tokio::sync::oneshot;
use tracing::info;

use super::{ServiceJob, Started};
use crate::core::pipeline::Logic;
use crate::core::statistics;
use crate::servers::signals::{global_shutdown_signal, Halted};
use crate::servers::udp::connection_cookie::SecretKeeper;
use crate::servers::udp::handlers::UdpService;
use crate::servers::udp::server;

/// How often a generated connection-ID secret is replaced.
const SECRET_ROTATION_INTERVAL: Duration = Duration::from_secs(3600);

/// Starts the UDP tracker and, when the secret was generated rather than
/// configured, its hourly rotation task.
///
/// # Panics
///
/// Panics if the server does not report back its bound address.
pub async fn start_job(
    config: &UdpTrackerConfig,
    logic: Arc<Logic>,
    stats_event_sender: Option<Arc<dyn statistics::EventSender>>,
) -> ServiceJob {
    let secrets = Arc::new(SecretKeeper::from_private_key(&config.private_key));

    if config.private_key.is_empty() {
        spawn_rotation_task(&secrets);
    }

    let service = Arc::new(UdpService {
        logic,
        secrets,
        max_clock_skew: config.max_clock_skew,
        stats_event_sender,
    });

    let (tx_start, rx_start) = oneshot::channel::<Started>();
    let (tx_halt, rx_halt) = oneshot::channel::<Halted>();

    let handle = server::start_job(config.bind_address, service, tx_start, rx_halt);

    let address = rx_start.await.expect("the udp tracker should report its bound address").address;

    ServiceJob {
        name: "udp tracker",
        address,
        handle,
        tx_halt,
    }
}

fn spawn_rotation_task(secrets: &Arc<SecretKeeper>) {
    let weak_secrets = Arc::downgrade(secrets);

    tokio::spawn(async move {
        let mut interval = tokio::time::interval(SECRET_ROTATION_INTERVAL);
        interval.tick().await;

        loop {
            tokio::select! {
                () = global_shutdown_signal() => break,
                _ = interval.tick() => {
                    let Some(secrets) = weak_secrets.upgrade() else {
                        break;
                    };
                    secrets.rotate();
                    info!("rotated the udp connection-id secret");
                }
            }
        }
    });
}
