//! Job that refreshes the swarm gauges on an interval.
//!
//! This is the only reader that traverses the entire store; requests never
//! do. The walk takes each shard lock in turn and publishes the totals for
//! the torrents, seeders and leechers gauges.
use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::info;

use crate::core::statistics;
use crate::core::storage::PeerStorage;
use crate::servers::signals::global_shutdown_signal;

/// Starts the statistics collection job for a store.
#[must_use]
pub fn start_job(
    store: &Arc<dyn PeerStorage>,
    reporting_interval: Duration,
    stats_event_sender: Option<Arc<dyn statistics::EventSender>>,
) -> JoinHandle<()> {
    let weak_store = Arc::downgrade(store);

    tokio::spawn(async move {
        let mut interval = tokio::time::interval(reporting_interval);
        interval.tick().await;

        loop {
            tokio::select! {
                () = global_shutdown_signal() => {
                    info!("stopping the statistics collection job");
                    break;
                }
                _ = interval.tick() => {
                    let Some(store) = weak_store.upgrade() else {
                        break;
                    };

                    let metrics = store.collect_metrics();

                    if let Some(sender) = &stats_event_sender {
                        sender
                            .send_event(statistics::Event::SwarmGaugesRefreshed { metrics })
                            .await;
                    }
                }
            }
        }
    })
}
