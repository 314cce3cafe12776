//! Job that garbage-collects stale peers on an interval.
//!
//! On each tick the collector computes the cutoff from the store's peer
//! lifetime, walks every shard (one lock at a time) through
//! `remove_inactive_peers` and publishes the sweep duration. A sweep may
//! take longer than a request, which is fine: it never holds more than one
//! shard lock at once.
use std::sync::Arc;
use std::time::Instant;

use swarm_tracker_clock::clock::Time;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::core::statistics;
use crate::core::storage::{GarbageCollectionPolicy, PeerStorage};
use crate::servers::signals::global_shutdown_signal;
use crate::CurrentClock;

/// Starts the garbage collection job for a store.
///
/// The job holds only a weak store reference; it exits when the store is
/// dropped or the process shuts down.
#[must_use]
pub fn start_job(
    store: &Arc<dyn PeerStorage>,
    policy: GarbageCollectionPolicy,
    stats_event_sender: Option<Arc<dyn statistics::EventSender>>,
) -> JoinHandle<()> {
    let weak_store = Arc::downgrade(store);

    tokio::spawn(async move {
        let mut interval = tokio::time::interval(policy.interval);
        interval.tick().await;

        loop {
            tokio::select! {
                () = global_shutdown_signal() => {
                    info!("stopping the peer cleanup job");
                    break;
                }
                _ = interval.tick() => {
                    let Some(store) = weak_store.upgrade() else {
                        break;
                    };

                    let cutoff = CurrentClock::now_sub(&policy.peer_lifetime).unwrap_or_default();

                    let sweep_start = Instant::now();
                    store.remove_inactive_peers(cutoff);
                    let elapsed = sweep_start.elapsed();

                    debug!("removed inactive peers in {}ms", elapsed.as_millis());

                    if let Some(sender) = &stats_event_sender {
                        sender
                            .send_event(statistics::Event::GarbageCollectionRun { elapsed })
                            .await;
                    }
                }
            }
        }
    })
}
