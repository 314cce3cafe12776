//! Tracker metrics collection.
//!
//! The tracker counts announces, scrapes and UDP connections per protocol
//! and IP family, keeps gauges for the swarm totals and records garbage
//! collection sweep durations.
//!
//! The data is collected with an `event sender -> event listener` model: the
//! request handlers send an [`Event`] through the [`EventSender`]; the
//! [`Keeper`] listens for events and updates the [`Repo`]. The metrics
//! exposition endpoint reads the [`Repo`].
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
#[cfg(test)]
use mockall::automock;
use tokio::sync::mpsc::error::SendError;
use tokio::sync::{mpsc, RwLock, RwLockReadGuard};
use tracing::debug;

use crate::core::storage::StoreMetrics;

const CHANNEL_BUFFER_SIZE: usize = 65_535;

/// A metrics event.
///
/// - `Tcp` prefix: the HTTP tracker. `Udp` prefix: the UDP tracker.
/// - `4` or `6`: the IP family the peer used.
/// - The suffix is the request type; `Error` counts requests answered with a
///   non-client failure.
#[derive(Debug, PartialEq, Eq, Clone)]
pub enum Event {
    Tcp4Announce,
    Tcp4Scrape,
    Tcp4Error,
    Tcp6Announce,
    Tcp6Scrape,
    Tcp6Error,
    Udp4Connect,
    Udp4Announce,
    Udp4Scrape,
    Udp4Error,
    Udp6Connect,
    Udp6Announce,
    Udp6Scrape,
    Udp6Error,
    /// A garbage collection sweep finished.
    GarbageCollectionRun { elapsed: Duration },
    /// The statistics job walked the store and refreshed the swarm gauges.
    SwarmGaugesRefreshed { metrics: StoreMetrics },
}

/// Counters and gauges kept by the tracker.
#[derive(Debug, PartialEq, Default, Clone)]
pub struct Metrics {
    pub tcp4_announces_handled: u64,
    pub tcp4_scrapes_handled: u64,
    pub tcp4_errors_handled: u64,
    pub tcp6_announces_handled: u64,
    pub tcp6_scrapes_handled: u64,
    pub tcp6_errors_handled: u64,
    pub udp4_connections_handled: u64,
    pub udp4_announces_handled: u64,
    pub udp4_scrapes_handled: u64,
    pub udp4_errors_handled: u64,
    pub udp6_connections_handled: u64,
    pub udp6_announces_handled: u64,
    pub udp6_scrapes_handled: u64,
    pub udp6_errors_handled: u64,

    /// Swarm totals from the latest store walk.
    pub torrents: u64,
    pub seeders: u64,
    pub leechers: u64,

    /// Garbage collection sweeps run so far.
    pub gc_sweeps_run: u64,
    /// Accumulated sweep time.
    pub gc_sweep_duration_total: Duration,
    /// Duration of the latest sweep.
    pub gc_sweep_duration_last: Duration,
}

/// The service keeping the tracker metrics: it listens for events and
/// updates the repository.
pub struct Keeper {
    pub repository: Repo,
}

impl Default for Keeper {
    fn default() -> Self {
        Self::new()
    }
}

impl Keeper {
    #[must_use]
    pub fn new() -> Self {
        Self { repository: Repo::new() }
    }

    /// Builds a keeper with a running event listener and returns the sender
    /// half together with the shared repository.
    #[must_use]
    pub fn new_active_instance() -> (Box<dyn EventSender>, Repo) {
        let mut keeper = Self::new();

        let event_sender = keeper.run_event_listener();

        (event_sender, keeper.repository)
    }

    pub fn run_event_listener(&mut self) -> Box<dyn EventSender> {
        let (sender, receiver) = mpsc::channel::<Event>(CHANNEL_BUFFER_SIZE);

        let repo = self.repository.clone();

        tokio::spawn(async move { event_listener(receiver, repo).await });

        Box::new(Sender { sender })
    }
}

async fn event_listener(mut receiver: mpsc::Receiver<Event>, repo: Repo) {
    while let Some(event) = receiver.recv().await {
        debug!("stats event: {event:?}");
        repo.handle_event(event).await;
    }
}

/// A trait to allow sending metrics events.
#[async_trait]
#[cfg_attr(test, automock)]
pub trait EventSender: Sync + Send {
    async fn send_event(&self, event: Event) -> Option<Result<(), SendError<Event>>>;
}

/// The [`EventSender`] implementation backed by the keeper channel.
pub struct Sender {
    sender: mpsc::Sender<Event>,
}

#[async_trait]
impl EventSender for Sender {
    async fn send_event(&self, event: Event) -> Option<Result<(), SendError<Event>>> {
        Some(self.sender.send(event).await)
    }
}

/// The shared repository of tracker metrics.
#[derive(Clone)]
pub struct Repo {
    pub stats: Arc<RwLock<Metrics>>,
}

impl Default for Repo {
    fn default() -> Self {
        Self::new()
    }
}

impl Repo {
    #[must_use]
    pub fn new() -> Self {
        Self {
            stats: Arc::new(RwLock::new(Metrics::default())),
        }
    }

    pub async fn get_stats(&self) -> RwLockReadGuard<'_, Metrics> {
        self.stats.read().await
    }

    pub async fn handle_event(&self, event: Event) {
        let mut stats = self.stats.write().await;

        match event {
            Event::Tcp4Announce => stats.tcp4_announces_handled += 1,
            Event::Tcp4Scrape => stats.tcp4_scrapes_handled += 1,
            Event::Tcp4Error => stats.tcp4_errors_handled += 1,
            Event::Tcp6Announce => stats.tcp6_announces_handled += 1,
            Event::Tcp6Scrape => stats.tcp6_scrapes_handled += 1,
            Event::Tcp6Error => stats.tcp6_errors_handled += 1,
            Event::Udp4Connect => stats.udp4_connections_handled += 1,
            Event::Udp4Announce => stats.udp4_announces_handled += 1,
            Event::Udp4Scrape => stats.udp4_scrapes_handled += 1,
            Event::Udp4Error => stats.udp4_errors_handled += 1,
            Event::Udp6Connect => stats.udp6_connections_handled += 1,
            Event::Udp6Announce => stats.udp6_announces_handled += 1,
            Event::Udp6Scrape => stats.udp6_scrapes_handled += 1,
            Event::Udp6Error => stats.udp6_errors_handled += 1,
            Event::GarbageCollectionRun { elapsed } => {
                stats.gc_sweeps_run += 1;
                stats.gc_sweep_duration_total += elapsed;
                stats.gc_sweep_duration_last = elapsed;
            }
            Event::SwarmGaugesRefreshed { metrics } => {
                stats.torrents = metrics.torrents;
                stats.seeders = metrics.seeders;
                stats.leechers = metrics.leechers;
            }
        }

        drop(stats);
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use crate::core::statistics::{Event, Keeper, Metrics, Repo};
    use crate::core::storage::StoreMetrics;

    #[tokio::test]
    async fn stats_should_start_at_zero() {
        let keeper = Keeper::new();

        assert_eq!(*keeper.repository.get_stats().await, Metrics::default());
    }

    #[tokio::test]
    async fn each_request_event_should_increase_its_counter() {
        let repo = Repo::new();

        repo.handle_event(Event::Tcp4Announce).await;
        repo.handle_event(Event::Tcp6Scrape).await;
        repo.handle_event(Event::Udp4Connect).await;
        repo.handle_event(Event::Udp4Connect).await;
        repo.handle_event(Event::Udp6Error).await;

        let stats = repo.get_stats().await;
        assert_eq!(stats.tcp4_announces_handled, 1);
        assert_eq!(stats.tcp6_scrapes_handled, 1);
        assert_eq!(stats.udp4_connections_handled, 2);
        assert_eq!(stats.udp6_errors_handled, 1);
    }

    #[tokio::test]
    async fn gc_sweeps_should_be_recorded_with_their_duration() {
        let repo = Repo::new();

        repo.handle_event(Event::GarbageCollectionRun {
            elapsed: Duration::from_millis(5),
        })
        .await;
        repo.handle_event(Event::GarbageCollectionRun {
            elapsed: Duration::from_millis(3),
        })
        .await;

        let stats = repo.get_stats().await;
        assert_eq!(stats.gc_sweeps_run, 2);
        assert_eq!(stats.gc_sweep_duration_total, Duration::from_millis(8));
        assert_eq!(stats.gc_sweep_duration_last, Duration::from_millis(3));
    }

    #[tokio::test]
    async fn swarm_gauges_should_be_replaced_not_accumulated() {
        let repo = Repo::new();

        repo.handle_event(Event::SwarmGaugesRefreshed {
            metrics: StoreMetrics {
                torrents: 5,
                seeders: 10,
                leechers: 20,
            },
        })
        .await;
        repo.handle_event(Event::SwarmGaugesRefreshed {
            metrics: StoreMetrics {
                torrents: 4,
                seeders: 9,
                leechers: 18,
            },
        })
        .await;

        let stats = repo.get_stats().await;
        assert_eq!((stats.torrents, stats.seeders, stats.leechers), (4, 9, 18));
    }
}
