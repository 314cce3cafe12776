//! The peer storage contract.
//!
//! A peer store keeps, for each infohash, two disjoint peer populations
//! (seeders and leechers) plus a snatch counter, and serves the peer
//! selection for announce responses. The [`memory`] module contains the
//! reference implementation; external stores (Redis, SQL, LMDB) implement
//! the same [`PeerStorage`] trait and are selected through
//! `storage.name` in the configuration.
//!
//! All operations are blocking and must be cheap enough to call from an
//! async request handler; a store backed by remote I/O is expected to manage
//! its own connection pooling and timeouts.
use std::sync::Arc;
use std::time::Duration;

use swarm_tracker_configuration::StorageConfig;
use swarm_tracker_primitives::info_hash::InfoHash;
use swarm_tracker_primitives::peer::Peer;
use swarm_tracker_primitives::swarm_metadata::SwarmMetadata;
use swarm_tracker_primitives::DurationSinceUnixEpoch;
use thiserror::Error;

pub mod memory;

/// Errors returned by a peer store.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// The addressed swarm or peer is not in the store. Never fatal: callers
    /// swallow it where semantically sensible (delete-then-not-present,
    /// announce-when-empty) and translate it elsewhere.
    #[error("resource does not exist")]
    ResourceDoesNotExist,

    /// The store backend is temporarily unavailable.
    #[error("store unavailable: {reason}")]
    Unavailable { reason: String },
}

/// Totals across the whole store, published as gauges.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct StoreMetrics {
    pub torrents: u64,
    pub seeders: u64,
    pub leechers: u64,
}

/// How often the core has to drive garbage collection for a store, and how
/// long a peer may stay without announcing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GarbageCollectionPolicy {
    pub interval: Duration,
    pub peer_lifetime: Duration,
}

/// The operations the request pipeline runs against a peer store.
pub trait PeerStorage: Send + Sync + std::fmt::Debug + 'static {
    /// Inserts or refreshes the peer in the seeder set, removing it from the
    /// leecher set if present. Idempotent.
    ///
    /// # Errors
    ///
    /// Will return an [`Error`] if the store backend fails.
    fn put_seeder(&self, info_hash: InfoHash, peer: Peer) -> Result<(), Error>;

    /// Inserts or refreshes the peer in the leecher set, removing it from
    /// the seeder set if present. Idempotent.
    ///
    /// # Errors
    ///
    /// Will return an [`Error`] if the store backend fails.
    fn put_leecher(&self, info_hash: InfoHash, peer: Peer) -> Result<(), Error>;

    /// Removes the peer (by endpoint equality) from the seeder set.
    ///
    /// # Errors
    ///
    /// Will return [`Error::ResourceDoesNotExist`] if the swarm or the peer
    /// is unknown.
    fn delete_seeder(&self, info_hash: InfoHash, peer: &Peer) -> Result<(), Error>;

    /// Removes the peer (by endpoint equality) from the leecher set.
    ///
    /// # Errors
    ///
    /// Will return [`Error::ResourceDoesNotExist`] if the swarm or the peer
    /// is unknown.
    fn delete_leecher(&self, info_hash: InfoHash, peer: &Peer) -> Result<(), Error>;

    /// Moves the peer from the leecher set to the seeder set, incrementing
    /// the swarm snatch counter when an actual graduation happens. A peer
    /// that is already a seeder is refreshed without another increment.
    ///
    /// # Errors
    ///
    /// Will return an [`Error`] if the store backend fails.
    fn graduate_leecher(&self, info_hash: InfoHash, peer: Peer) -> Result<(), Error>;

    /// Returns up to `max_count` peers of the swarm, never including the
    /// requester (by endpoint equality).
    ///
    /// A seeding requester receives only leechers. A leeching requester
    /// receives leechers first, then seeders, up to the budget.
    ///
    /// # Errors
    ///
    /// Will return [`Error::ResourceDoesNotExist`] if the swarm is unknown.
    fn announce_peers(
        &self,
        info_hash: InfoHash,
        seeding: bool,
        max_count: usize,
        requester: &Peer,
    ) -> Result<Vec<Peer>, Error>;

    /// Returns the swarm counters. An unknown swarm yields zeros, not an
    /// error.
    fn scrape_swarm(&self, info_hash: InfoHash) -> SwarmMetadata;

    /// Evicts peers whose last announce is older than `current_cutoff`, and
    /// the swarms this leaves empty.
    fn remove_inactive_peers(&self, current_cutoff: DurationSinceUnixEpoch);

    /// Walks the store and returns the totals for the swarm gauges.
    fn collect_metrics(&self) -> StoreMetrics;

    /// When `Some`, the core schedules garbage collection sweeps calling
    /// [`remove_inactive_peers`](PeerStorage::remove_inactive_peers); a store
    /// that expires peers by itself returns `None`.
    fn garbage_collection_policy(&self) -> Option<GarbageCollectionPolicy>;

    /// When `Some`, the core periodically refreshes the swarm gauges calling
    /// [`collect_metrics`](PeerStorage::collect_metrics).
    fn statistics_policy(&self) -> Option<Duration>;

    /// Releases the resources owned by the store.
    ///
    /// # Errors
    ///
    /// Will return an [`Error`] if the backend cannot shut down cleanly.
    fn stop(&self) -> Result<(), Error>;
}

/// Builds the peer store selected by the configuration.
#[must_use]
pub fn build(config: &StorageConfig) -> Arc<dyn PeerStorage> {
    match config {
        StorageConfig::Memory { config } => Arc::new(memory::MemoryStore::new(config)),
    }
}
