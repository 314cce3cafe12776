//! The sharded in-memory peer store.
//!
//! The store maps `InfoHash → Swarm` across a power-of-two number of shards.
//! Shard selection mixes the raw infohash bytes with a fast hasher and masks
//! the result with the shard count, so operations on different swarms rarely
//! contend. Each shard owns its swarm map and a single mutex; every
//! operation takes the shard lock exclusively. The working set per shard is
//! small and the critical sections are microsecond-scale.
//!
//! Expiry is driven from the outside: a garbage-collection job calls
//! [`remove_inactive_peers`](MemoryStore::remove_inactive_peers) on the
//! configured interval. The collector locks one shard at a time, so a long
//! sweep never blocks the whole store.
use std::collections::hash_map::DefaultHasher;
use std::collections::BTreeMap;
use std::hash::{Hash, Hasher};
use std::net::SocketAddr;
use std::time::Duration;

use parking_lot::Mutex;
use rand::Rng;
use swarm_tracker_configuration::MemoryStorageConfig;
use swarm_tracker_primitives::info_hash::InfoHash;
use swarm_tracker_primitives::peer::Peer;
use swarm_tracker_primitives::swarm_metadata::SwarmMetadata;
use swarm_tracker_primitives::DurationSinceUnixEpoch;

use super::{Error, GarbageCollectionPolicy, PeerStorage, StoreMetrics};

/// The reference [`PeerStorage`] implementation.
#[derive(Debug)]
pub struct MemoryStore {
    shards: Box<[Mutex<Shard>]>,
    shard_mask: usize,
    garbage_collection_interval: Duration,
    peer_lifetime: Duration,
    statistics_reporting_interval: Duration,
}

#[derive(Debug, Default)]
struct Shard {
    swarms: BTreeMap<InfoHash, Swarm>,
}

/// The two peer populations of one torrent plus its snatch counter.
///
/// An endpoint is in at most one of the two maps at any instant; the put and
/// graduate operations maintain that invariant.
#[derive(Debug, Default)]
struct Swarm {
    seeders: BTreeMap<SocketAddr, Peer>,
    leechers: BTreeMap<SocketAddr, Peer>,
    snatches: u32,
}

impl Swarm {
    fn is_empty(&self) -> bool {
        self.seeders.is_empty() && self.leechers.is_empty()
    }
}

impl MemoryStore {
    /// Builds the store with `shard_count` pre-allocated shards.
    ///
    /// # Panics
    ///
    /// Panics if the shard count is not a power of two. The configuration
    /// validation rejects such values before the store is built.
    #[must_use]
    pub fn new(config: &MemoryStorageConfig) -> Self {
        assert!(
            config.shard_count.is_power_of_two(),
            "the shard count must be a power of two"
        );

        let shards = (0..config.shard_count).map(|_| Mutex::new(Shard::default())).collect();

        Self {
            shards,
            shard_mask: config.shard_count - 1,
            garbage_collection_interval: config.garbage_collection_interval(),
            peer_lifetime: config.peer_lifetime(),
            statistics_reporting_interval: config.statistics_reporting_interval(),
        }
    }

    fn shard(&self, info_hash: &InfoHash) -> &Mutex<Shard> {
        let mut hasher = DefaultHasher::new();
        info_hash.bytes().hash(&mut hasher);
        #[allow(clippy::cast_possible_truncation)]
        let index = (hasher.finish() as usize) & self.shard_mask;
        &self.shards[index]
    }
}

impl PeerStorage for MemoryStore {
    fn put_seeder(&self, info_hash: InfoHash, peer: Peer) -> Result<(), Error> {
        let mut shard = self.shard(&info_hash).lock();
        let swarm = shard.swarms.entry(info_hash).or_default();

        swarm.leechers.remove(&peer.peer_addr);
        swarm.seeders.insert(peer.peer_addr, peer);

        Ok(())
    }

    fn put_leecher(&self, info_hash: InfoHash, peer: Peer) -> Result<(), Error> {
        let mut shard = self.shard(&info_hash).lock();
        let swarm = shard.swarms.entry(info_hash).or_default();

        swarm.seeders.remove(&peer.peer_addr);
        swarm.leechers.insert(peer.peer_addr, peer);

        Ok(())
    }

    fn delete_seeder(&self, info_hash: InfoHash, peer: &Peer) -> Result<(), Error> {
        let mut shard = self.shard(&info_hash).lock();
        let swarm = shard.swarms.get_mut(&info_hash).ok_or(Error::ResourceDoesNotExist)?;

        swarm
            .seeders
            .remove(&peer.peer_addr)
            .map(|_| ())
            .ok_or(Error::ResourceDoesNotExist)
    }

    fn delete_leecher(&self, info_hash: InfoHash, peer: &Peer) -> Result<(), Error> {
        let mut shard = self.shard(&info_hash).lock();
        let swarm = shard.swarms.get_mut(&info_hash).ok_or(Error::ResourceDoesNotExist)?;

        swarm
            .leechers
            .remove(&peer.peer_addr)
            .map(|_| ())
            .ok_or(Error::ResourceDoesNotExist)
    }

    fn graduate_leecher(&self, info_hash: InfoHash, peer: Peer) -> Result<(), Error> {
        let mut shard = self.shard(&info_hash).lock();
        let swarm = shard.swarms.entry(info_hash).or_default();

        // A second `completed` from a seeding endpoint is a re-announce, not
        // another snatch.
        if swarm.leechers.remove(&peer.peer_addr).is_some() || !swarm.seeders.contains_key(&peer.peer_addr) {
            swarm.snatches += 1;
        }
        swarm.seeders.insert(peer.peer_addr, peer);

        Ok(())
    }

    fn announce_peers(
        &self,
        info_hash: InfoHash,
        seeding: bool,
        max_count: usize,
        requester: &Peer,
    ) -> Result<Vec<Peer>, Error> {
        let shard = self.shard(&info_hash).lock();
        let swarm = shard.swarms.get(&info_hash).ok_or(Error::ResourceDoesNotExist)?;

        let mut peers = Vec::with_capacity(max_count.min(swarm.leechers.len() + swarm.seeders.len()));

        if seeding {
            // Seeder-to-seeder peering is useless; a seeding requester only
            // receives leechers.
            select_peers(&swarm.leechers, requester, max_count, &mut peers);
        } else {
            select_peers(&swarm.leechers, requester, max_count, &mut peers);
            select_peers(&swarm.seeders, requester, max_count, &mut peers);
        }

        Ok(peers)
    }

    fn scrape_swarm(&self, info_hash: InfoHash) -> SwarmMetadata {
        let shard = self.shard(&info_hash).lock();

        let Some(swarm) = shard.swarms.get(&info_hash) else {
            return SwarmMetadata::zeroed();
        };

        #[allow(clippy::cast_possible_truncation)]
        let metadata = SwarmMetadata {
            downloaded: swarm.snatches,
            complete: swarm.seeders.len() as u32,
            incomplete: swarm.leechers.len() as u32,
        };

        metadata
    }

    fn remove_inactive_peers(&self, current_cutoff: DurationSinceUnixEpoch) {
        for shard in self.shards.iter() {
            let mut shard = shard.lock();

            for swarm in shard.swarms.values_mut() {
                swarm.seeders.retain(|_, peer| peer.updated >= current_cutoff);
                swarm.leechers.retain(|_, peer| peer.updated >= current_cutoff);
            }

            // Swarms keep their snatch history while peers remain; an
            // emptied swarm is reclaimed here, not on the delete path.
            shard.swarms.retain(|_, swarm| !swarm.is_empty());
        }
    }

    fn collect_metrics(&self) -> StoreMetrics {
        let mut metrics = StoreMetrics::default();

        for shard in self.shards.iter() {
            let shard = shard.lock();

            metrics.torrents += shard.swarms.len() as u64;
            for swarm in shard.swarms.values() {
                metrics.seeders += swarm.seeders.len() as u64;
                metrics.leechers += swarm.leechers.len() as u64;
            }
        }

        metrics
    }

    fn garbage_collection_policy(&self) -> Option<GarbageCollectionPolicy> {
        Some(GarbageCollectionPolicy {
            interval: self.garbage_collection_interval,
            peer_lifetime: self.peer_lifetime,
        })
    }

    fn statistics_policy(&self) -> Option<Duration> {
        Some(self.statistics_reporting_interval)
    }

    fn stop(&self) -> Result<(), Error> {
        Ok(())
    }
}

/// Copies up to `max_count - peers.len()` peers from `population` into
/// `peers`, excluding the requester by endpoint equality.
///
/// Selection starts at a random offset and wraps around, so large swarms do
/// not keep handing out the same map prefix.
fn select_peers(population: &BTreeMap<SocketAddr, Peer>, requester: &Peer, max_count: usize, peers: &mut Vec<Peer>) {
    if population.is_empty() || peers.len() >= max_count {
        return;
    }

    let offset = rand::thread_rng().gen_range(0..population.len());

    for peer in population.values().cycle().skip(offset).take(population.len()) {
        if peers.len() >= max_count {
            break;
        }
        if peer.peer_addr == requester.peer_addr {
            continue;
        }
        peers.push(*peer);
    }
}
