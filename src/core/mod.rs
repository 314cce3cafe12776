//! The tracker core: the domain types and the request pipeline, independent
//! of the delivery layer.
//!
//! Both frontends (HTTP and UDP) translate their wire requests into the
//! types in this module and hand them to [`pipeline::Logic`]:
//!
//! ```text
//! Delivery layer     Domain layer
//!
//! HTTP frontend |
//!  UDP frontend |> pipeline::Logic > storage::PeerStorage
//! ```
//!
//! The pipeline runs the configured pre-hooks, the swarm interaction, the
//! response assembly and the configured post-hooks, in that order. Refer to
//! [`pipeline`] for the execution rules and to [`storage`] for the peer
//! store contract.
use swarm_tracker_primitives::info_hash::InfoHash;
use swarm_tracker_primitives::peer::Peer;
use swarm_tracker_primitives::swarm_metadata::SwarmMetadata;

pub mod error;
pub mod hooks;
pub mod pipeline;
pub mod statistics;
pub mod storage;

/// A validated announce request, as handed to the pipeline by a frontend.
///
/// The peer carries the endpoint the tracker resolved for the client (which
/// may differ from anything the client claimed), the reported byte counters
/// and the announced event.
#[derive(Debug, Clone, PartialEq)]
pub struct AnnounceRequest {
    pub info_hash: InfoHash,
    pub peer: Peer,
    /// The number of peers the client asked for, when it did.
    pub num_want: Option<u32>,
}

/// The parameters used to build an announce response.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct AnnounceResponse {
    /// Seconds the client should wait before re-announcing.
    pub interval: u32,
    /// Seconds the client must at least wait before re-announcing.
    pub min_interval: u32,
    /// Active seeders in the swarm.
    pub complete: u32,
    /// Active leechers in the swarm.
    pub incomplete: u32,
    /// Selected IPv4 peers.
    pub ipv4_peers: Vec<Peer>,
    /// Selected IPv6 peers.
    pub ipv6_peers: Vec<Peer>,
}

/// A validated scrape request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScrapeRequest {
    pub info_hashes: Vec<InfoHash>,
}

/// The scrape counters, one file per requested infohash, in request order.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ScrapeResponse {
    pub files: Vec<ScrapeFile>,
}

/// The counters of one swarm in a scrape response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScrapeFile {
    pub info_hash: InfoHash,
    pub metadata: SwarmMetadata,
}
