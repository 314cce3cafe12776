//! Wrapper translating the wire announce into the domain infohash.
use aquatic_udp_protocol::AnnounceRequest;
use swarm_tracker_primitives::info_hash::InfoHash;

/// An aquatic announce request together with its parsed domain infohash.
///
/// The BEP-15 announce layout always carries a 20-byte infohash; v2
/// torrents are addressed over UDP through their v1 truncation.
pub struct AnnounceWrapper {
    pub announce_request: AnnounceRequest,
    pub info_hash: InfoHash,
}

impl AnnounceWrapper {
    #[must_use]
    pub fn new(announce_request: &AnnounceRequest) -> Self {
        AnnounceWrapper {
            announce_request: announce_request.clone(),
            info_hash: InfoHash::V1(announce_request.info_hash.0),
        }
    }
}
