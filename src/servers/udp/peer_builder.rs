//! Logic to extract the peer info from an announce request.
use std::net::{IpAddr, SocketAddr};

use swarm_tracker_clock::clock::Time;
use swarm_tracker_primitives::announce_event::AnnounceEvent;
use swarm_tracker_primitives::peer::{Id, Peer};

use super::request::AnnounceWrapper;
use crate::CurrentClock;

/// Builds the domain peer from the wire announce.
///
/// The IP in the announce payload is ignored; `peer_ip` is the address the
/// datagram actually came from.
#[must_use]
pub fn from_request(announce_wrapper: &AnnounceWrapper, peer_ip: &IpAddr) -> Peer {
    let request = &announce_wrapper.announce_request;

    Peer {
        peer_id: Id(request.peer_id.0),
        peer_addr: SocketAddr::new(*peer_ip, request.port.0),
        updated: CurrentClock::now(),
        uploaded: request.bytes_uploaded.0,
        downloaded: request.bytes_downloaded.0,
        left: request.bytes_left.0,
        event: map_event(request.event),
    }
}

fn map_event(event: aquatic_udp_protocol::AnnounceEvent) -> AnnounceEvent {
    match event {
        aquatic_udp_protocol::AnnounceEvent::Started => AnnounceEvent::Started,
        aquatic_udp_protocol::AnnounceEvent::Stopped => AnnounceEvent::Stopped,
        aquatic_udp_protocol::AnnounceEvent::Completed => AnnounceEvent::Completed,
        aquatic_udp_protocol::AnnounceEvent::None => AnnounceEvent::None,
    }
}
