//! The UDP tracker frontend (BEP-15).
//!
//! The protocol is a four-message state machine per client:
//!
//! # Connect
//!
//! Before announcing, a client connects by sending the protocol magic and a
//! transaction ID. The server answers with a `connection_id`: a 64-bit
//! cookie derived from the client IP and the current minute bucket, which
//! binds subsequent requests to a verified source address without any
//! server-side state (see [`connection_cookie`]).
//!
//! # Announce
//!
//! The client echoes the `connection_id`; the server verifies it against
//! the current and the previous minute bucket, feeds the request through
//! the pipeline and answers with a fixed header plus a compact peer list
//! (4+2 bytes per IPv4 peer, 16+2 per IPv6).
//!
//! # Scrape
//!
//! Up to [`MAX_SCRAPE_TORRENTS`] infohashes per request; 12 bytes of
//! counters per hash in the response, in request order.
//!
//! # Error
//!
//! Server-to-client only: action 3, the echoed transaction ID and a UTF-8
//! reason. Sent for invalid connection IDs and pipeline failures; malformed
//! packets are dropped without an answer.
//!
//! All multi-byte integers on the wire are big-endian. The transaction ID
//! is never interpreted, only echoed bit for bit.
use std::net::SocketAddr;

pub mod connection_cookie;
pub mod error;
pub mod handlers;
pub mod peer_builder;
pub mod request;
pub mod server;

/// Maximum number of torrents in a scrape request (BEP-15).
pub const MAX_SCRAPE_TORRENTS: u8 = 74;

/// Largest datagram the server reads or writes.
pub const MAX_PACKET_SIZE: usize = 1496;

/// A datagram as received from the socket.
#[derive(Debug, Clone)]
pub struct UdpRequest {
    pub payload: Vec<u8>,
    pub from: SocketAddr,
}
