//! Peer types used by the tracker core.
//!
//! A peer is identified *inside a swarm* by its endpoint (IP address and
//! port). The peer ID is opaque: the tracker never interprets it except for
//! equality and the optional client-approval prefix matching.
use std::net::{IpAddr, SocketAddr};
use std::panic::Location;

use serde::Serialize;
use thiserror::Error;

use crate::announce_event::AnnounceEvent;
use crate::DurationSinceUnixEpoch;

/// Number of bytes of a peer id.
pub const PEER_ID_BYTES_LEN: usize = 20;

/// The number of bytes `downloaded`, `uploaded` or `left` reported by a peer.
pub type NumberOfBytes = i64;

/// A 20-byte opaque client identifier.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Id(pub [u8; PEER_ID_BYTES_LEN]);

impl Id {
    /// Returns the raw bytes of the peer id.
    #[must_use]
    pub fn bytes(&self) -> [u8; PEER_ID_BYTES_LEN] {
        self.0
    }

    /// Returns the peer id as a hex string, e.g.
    /// `2d71423030303030303030303030303030303030` for `-qB00000000000000000`.
    #[must_use]
    pub fn to_hex_string(&self) -> String {
        let mut tmp = [0u8; PEER_ID_BYTES_LEN * 2];
        binascii::bin2hex(&self.0, &mut tmp).expect("output buffer has the exact size");
        std::str::from_utf8(&tmp).expect("hex digits are valid UTF-8").to_owned()
    }
}

impl std::fmt::Display for Id {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_hex_string())
    }
}

impl From<[u8; PEER_ID_BYTES_LEN]> for Id {
    fn from(bytes: [u8; PEER_ID_BYTES_LEN]) -> Self {
        Self(bytes)
    }
}

/// Error returned when building a peer [`Id`] from an input that does not
/// contain exactly 20 bytes.
#[derive(Error, Debug, Clone)]
#[error("invalid peer id length {len}, expected {PEER_ID_BYTES_LEN} bytes in {location}")]
pub struct IdConversionError {
    pub location: &'static Location<'static>,
    pub len: usize,
}

impl TryFrom<Vec<u8>> for Id {
    type Error = IdConversionError;

    fn try_from(bytes: Vec<u8>) -> Result<Self, Self::Error> {
        let len = bytes.len();
        let data: [u8; PEER_ID_BYTES_LEN] = bytes.try_into().map_err(|_| IdConversionError {
            location: Location::caller(),
            len,
        })?;
        Ok(Self(data))
    }
}

impl Serialize for Id {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex_string())
    }
}

/// The stored state of a peer in a swarm.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
pub struct Peer {
    /// ID reported by the client.
    pub peer_id: Id,
    /// The IP and port the peer is listening on.
    pub peer_addr: SocketAddr,
    /// Last time the tracker received an announce from this endpoint.
    pub updated: DurationSinceUnixEpoch,
    /// Total bytes uploaded reported by the peer.
    pub uploaded: NumberOfBytes,
    /// Total bytes downloaded reported by the peer.
    pub downloaded: NumberOfBytes,
    /// Bytes the peer still has to download.
    pub left: NumberOfBytes,
    /// The last event the peer announced.
    pub event: AnnounceEvent,
}

impl Peer {
    /// A peer with nothing left to download is a seeder.
    #[must_use]
    pub fn is_seeder(&self) -> bool {
        self.left <= 0
    }

    /// Whether two peers share the same endpoint (IP address and port).
    ///
    /// This is the identity used inside a swarm: a re-announce from the same
    /// endpoint with a new peer ID updates the existing entry.
    #[must_use]
    pub fn endpoint_equals(&self, other: &Peer) -> bool {
        self.peer_addr == other.peer_addr
    }

    #[must_use]
    pub fn ip(&self) -> IpAddr {
        self.peer_addr.ip()
    }

    pub fn change_ip(&mut self, new_ip: &IpAddr) {
        self.peer_addr = SocketAddr::new(*new_ip, self.peer_addr.port());
    }
}

impl std::fmt::Display for Peer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}@{}", self.peer_id, self.peer_addr)
    }
}

pub mod fixture {
    use std::net::{IpAddr, Ipv4Addr, SocketAddr};

    use super::{Id, Peer};
    use crate::announce_event::AnnounceEvent;
    use crate::DurationSinceUnixEpoch;

    #[derive(Debug)]
    pub struct PeerBuilder {
        peer: Peer,
    }

    impl Default for PeerBuilder {
        fn default() -> Self {
            Self {
                peer: Peer {
                    peer_id: Id(*b"-qB00000000000000000"),
                    peer_addr: SocketAddr::new(IpAddr::V4(Ipv4Addr::new(127, 0, 0, 1)), 8080),
                    updated: DurationSinceUnixEpoch::default(),
                    uploaded: 0,
                    downloaded: 0,
                    left: 0,
                    event: AnnounceEvent::Started,
                },
            }
        }
    }

    impl PeerBuilder {
        #[must_use]
        pub fn seeder() -> Self {
            Self::default().with_bytes_left(0)
        }

        #[must_use]
        pub fn leecher() -> Self {
            Self::default().with_bytes_left(1000)
        }

        #[must_use]
        pub fn with_peer_id(mut self, peer_id: &Id) -> Self {
            self.peer.peer_id = *peer_id;
            self
        }

        #[must_use]
        pub fn with_peer_addr(mut self, peer_addr: &SocketAddr) -> Self {
            self.peer.peer_addr = *peer_addr;
            self
        }

        #[must_use]
        pub fn with_bytes_left(mut self, left: i64) -> Self {
            self.peer.left = left;
            self
        }

        #[must_use]
        pub fn with_event(mut self, event: AnnounceEvent) -> Self {
            self.peer.event = event;
            self
        }

        #[must_use]
        pub fn updated_at(mut self, updated: DurationSinceUnixEpoch) -> Self {
            self.peer.updated = updated;
            self
        }

        #[must_use]
        pub fn build(self) -> Peer {
            self.peer
        }
    }
}
