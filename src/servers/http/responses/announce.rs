//! `Announce` response for the HTTP tracker.
//!
//! Two encodings of the peer list coexist:
//!
//! - [`Compact`]: packed byte strings per BEP-23 (`peers`) and BEP-7
//!   (`peers6`).
//! - [`NonCompact`]: the original BEP-3 list of peer dictionaries.
use std::net::IpAddr;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use bip_bencode::{ben_bytes, ben_int, ben_list, ben_map, BMutAccess};
use swarm_tracker_primitives::peer::Peer;

use crate::core::AnnounceResponse;

/// Non-compact `announce` response: `peers` is a list of
/// `{ip, peer id, port}` dictionaries.
#[derive(Debug, PartialEq)]
pub struct NonCompact {
    pub response: AnnounceResponse,
}

/// Compact `announce` response: `peers` is a byte string of 6-byte IPv4
/// tuples and `peers6` one of 18-byte IPv6 tuples, both big-endian.
#[derive(Debug, PartialEq)]
pub struct Compact {
    pub response: AnnounceResponse,
}

impl NonCompact {
    /// Returns the bencoded body of the non-compact response.
    ///
    /// # Panics
    ///
    /// Panics if the peer list cannot be accessed as a mutable bencode list.
    #[must_use]
    pub fn body(&self) -> Vec<u8> {
        let mut peers_list = ben_list!();
        let peers_list_mut = peers_list.list_mut().unwrap();
        for peer in self.response.ipv4_peers.iter().chain(self.response.ipv6_peers.iter()) {
            peers_list_mut.push(peer_map(peer));
        }

        (ben_map! {
            "complete" => ben_int!(i64::from(self.response.complete)),
            "incomplete" => ben_int!(i64::from(self.response.incomplete)),
            "interval" => ben_int!(i64::from(self.response.interval)),
            "min interval" => ben_int!(i64::from(self.response.min_interval)),
            "peers" => peers_list
        })
        .encode()
    }
}

fn peer_map(peer: &Peer) -> bip_bencode::BencodeMut<'_> {
    ben_map! {
        "ip" => ben_bytes!(peer.peer_addr.ip().to_string()),
        "peer id" => ben_bytes!(peer.peer_id.0.to_vec()),
        "port" => ben_int!(i64::from(peer.peer_addr.port()))
    }
}

impl Compact {
    /// Returns the bencoded body of the compact response.
    #[must_use]
    pub fn body(&self) -> Vec<u8> {
        (ben_map! {
            "complete" => ben_int!(i64::from(self.response.complete)),
            "incomplete" => ben_int!(i64::from(self.response.incomplete)),
            "interval" => ben_int!(i64::from(self.response.interval)),
            "min interval" => ben_int!(i64::from(self.response.min_interval)),
            "peers" => ben_bytes!(compact_peers_v4(&self.response.ipv4_peers)),
            "peers6" => ben_bytes!(compact_peers_v6(&self.response.ipv6_peers))
        })
        .encode()
    }
}

fn compact_peers_v4(peers: &[Peer]) -> Vec<u8> {
    let mut bytes: Vec<u8> = Vec::with_capacity(peers.len() * 6);
    for peer in peers {
        if let IpAddr::V4(ip) = peer.peer_addr.ip() {
            bytes.extend_from_slice(&u32::from(ip).to_be_bytes());
            bytes.extend_from_slice(&peer.peer_addr.port().to_be_bytes());
        }
    }
    bytes
}

fn compact_peers_v6(peers: &[Peer]) -> Vec<u8> {
    let mut bytes: Vec<u8> = Vec::with_capacity(peers.len() * 18);
    for peer in peers {
        if let IpAddr::V6(ip) = peer.peer_addr.ip() {
            bytes.extend_from_slice(&u128::from(ip).to_be_bytes());
            bytes.extend_from_slice(&peer.peer_addr.port().to_be_bytes());
        }
    }
    bytes
}

impl IntoResponse for NonCompact {
    fn into_response(self) -> Response {
        (StatusCode::OK, self.body()).into_response()
    }
}

impl IntoResponse for Compact {
    fn into_response(self) -> Response {
        (StatusCode::OK, self.body()).into_response()
    }
}

#[cfg(test)]
mod tests {
    use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr};

    use swarm_tracker_primitives::peer::fixture::PeerBuilder;
    use swarm_tracker_primitives::peer::Id;

    use super::{Compact, NonCompact};
    use crate::core::AnnounceResponse;

    // IP addresses and port numbers are chosen so that their bencoded
    // representation is also a valid string, which makes asserts readable:
    //
    //   0x69 = 'i', 0x70 = 'p'
    fn sample_response() -> AnnounceResponse {
        AnnounceResponse {
            interval: 111,
            min_interval: 222,
            complete: 333,
            incomplete: 444,
            ipv4_peers: vec![PeerBuilder::default()
                .with_peer_id(&Id(*b"-qB00000000000000001"))
                .with_peer_addr(&SocketAddr::new(IpAddr::V4(Ipv4Addr::new(0x69, 0x69, 0x69, 0x69)), 0x7070))
                .build()],
            ipv6_peers: vec![PeerBuilder::default()
                .with_peer_id(&Id(*b"-qB00000000000000002"))
                .with_peer_addr(&SocketAddr::new(
                    IpAddr::V6(Ipv6Addr::new(0x6969, 0x6969, 0x6969, 0x6969, 0x6969, 0x6969, 0x6969, 0x6969)),
                    0x7070,
                ))
                .build()],
        }
    }

    #[test]
    fn a_non_compact_response_should_be_bencoded_as_a_peer_dictionary_list() {
        let response = NonCompact {
            response: sample_response(),
        };

        let expected = "d8:completei333e10:incompletei444e8:intervali111e12:min intervali222e5:peersld2:ip15:105.105.105.1057:peer id20:-qB000000000000000014:porti28784eed2:ip39:6969:6969:6969:6969:6969:6969:6969:69697:peer id20:-qB000000000000000024:porti28784eeee";

        assert_eq!(String::from_utf8(response.body()).unwrap(), expected);
    }

    #[test]
    fn a_compact_response_should_pack_the_peers_into_byte_strings() {
        let response = Compact {
            response: sample_response(),
        };

        let expected = "d8:completei333e10:incompletei444e8:intervali111e12:min intervali222e5:peers6:iiiipp6:peers618:iiiiiiiiiiiiiiiippe";

        assert_eq!(String::from_utf8(response.body()).unwrap(), expected);
    }

    #[test]
    fn a_bencoded_response_should_round_trip_through_a_decoder() {
        use serde_bencode::value::Value;

        let response = Compact {
            response: sample_response(),
        };

        let value: Value = serde_bencode::from_bytes(&response.body()).unwrap();

        let Value::Dict(dict) = value else {
            panic!("expected a bencoded dictionary");
        };
        assert_eq!(dict.get(b"interval".as_slice()), Some(&Value::Int(111)));
        assert_eq!(dict.get(b"min interval".as_slice()), Some(&Value::Int(222)));
        assert_eq!(dict.get(b"complete".as_slice()), Some(&Value::Int(333)));
        assert_eq!(dict.get(b"incomplete".as_slice()), Some(&Value::Int(444)));

        let Some(Value::Bytes(peers)) = dict.get(b"peers".as_slice()) else {
            panic!("expected a compact peers byte string");
        };
        assert_eq!(peers.len(), 6);

        let Some(Value::Bytes(peers6)) = dict.get(b"peers6".as_slice()) else {
            panic!("expected a compact peers6 byte string");
        };
        assert_eq!(peers6.len(), 18);
    }

    #[test]
    fn a_compact_response_with_no_peers_should_still_carry_both_keys() {
        let response = Compact {
            response: AnnounceResponse {
                interval: 1,
                min_interval: 1,
                complete: 0,
                incomplete: 0,
                ipv4_peers: vec![],
                ipv6_peers: vec![],
            },
        };

        let expected = "d8:completei0e10:incompletei0e8:intervali1e12:min intervali1e5:peers0:6:peers60:e";

        assert_eq!(String::from_utf8(response.body()).unwrap(), expected);
    }
}
