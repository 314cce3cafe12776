//! Percent decoding for infohashes and peer IDs.
//!
//! Both carry binary data (20 or 32 bytes for infohashes, 20 bytes for peer
//! IDs) that may not be valid UTF-8, so they cannot go through a regular
//! string decoder; the raw decoded bytes feed the fixed-width constructors
//! directly.
use swarm_tracker_primitives::info_hash::{self, InfoHash};
use swarm_tracker_primitives::peer;

/// Percent decodes an infohash, accepting both the 20-byte v1 and the
/// 32-byte v2 form.
///
/// For example, the infohash `3b245504cf5f11bbdbe1201cea6a6bf45aee1bc0` is
/// transported as `%3B%24U%04%CF%5F%11%BB%DB%E1%20%1C%EAjk%F4Z%EE%1B%C0`.
///
/// # Errors
///
/// Will return an error if the decoded bytes are not a valid [`InfoHash`].
pub fn percent_decode_info_hash(raw_info_hash: &str) -> Result<InfoHash, info_hash::ConversionError> {
    let bytes = percent_encoding::percent_decode_str(raw_info_hash).collect::<Vec<u8>>();
    InfoHash::try_from(bytes)
}

/// Percent decodes a peer ID.
///
/// # Errors
///
/// Will return an error if the decoded bytes are not a valid
/// [`peer::Id`].
pub fn percent_decode_peer_id(raw_peer_id: &str) -> Result<peer::Id, peer::IdConversionError> {
    let bytes = percent_encoding::percent_decode_str(raw_peer_id).collect::<Vec<u8>>();
    peer::Id::try_from(bytes)
}
