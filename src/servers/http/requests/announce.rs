//! `Announce` request for the HTTP tracker.
use std::panic::Location;
use std::str::FromStr;

use swarm_tracker_primitives::announce_event::AnnounceEvent;
use swarm_tracker_primitives::info_hash::InfoHash;
use swarm_tracker_primitives::peer;
use thiserror::Error;

use crate::servers::http::percent_encoding::{percent_decode_info_hash, percent_decode_peer_id};
use crate::servers::http::query::Query;

/// The number of bytes `downloaded`, `uploaded` or `left`.
pub type NumberOfBytes = i64;

// Query param names
const INFO_HASH: &str = "info_hash";
const PEER_ID: &str = "peer_id";
const PORT: &str = "port";
const DOWNLOADED: &str = "downloaded";
const UPLOADED: &str = "uploaded";
const LEFT: &str = "left";
const EVENT: &str = "event";
const COMPACT: &str = "compact";
const NUMWANT: &str = "numwant";

/// The parsed `announce` query parameters.
///
/// Only `info_hash`, `peer_id` and `port` are mandatory; the tracker has
/// defaults for everything else. The peer IP is not a parameter: it is
/// resolved from the request itself.
#[derive(Debug, PartialEq)]
pub struct Announce {
    pub info_hash: InfoHash,
    pub peer_id: peer::Id,
    pub port: u16,
    pub downloaded: Option<NumberOfBytes>,
    pub uploaded: Option<NumberOfBytes>,
    pub left: Option<NumberOfBytes>,
    pub event: AnnounceEvent,
    /// Whether the client accepts a compact peer list. Defaults to compact.
    pub compact: bool,
    pub numwant: Option<u32>,
}

/// Errors that can occur when parsing the `announce` request.
#[derive(Error, Debug)]
pub enum ParseAnnounceQueryError {
    #[error("missing param {param_name} in {location}")]
    MissingParam {
        location: &'static Location<'static>,
        param_name: String,
    },
    #[error("invalid param value {param_value} for {param_name} in {location}")]
    InvalidParam {
        param_name: String,
        param_value: String,
        location: &'static Location<'static>,
    },
}

impl TryFrom<&Query> for Announce {
    type Error = ParseAnnounceQueryError;

    fn try_from(query: &Query) -> Result<Self, Self::Error> {
        Ok(Self {
            info_hash: extract_info_hash(query)?,
            peer_id: extract_peer_id(query)?,
            port: extract_port(query)?,
            downloaded: extract_number_of_bytes(DOWNLOADED, query)?,
            uploaded: extract_number_of_bytes(UPLOADED, query)?,
            left: extract_number_of_bytes(LEFT, query)?,
            event: extract_event(query)?,
            compact: extract_compact(query)?,
            numwant: extract_numwant(query)?,
        })
    }
}

fn extract_info_hash(query: &Query) -> Result<InfoHash, ParseAnnounceQueryError> {
    match query.get_param(INFO_HASH) {
        Some(raw_param) => percent_decode_info_hash(&raw_param).map_err(|_| ParseAnnounceQueryError::InvalidParam {
            param_name: INFO_HASH.to_owned(),
            param_value: raw_param.clone(),
            location: Location::caller(),
        }),
        None => Err(ParseAnnounceQueryError::MissingParam {
            location: Location::caller(),
            param_name: INFO_HASH.to_owned(),
        }),
    }
}

fn extract_peer_id(query: &Query) -> Result<peer::Id, ParseAnnounceQueryError> {
    match query.get_param(PEER_ID) {
        Some(raw_param) => percent_decode_peer_id(&raw_param).map_err(|_| ParseAnnounceQueryError::InvalidParam {
            param_name: PEER_ID.to_owned(),
            param_value: raw_param.clone(),
            location: Location::caller(),
        }),
        None => Err(ParseAnnounceQueryError::MissingParam {
            location: Location::caller(),
            param_name: PEER_ID.to_owned(),
        }),
    }
}

fn extract_port(query: &Query) -> Result<u16, ParseAnnounceQueryError> {
    match query.get_param(PORT) {
        Some(raw_param) => u16::from_str(&raw_param).map_err(|_| ParseAnnounceQueryError::InvalidParam {
            param_name: PORT.to_owned(),
            param_value: raw_param.clone(),
            location: Location::caller(),
        }),
        None => Err(ParseAnnounceQueryError::MissingParam {
            location: Location::caller(),
            param_name: PORT.to_owned(),
        }),
    }
}

fn extract_number_of_bytes(param_name: &str, query: &Query) -> Result<Option<NumberOfBytes>, ParseAnnounceQueryError> {
    match query.get_param(param_name) {
        Some(raw_param) => {
            let number = u64::from_str(&raw_param)
                .ok()
                .and_then(|number| i64::try_from(number).ok())
                .ok_or_else(|| ParseAnnounceQueryError::InvalidParam {
                    param_name: param_name.to_owned(),
                    param_value: raw_param.clone(),
                    location: Location::caller(),
                })?;
            Ok(Some(number))
        }
        None => Ok(None),
    }
}

fn extract_event(query: &Query) -> Result<AnnounceEvent, ParseAnnounceQueryError> {
    let raw_param = query.get_param(EVENT);

    AnnounceEvent::from_optional_str(raw_param.as_deref()).ok_or_else(|| ParseAnnounceQueryError::InvalidParam {
        param_name: EVENT.to_owned(),
        param_value: raw_param.unwrap_or_default(),
        location: Location::caller(),
    })
}

fn extract_compact(query: &Query) -> Result<bool, ParseAnnounceQueryError> {
    match query.get_param(COMPACT).as_deref() {
        // Most modern clients expect compact responses unconditionally; the
        // dictionary format is only used when explicitly requested.
        None | Some("1") => Ok(true),
        Some("0") => Ok(false),
        Some(other) => Err(ParseAnnounceQueryError::InvalidParam {
            param_name: COMPACT.to_owned(),
            param_value: other.to_owned(),
            location: Location::caller(),
        }),
    }
}

fn extract_numwant(query: &Query) -> Result<Option<u32>, ParseAnnounceQueryError> {
    match query.get_param(NUMWANT) {
        Some(raw_param) => {
            let numwant = u32::from_str(&raw_param).map_err(|_| ParseAnnounceQueryError::InvalidParam {
                param_name: NUMWANT.to_owned(),
                param_value: raw_param.clone(),
                location: Location::caller(),
            })?;
            Ok(Some(numwant))
        }
        None => Ok(None),
    }
}
