//! `Scrape` request for the HTTP tracker.
use std::panic::Location;

use swarm_tracker_primitives::info_hash::InfoHash;
use thiserror::Error;

use crate::servers::http::percent_encoding::percent_decode_info_hash;
use crate::servers::http::query::Query;

const INFO_HASH: &str = "info_hash";

/// The parsed `scrape` query parameters: one or more infohashes, in request
/// order.
#[derive(Debug, PartialEq, Eq)]
pub struct Scrape {
    pub info_hashes: Vec<InfoHash>,
}

/// Errors that can occur when parsing the `scrape` request.
#[derive(Error, Debug)]
pub enum ParseScrapeQueryError {
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

impl TryFrom<&Query> for Scrape {
    type Error = ParseScrapeQueryError;

    fn try_from(query: &Query) -> Result<Self, Self::Error> {
        let raw_params = query.get_param_vec(INFO_HASH).ok_or(ParseScrapeQueryError::MissingParam {
            location: Location::caller(),
            param_name: INFO_HASH.to_owned(),
        })?;

        let mut info_hashes = Vec::with_capacity(raw_params.len());
        for raw_param in raw_params {
            info_hashes.push(percent_decode_info_hash(&raw_param).map_err(|_| {
                ParseScrapeQueryError::InvalidParam {
                    param_name: INFO_HASH.to_owned(),
                    param_value: raw_param.clone(),
                    location: Location::caller(),
                }
            })?);
        }

        Ok(Self { info_hashes })
    }
}
