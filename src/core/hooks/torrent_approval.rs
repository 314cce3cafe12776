//! Pre-hook restricting announces to an infohash list.
//!
//! With `invert: false` the list is a whitelist: only listed torrents may be
//! announced. With `invert: true` it is a blacklist. Both projections of a
//! hybrid torrent are checked, so listing either form is enough.
use std::collections::HashSet;

use async_trait::async_trait;
use swarm_tracker_configuration::TorrentApprovalOptions;
use swarm_tracker_primitives::info_hash::InfoHash;

use super::BuildError;
use crate::core::error::{ClientError, Error};
use crate::core::pipeline::{Execution, Hook};
use crate::core::{AnnounceRequest, AnnounceResponse, ScrapeRequest, ScrapeResponse};

pub struct TorrentApproval {
    hashes: HashSet<InfoHash>,
    invert: bool,
}

impl TorrentApproval {
    /// Builds the hook, parsing the configured hex hash list.
    ///
    /// # Errors
    ///
    /// Will return a [`BuildError`] if an entry is not a valid hex infohash.
    pub fn new(options: &TorrentApprovalOptions) -> Result<Self, BuildError> {
        let mut hashes = HashSet::with_capacity(options.hash_list.len());

        for value in &options.hash_list {
            let info_hash = InfoHash::from_hex(value).map_err(|_| BuildError::InvalidApprovalHash {
                value: value.clone(),
            })?;
            hashes.insert(info_hash);
        }

        Ok(Self {
            hashes,
            invert: options.invert,
        })
    }

    fn approves(&self, info_hash: &InfoHash) -> bool {
        let listed = self.hashes.contains(info_hash) || self.hashes.contains(&info_hash.truncate_v1());
        listed != self.invert
    }
}

#[async_trait]
impl Hook for TorrentApproval {
    async fn on_announce(
        &self,
        _execution: &mut Execution,
        request: &AnnounceRequest,
        _response: &mut AnnounceResponse,
    ) -> Result<(), Error> {
        if self.approves(&request.info_hash) {
            Ok(())
        } else {
            Err(ClientError::TorrentNotApproved.into())
        }
    }

    async fn on_scrape(
        &self,
        _execution: &mut Execution,
        _request: &ScrapeRequest,
        _response: &mut ScrapeResponse,
    ) -> Result<(), Error> {
        // Scrapes only reveal counters; they are not filtered.
        Ok(())
    }
}
