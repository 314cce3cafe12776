//! Pre-hook filtering announces by the client implementation.
//!
//! Most clients embed their implementation and version in the first six
//! bytes of the peer ID (the Azureus convention, e.g. `-qB45A` for
//! qBittorrent 4.5.x). The hook compares that prefix against an allow or a
//! deny list; a rejected announce is answered with a failure reason and
//! never reaches the swarm.
use std::collections::HashSet;

use async_trait::async_trait;
use swarm_tracker_configuration::ClientApprovalOptions;

use crate::core::error::{ClientError, Error};
use crate::core::pipeline::{Execution, Hook};
use crate::core::{AnnounceRequest, AnnounceResponse, ScrapeRequest, ScrapeResponse};

const CLIENT_ID_LEN: usize = 6;

pub struct ClientApproval {
    allowed: HashSet<[u8; CLIENT_ID_LEN]>,
    denied: HashSet<[u8; CLIENT_ID_LEN]>,
}

impl ClientApproval {
    /// Builds the hook from its validated options.
    #[must_use]
    pub fn new(options: &ClientApprovalOptions) -> Self {
        Self {
            allowed: options.allowed_client_ids.iter().map(|id| client_id(id)).collect(),
            denied: options.denied_client_ids.iter().map(|id| client_id(id)).collect(),
        }
    }

    fn approves(&self, peer_id_prefix: &[u8; CLIENT_ID_LEN]) -> bool {
        if !self.allowed.is_empty() {
            return self.allowed.contains(peer_id_prefix);
        }
        !self.denied.contains(peer_id_prefix)
    }
}

fn client_id(id: &str) -> [u8; CLIENT_ID_LEN] {
    id.as_bytes().try_into().expect("client ids are validated to be 6 bytes")
}

#[async_trait]
impl Hook for ClientApproval {
    async fn on_announce(
        &self,
        _execution: &mut Execution,
        request: &AnnounceRequest,
        _response: &mut AnnounceResponse,
    ) -> Result<(), Error> {
        let prefix: [u8; CLIENT_ID_LEN] = request.peer.peer_id.0[..CLIENT_ID_LEN]
            .try_into()
            .expect("a peer id always has at least 6 bytes");

        if self.approves(&prefix) {
            Ok(())
        } else {
            Err(ClientError::ClientNotApproved.into())
        }
    }

    async fn on_scrape(
        &self,
        _execution: &mut Execution,
        _request: &ScrapeRequest,
        _response: &mut ScrapeResponse,
    ) -> Result<(), Error> {
        // Scrapes carry no peer ID.
        Ok(())
    }
}
