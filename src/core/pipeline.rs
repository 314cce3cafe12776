//! The request pipeline.
//!
//! Every announce runs through the same ordered chain:
//!
//! ```text
//! [pre-hooks...] -> swarm interaction -> response assembly -> [post-hooks...]
//! ```
//!
//! The swarm interaction and the response assembly are installed by the
//! core; pre- and post-hooks come from the configuration. The
//! [`Execution`] envelope travels through the chain and lets a hook turn
//! the core steps into no-ops, e.g. an approval hook that rejects a request
//! but still wants the pre-populated response delivered.
//!
//! A hook returning an error aborts the chain and the error propagates to
//! the frontend, which decides how much of it the client may see.
use std::collections::HashSet;
use std::net::IpAddr;
use std::sync::Arc;

use async_trait::async_trait;
use swarm_tracker_configuration::ResponseConfig;
use swarm_tracker_primitives::announce_event::AnnounceEvent;
use swarm_tracker_primitives::info_hash::InfoHash;
use swarm_tracker_primitives::peer::Peer;
use swarm_tracker_primitives::swarm_metadata::SwarmMetadata;

use crate::core::error::Error;
use crate::core::{storage, AnnounceRequest, AnnounceResponse, ScrapeFile, ScrapeRequest, ScrapeResponse};

/// Flags a hook can set to alter the rest of the chain for one request.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Execution {
    /// When set, the swarm interaction step is a no-op.
    pub skip_swarm_interaction: bool,
    /// When set, the response assembly step is a no-op; the response is
    /// assumed to be pre-populated.
    pub skip_response_assembly: bool,
}

/// Anything that needs to interact with a client's request and response.
///
/// Pre-hooks and post-hooks implement the same interface. Hooks must be
/// reentrant; a hook that keeps state carries its own lock.
#[async_trait]
pub trait Hook: Send + Sync {
    async fn on_announce(
        &self,
        execution: &mut Execution,
        request: &AnnounceRequest,
        response: &mut AnnounceResponse,
    ) -> Result<(), Error>;

    async fn on_scrape(
        &self,
        execution: &mut Execution,
        request: &ScrapeRequest,
        response: &mut ScrapeResponse,
    ) -> Result<(), Error>;
}

/// The assembled pipeline: hooks plus the core steps around the peer store.
pub struct Logic {
    store: Arc<dyn storage::PeerStorage>,
    response_config: ResponseConfig,
    pre_hooks: Vec<Box<dyn Hook>>,
    post_hooks: Vec<Box<dyn Hook>>,
}

impl Logic {
    #[must_use]
    pub fn new(
        store: Arc<dyn storage::PeerStorage>,
        response_config: ResponseConfig,
        pre_hooks: Vec<Box<dyn Hook>>,
        post_hooks: Vec<Box<dyn Hook>>,
    ) -> Self {
        Self {
            store,
            response_config,
            pre_hooks,
            post_hooks,
        }
    }

    /// The peer store the pipeline mutates.
    #[must_use]
    pub fn store(&self) -> &Arc<dyn storage::PeerStorage> {
        &self.store
    }

    /// Runs an announce through the whole chain.
    ///
    /// # Errors
    ///
    /// Will return the first error a hook or the store produces; the
    /// remaining steps do not run.
    pub async fn handle_announce(&self, request: &AnnounceRequest) -> Result<AnnounceResponse, Error> {
        let mut execution = Execution::default();
        let mut response = AnnounceResponse {
            interval: self.response_config.announce_interval,
            min_interval: self.response_config.min_announce_interval,
            ..AnnounceResponse::default()
        };

        for hook in &self.pre_hooks {
            hook.on_announce(&mut execution, request, &mut response).await?;
        }

        if !execution.skip_swarm_interaction {
            self.swarm_interaction(request)?;
        }

        if !execution.skip_response_assembly {
            self.assemble_announce_response(request, &mut response)?;
        }

        for hook in &self.post_hooks {
            hook.on_announce(&mut execution, request, &mut response).await?;
        }

        Ok(response)
    }

    /// Runs a scrape through the whole chain. Scrapes have no effect on the
    /// swarm; only the response assembly and the hooks run.
    ///
    /// # Errors
    ///
    /// Will return the first error a hook produces; the remaining steps do
    /// not run.
    pub async fn handle_scrape(&self, request: &ScrapeRequest) -> Result<ScrapeResponse, Error> {
        let mut execution = Execution::default();
        let mut response = ScrapeResponse::default();

        for hook in &self.pre_hooks {
            hook.on_scrape(&mut execution, request, &mut response).await?;
        }

        if !execution.skip_response_assembly {
            self.assemble_scrape_response(request, &mut response);
        }

        for hook in &self.post_hooks {
            hook.on_scrape(&mut execution, request, &mut response).await?;
        }

        Ok(response)
    }

    /// Applies the announced event to the store. A 32-byte infohash mirrors
    /// every write under its 20-byte truncation, so v1-only clients see the
    /// same swarm.
    fn swarm_interaction(&self, request: &AnnounceRequest) -> Result<(), Error> {
        self.apply_event(request.info_hash, request)?;

        if request.info_hash.is_v2() {
            self.apply_event(request.info_hash.truncate_v1(), request)?;
        }

        Ok(())
    }

    fn apply_event(&self, info_hash: InfoHash, request: &AnnounceRequest) -> Result<(), Error> {
        let peer = request.peer;

        match peer.event {
            AnnounceEvent::Stopped => {
                ignore_missing(self.store.delete_seeder(info_hash, &peer))?;
                ignore_missing(self.store.delete_leecher(info_hash, &peer))?;
            }
            AnnounceEvent::Completed => self.store.graduate_leecher(info_hash, peer)?,
            // A routine announce with nothing left is an "old" seeder, not a
            // graduating leecher.
            _ if peer.is_seeder() => self.store.put_seeder(info_hash, peer)?,
            _ => self.store.put_leecher(info_hash, peer)?,
        }

        Ok(())
    }

    /// Fills the swarm counters and the peer list into the response.
    fn assemble_announce_response(&self, request: &AnnounceRequest, response: &mut AnnounceResponse) -> Result<(), Error> {
        let metadata = self.scrape_merged(request.info_hash);
        response.complete = metadata.complete;
        response.incomplete = metadata.incomplete;

        let seeding = request.peer.is_seeder();
        let max_count = self.peer_budget(request.num_want);

        let store_peers = match self.store.announce_peers(request.info_hash, seeding, max_count, &request.peer) {
            Ok(peers) => peers,
            Err(storage::Error::ResourceDoesNotExist) => vec![],
            Err(source) => return Err(source.into()),
        };

        // Peers a pre-hook already placed in the response come first, the
        // requester's address family leading.
        let mut ordered: Vec<Peer> = Vec::with_capacity(response.ipv4_peers.len() + response.ipv6_peers.len() + store_peers.len());
        match request.peer.ip() {
            IpAddr::V6(_) => {
                ordered.append(&mut response.ipv6_peers);
                ordered.append(&mut response.ipv4_peers);
            }
            IpAddr::V4(_) => {
                ordered.append(&mut response.ipv4_peers);
                ordered.append(&mut response.ipv6_peers);
            }
        }
        ordered.extend(store_peers);

        // Many clients treat an empty peer list as fatal; a lone peer gets
        // its own representation back.
        if ordered.is_empty() {
            if seeding {
                response.complete += 1;
            } else {
                response.incomplete += 1;
            }
            ordered.push(request.peer);
        }

        let mut unique_endpoints = HashSet::with_capacity(ordered.len());
        for peer in ordered {
            if unique_endpoints.len() >= max_count {
                break;
            }
            if unique_endpoints.insert(peer.peer_addr) {
                match peer.ip() {
                    IpAddr::V4(_) => response.ipv4_peers.push(peer),
                    IpAddr::V6(_) => response.ipv6_peers.push(peer),
                }
            }
        }

        Ok(())
    }

    /// Fills one scrape file per requested infohash, preserving the request
    /// order.
    fn assemble_scrape_response(&self, request: &ScrapeRequest, response: &mut ScrapeResponse) {
        for info_hash in &request.info_hashes {
            response.files.push(ScrapeFile {
                info_hash: *info_hash,
                metadata: self.scrape_merged(*info_hash),
            });
        }
    }

    /// Scrapes a swarm; a v2 hash sums the counters of both projections.
    fn scrape_merged(&self, info_hash: InfoHash) -> SwarmMetadata {
        let metadata = self.store.scrape_swarm(info_hash);

        if info_hash.is_v2() {
            metadata.merge(&self.store.scrape_swarm(info_hash.truncate_v1()))
        } else {
            metadata
        }
    }

    fn peer_budget(&self, num_want: Option<u32>) -> usize {
        let wanted = num_want.unwrap_or(self.response_config.default_numwant);
        wanted.min(self.response_config.max_numwant) as usize
    }
}

fn ignore_missing(result: Result<(), storage::Error>) -> Result<(), storage::Error> {
    match result {
        Ok(()) | Err(storage::Error::ResourceDoesNotExist) => Ok(()),
        Err(error) => Err(error),
    }
}

#[cfg(test)]
mod tests {
    use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr};
    use std::sync::Arc;

    use swarm_tracker_configuration::{MemoryStorageConfig, ResponseConfig};
    use swarm_tracker_primitives::announce_event::AnnounceEvent;
    use swarm_tracker_primitives::info_hash::InfoHash;
    use swarm_tracker_primitives::peer::fixture::PeerBuilder;
    use swarm_tracker_primitives::peer::{Id, Peer};

    use super::{Execution, Hook, Logic};
    use crate::core::error::{ClientError, Error};
    use crate::core::storage::memory::MemoryStore;
    use crate::core::storage::PeerStorage;
    use crate::core::{AnnounceRequest, AnnounceResponse, ScrapeRequest, ScrapeResponse};

    fn logic() -> Logic {
        logic_with_hooks(vec![], vec![])
    }

    fn logic_with_hooks(pre_hooks: Vec<Box<dyn Hook>>, post_hooks: Vec<Box<dyn Hook>>) -> Logic {
        let store = Arc::new(MemoryStore::new(&MemoryStorageConfig {
            shard_count: 8,
            ..MemoryStorageConfig::default()
        }));

        Logic::new(store, ResponseConfig::default(), pre_hooks, post_hooks)
    }

    fn sample_info_hash() -> InfoHash {
        InfoHash::from_hex("3b245504cf5f11bbdbe1201cea6a6bf45aee1bc0").unwrap()
    }

    fn sample_v2_info_hash() -> InfoHash {
        InfoHash::from_hex("9c38422213e30bff212b30c360d26f9a02136422b08f4302d49b1f1a1a5aef96").unwrap()
    }

    fn announce(info_hash: InfoHash, peer: Peer) -> AnnounceRequest {
        AnnounceRequest {
            info_hash,
            peer,
            num_want: None,
        }
    }

    fn leecher_at(host: u8) -> Peer {
        PeerBuilder::leecher()
            .with_peer_addr(&SocketAddr::new(IpAddr::V4(Ipv4Addr::new(126, 0, 0, host)), 8080))
            .build()
    }

    #[tokio::test]
    async fn a_lone_peer_should_receive_itself_and_the_bumped_counter() {
        let logic = logic();
        let peer = leecher_at(1);

        let response = logic.handle_announce(&announce(sample_info_hash(), peer)).await.unwrap();

        assert_eq!(response.incomplete, 2); // the stored entry plus the self-representation
        assert_eq!(response.ipv4_peers, vec![peer]);
        assert!(response.ipv6_peers.is_empty());
    }

    #[tokio::test]
    async fn a_peer_should_see_the_other_swarm_members_but_not_itself() {
        let logic = logic();

        let first = leecher_at(1);
        let second = leecher_at(2);

        logic.handle_announce(&announce(sample_info_hash(), first)).await.unwrap();
        let response = logic.handle_announce(&announce(sample_info_hash(), second)).await.unwrap();

        assert_eq!(response.ipv4_peers, vec![first]);
        assert_eq!(response.incomplete, 2);
    }

    #[tokio::test]
    async fn the_lifecycle_of_a_peer_should_be_reflected_in_the_scrape() {
        let logic = logic();
        let info_hash = sample_info_hash();
        let addr = SocketAddr::new(IpAddr::V4(Ipv4Addr::new(126, 0, 0, 1)), 8080);

        // left=100
        let leecher = PeerBuilder::default().with_peer_addr(&addr).with_bytes_left(100).build();
        logic.handle_announce(&announce(info_hash, leecher)).await.unwrap();

        let scrape = logic
            .handle_scrape(&ScrapeRequest {
                info_hashes: vec![info_hash],
            })
            .await
            .unwrap();
        assert_eq!(
            (
                scrape.files[0].metadata.incomplete,
                scrape.files[0].metadata.complete,
                scrape.files[0].metadata.downloaded
            ),
            (1, 0, 0)
        );

        // completed, left=0
        let completed = PeerBuilder::default()
            .with_peer_addr(&addr)
            .with_bytes_left(0)
            .with_event(AnnounceEvent::Completed)
            .build();
        logic.handle_announce(&announce(info_hash, completed)).await.unwrap();

        let scrape = logic
            .handle_scrape(&ScrapeRequest {
                info_hashes: vec![info_hash],
            })
            .await
            .unwrap();
        assert_eq!(
            (
                scrape.files[0].metadata.incomplete,
                scrape.files[0].metadata.complete,
                scrape.files[0].metadata.downloaded
            ),
            (0, 1, 1)
        );

        // stopped
        let stopped = PeerBuilder::default()
            .with_peer_addr(&addr)
            .with_bytes_left(0)
            .with_event(AnnounceEvent::Stopped)
            .build();
        logic.handle_announce(&announce(info_hash, stopped)).await.unwrap();

        let scrape = logic
            .handle_scrape(&ScrapeRequest {
                info_hashes: vec![info_hash],
            })
            .await
            .unwrap();
        assert_eq!(
            (
                scrape.files[0].metadata.incomplete,
                scrape.files[0].metadata.complete,
                scrape.files[0].metadata.downloaded
            ),
            (0, 0, 1)
        );
    }

    #[tokio::test]
    async fn a_stopped_event_for_an_unknown_peer_should_not_fail() {
        let logic = logic();

        let stopped = PeerBuilder::default().with_event(AnnounceEvent::Stopped).build();

        let response = logic.handle_announce(&announce(sample_info_hash(), stopped)).await;

        assert!(response.is_ok());
    }

    #[tokio::test]
    async fn announces_under_a_v2_hash_should_be_mirrored_under_its_truncation() {
        let logic = logic();
        let v2 = sample_v2_info_hash();

        logic.handle_announce(&announce(v2, leecher_at(1))).await.unwrap();

        let truncated = logic
            .handle_scrape(&ScrapeRequest {
                info_hashes: vec![v2.truncate_v1()],
            })
            .await
            .unwrap();

        assert_eq!(truncated.files[0].metadata.incomplete, 1);
    }

    #[tokio::test]
    async fn a_v2_scrape_should_sum_both_projections() {
        let logic = logic();
        let v2 = sample_v2_info_hash();

        // One peer announces under the v2 hash (mirrored), another directly
        // under the truncated v1 hash.
        logic.handle_announce(&announce(v2, leecher_at(1))).await.unwrap();
        logic
            .handle_announce(&announce(v2.truncate_v1(), leecher_at(2)))
            .await
            .unwrap();

        let scrape = logic.handle_scrape(&ScrapeRequest { info_hashes: vec![v2] }).await.unwrap();

        // v2 swarm has one leecher, the v1 projection two.
        assert_eq!(scrape.files[0].metadata.incomplete, 3);
    }

    #[tokio::test]
    async fn scrape_files_should_preserve_the_request_order() {
        let logic = logic();

        let first = sample_info_hash();
        let second = InfoHash::from_hex("ffffffffffffffffffffffffffffffffffffffff").unwrap();

        logic.handle_announce(&announce(second, leecher_at(1))).await.unwrap();

        let scrape = logic
            .handle_scrape(&ScrapeRequest {
                info_hashes: vec![first, second],
            })
            .await
            .unwrap();

        assert_eq!(scrape.files[0].info_hash, first);
        assert_eq!(scrape.files[0].metadata.incomplete, 0);
        assert_eq!(scrape.files[1].info_hash, second);
        assert_eq!(scrape.files[1].metadata.incomplete, 1);
    }

    #[tokio::test]
    async fn the_peer_budget_should_cap_the_client_request() {
        let logic = logic();
        let info_hash = sample_info_hash();

        for host in 1..=20 {
            logic.handle_announce(&announce(info_hash, leecher_at(host))).await.unwrap();
        }

        let requester = leecher_at(100);
        let request = AnnounceRequest {
            info_hash,
            peer: requester,
            num_want: Some(5),
        };

        let response = logic.handle_announce(&request).await.unwrap();

        assert_eq!(response.ipv4_peers.len(), 5);
    }

    #[tokio::test]
    async fn the_requesters_address_family_should_lead_hook_inserted_peers() {
        struct SeedResponseHook;

        #[async_trait::async_trait]
        impl Hook for SeedResponseHook {
            async fn on_announce(
                &self,
                _execution: &mut Execution,
                _request: &AnnounceRequest,
                response: &mut AnnounceResponse,
            ) -> Result<(), Error> {
                response.ipv4_peers.push(
                    PeerBuilder::leecher()
                        .with_peer_addr(&SocketAddr::new(IpAddr::V4(Ipv4Addr::new(10, 0, 0, 1)), 7070))
                        .build(),
                );
                response.ipv6_peers.push(
                    PeerBuilder::leecher()
                        .with_peer_addr(&SocketAddr::new(IpAddr::V6(Ipv6Addr::LOCALHOST), 7070))
                        .build(),
                );
                Ok(())
            }

            async fn on_scrape(
                &self,
                _execution: &mut Execution,
                _request: &ScrapeRequest,
                _response: &mut ScrapeResponse,
            ) -> Result<(), Error> {
                Ok(())
            }
        }

        let logic = logic_with_hooks(vec![Box::new(SeedResponseHook)], vec![]);

        let requester = PeerBuilder::leecher()
            .with_peer_addr(&SocketAddr::new(IpAddr::V6(Ipv6Addr::new(0xfe80, 0, 0, 0, 0, 0, 0, 1)), 8080))
            .build();
        let request = AnnounceRequest {
            info_hash: sample_info_hash(),
            peer: requester,
            num_want: Some(1),
        };

        let response = logic.handle_announce(&request).await.unwrap();

        // With a budget of one, only the requester-family hook peer survives.
        assert_eq!(response.ipv6_peers.len(), 1);
        assert!(response.ipv4_peers.is_empty());
    }

    #[tokio::test]
    async fn a_rejecting_pre_hook_should_abort_the_chain() {
        struct RejectHook;

        #[async_trait::async_trait]
        impl Hook for RejectHook {
            async fn on_announce(
                &self,
                _execution: &mut Execution,
                _request: &AnnounceRequest,
                _response: &mut AnnounceResponse,
            ) -> Result<(), Error> {
                Err(ClientError::TorrentNotApproved.into())
            }

            async fn on_scrape(
                &self,
                _execution: &mut Execution,
                _request: &ScrapeRequest,
                _response: &mut ScrapeResponse,
            ) -> Result<(), Error> {
                Ok(())
            }
        }

        let logic = logic_with_hooks(vec![Box::new(RejectHook)], vec![]);
        let peer = leecher_at(1);

        let error = logic.handle_announce(&announce(sample_info_hash(), peer)).await.unwrap_err();

        assert!(error.is_client_error());
        // The aborted announce never reached the store.
        assert_eq!(logic.store().scrape_swarm(sample_info_hash()).incomplete, 0);
    }

    #[tokio::test]
    async fn a_hook_can_skip_the_swarm_interaction() {
        struct SkipHook;

        #[async_trait::async_trait]
        impl Hook for SkipHook {
            async fn on_announce(
                &self,
                execution: &mut Execution,
                _request: &AnnounceRequest,
                _response: &mut AnnounceResponse,
            ) -> Result<(), Error> {
                execution.skip_swarm_interaction = true;
                Ok(())
            }

            async fn on_scrape(
                &self,
                _execution: &mut Execution,
                _request: &ScrapeRequest,
                _response: &mut ScrapeResponse,
            ) -> Result<(), Error> {
                Ok(())
            }
        }

        let logic = logic_with_hooks(vec![Box::new(SkipHook)], vec![]);
        let peer = leecher_at(1);

        logic.handle_announce(&announce(sample_info_hash(), peer)).await.unwrap();

        assert_eq!(logic.store().scrape_swarm(sample_info_hash()).incomplete, 0);
    }

    #[tokio::test]
    async fn two_announces_with_the_same_endpoint_should_not_duplicate_the_peer() {
        let logic = logic();
        let info_hash = sample_info_hash();
        let addr = SocketAddr::new(IpAddr::V4(Ipv4Addr::new(126, 0, 0, 1)), 8080);

        let original = PeerBuilder::leecher()
            .with_peer_id(&Id(*b"-qB00000000000000001"))
            .with_peer_addr(&addr)
            .build();
        let renamed = PeerBuilder::leecher()
            .with_peer_id(&Id(*b"-qB00000000000000002"))
            .with_peer_addr(&addr)
            .build();

        logic.handle_announce(&announce(info_hash, original)).await.unwrap();
        logic.handle_announce(&announce(info_hash, renamed)).await.unwrap();

        assert_eq!(logic.store().scrape_swarm(info_hash).incomplete, 1);
    }
}
