//! Post-hook spreading client re-announce times.
//!
//! With probability `modify_response_probability`, the announce interval is
//! increased by a uniform number of seconds in `[1, max_increase_delta]`.
//! The randomness is seeded from the infohash and peer ID, so a client that
//! retries quickly sees the same modification instead of a wildly different
//! interval on each attempt, across process restarts included.
use async_trait::async_trait;
use swarm_tracker_configuration::VarintervalOptions;

use crate::core::error::Error;
use crate::core::pipeline::{Execution, Hook};
use crate::core::{AnnounceRequest, AnnounceResponse, ScrapeRequest, ScrapeResponse};

const PROBABILITY_SCALE: u64 = 1 << 24;

pub struct Varinterval {
    options: VarintervalOptions,
}

impl Varinterval {
    /// Builds the hook from its validated options.
    #[must_use]
    pub fn new(options: &VarintervalOptions) -> Self {
        Self {
            options: options.clone(),
        }
    }
}

#[async_trait]
impl Hook for Varinterval {
    async fn on_announce(
        &self,
        _execution: &mut Execution,
        request: &AnnounceRequest,
        response: &mut AnnounceResponse,
    ) -> Result<(), Error> {
        let (s0, s1) = derive_entropy(request);

        let (value, s0, s1) = uniform(s0, s1, PROBABILITY_SCALE);
        #[allow(clippy::cast_precision_loss)]
        let probability = value as f32 / PROBABILITY_SCALE as f32;

        if self.options.modify_response_probability >= 1.0 || probability < self.options.modify_response_probability {
            let (delta, _, _) = uniform(s0, s1, self.options.max_increase_delta);
            #[allow(clippy::cast_possible_truncation)]
            let add = (delta + 1) as u32;

            response.interval = response.interval.saturating_add(add);
            if self.options.modify_min_interval {
                response.min_interval = response.min_interval.saturating_add(add);
            }
        }

        Ok(())
    }

    async fn on_scrape(
        &self,
        _execution: &mut Execution,
        _request: &ScrapeRequest,
        _response: &mut ScrapeResponse,
    ) -> Result<(), Error> {
        // Scrapes are not altered.
        Ok(())
    }
}

/// Generates 2x64 bits of pseudo random state from an announce request.
///
/// Calling it multiple times for the same request yields the same values.
fn derive_entropy(request: &AnnounceRequest) -> (u64, u64) {
    let hash_bytes = request.info_hash.bytes();
    let id_bytes = request.peer.peer_id.0;

    let v0 = word(&hash_bytes[..8]).wrapping_add(word(&hash_bytes[8..16]));
    let v1 = word(&id_bytes[..8]).wrapping_add(word(&id_bytes[8..16]));

    (v0, v1)
}

fn word(bytes: &[u8]) -> u64 {
    u64::from_be_bytes(bytes.try_into().expect("an eight byte slice converts to a word"))
}

/// One xorshift128+ step reduced modulo `n`.
fn uniform(s0: u64, s1: u64, n: u64) -> (u64, u64, u64) {
    let (value, s0, s1) = next(s0, s1);
    (value % n, s0, s1)
}

fn next(s0: u64, s1: u64) -> (u64, u64, u64) {
    let mut x = s0;
    let y = s1;
    let result = x.wrapping_add(y);
    x ^= x << 23;
    let new_s1 = x ^ y ^ (x >> 17) ^ (y >> 26);
    (result, y, new_s1)
}

#[cfg(test)]
mod tests {
    use swarm_tracker_configuration::VarintervalOptions;
    use swarm_tracker_primitives::info_hash::InfoHash;
    use swarm_tracker_primitives::peer::fixture::PeerBuilder;
    use swarm_tracker_primitives::peer::Id;

    use super::Varinterval;
    use crate::core::pipeline::{Execution, Hook};
    use crate::core::{AnnounceRequest, AnnounceResponse};

    fn request(peer_id: &[u8; 20]) -> AnnounceRequest {
        AnnounceRequest {
            info_hash: InfoHash::from_hex("3b245504cf5f11bbdbe1201cea6a6bf45aee1bc0").unwrap(),
            peer: PeerBuilder::leecher().with_peer_id(&Id(*peer_id)).build(),
            num_want: None,
        }
    }

    async fn modified_intervals(hook: &Varinterval, request: &AnnounceRequest) -> (u32, u32) {
        let mut response = AnnounceResponse {
            interval: 1800,
            min_interval: 900,
            ..AnnounceResponse::default()
        };

        hook.on_announce(&mut Execution::default(), request, &mut response)
            .await
            .unwrap();

        (response.interval, response.min_interval)
    }

    #[tokio::test]
    async fn with_probability_one_it_should_always_increase_the_interval() {
        let hook = Varinterval::new(&VarintervalOptions {
            modify_response_probability: 1.0,
            max_increase_delta: 60,
            modify_min_interval: false,
        });

        let (interval, min_interval) = modified_intervals(&hook, &request(b"-qB00000000000000001")).await;

        assert!(interval > 1800);
        assert!(interval <= 1860);
        assert_eq!(min_interval, 900);
    }

    #[tokio::test]
    async fn it_should_optionally_increase_the_min_interval_by_the_same_delta() {
        let hook = Varinterval::new(&VarintervalOptions {
            modify_response_probability: 1.0,
            max_increase_delta: 60,
            modify_min_interval: true,
        });

        let (interval, min_interval) = modified_intervals(&hook, &request(b"-qB00000000000000001")).await;

        assert_eq!(interval - 1800, min_interval - 900);
    }

    #[tokio::test]
    async fn the_same_request_should_always_get_the_same_modification() {
        let hook = Varinterval::new(&VarintervalOptions {
            modify_response_probability: 1.0,
            max_increase_delta: 60,
            modify_min_interval: true,
        });

        let request = request(b"-qB00000000000000001");

        let first = modified_intervals(&hook, &request).await;
        let second = modified_intervals(&hook, &request).await;

        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn different_peers_should_get_independent_modifications() {
        let hook = Varinterval::new(&VarintervalOptions {
            modify_response_probability: 1.0,
            max_increase_delta: u64::from(u32::MAX),
            modify_min_interval: false,
        });

        let (one, _) = modified_intervals(&hook, &request(b"-qB00000000000000001")).await;
        let (other, _) = modified_intervals(&hook, &request(b"-TR4040-k8d9f0e2b1c3")).await;

        assert_ne!(one, other);
    }
}
