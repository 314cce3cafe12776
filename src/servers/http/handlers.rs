//! Handlers for the `/announce` and `/scrape` endpoints.
use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::{ConnectInfo, RawQuery, State};
use axum::http::HeaderMap;
use axum::response::{IntoResponse, Response};
use swarm_tracker_clock::clock::Time;
use swarm_tracker_primitives::peer::Peer;
use tracing::{debug, warn};

use super::requests::{announce, scrape};
use super::{peer_ip, query, responses};
use crate::core;
use crate::core::pipeline::Logic;
use crate::core::statistics;
use crate::CurrentClock;

/// Everything the HTTP handlers need to serve a request.
pub struct HttpService {
    pub logic: Arc<Logic>,
    pub on_reverse_proxy: bool,
    pub stats_event_sender: Option<Arc<dyn statistics::EventSender>>,
}

impl HttpService {
    async fn send_stats_event(&self, event: statistics::Event) {
        if let Some(sender) = &self.stats_event_sender {
            sender.send_event(event).await;
        }
    }
}

/// The axum handler for `/announce`.
pub async fn handle_announce(
    State(service): State<Arc<HttpService>>,
    ConnectInfo(remote_addr): ConnectInfo<SocketAddr>,
    RawQuery(raw_query): RawQuery,
    headers: HeaderMap,
) -> Response {
    announce_response(&service, remote_addr, &headers, raw_query.as_deref().unwrap_or_default()).await
}

/// The axum handler for `/scrape`.
pub async fn handle_scrape(
    State(service): State<Arc<HttpService>>,
    ConnectInfo(remote_addr): ConnectInfo<SocketAddr>,
    RawQuery(raw_query): RawQuery,
    headers: HeaderMap,
) -> Response {
    scrape_response(&service, remote_addr, &headers, raw_query.as_deref().unwrap_or_default()).await
}

async fn announce_response(service: &HttpService, remote_addr: SocketAddr, headers: &HeaderMap, raw_query: &str) -> Response {
    let query = match raw_query.parse::<query::Query>() {
        Ok(query) => query,
        Err(error) => return bad_request(format!("cannot parse query params: {error}")),
    };

    let request = match announce::Announce::try_from(&query) {
        Ok(request) => request,
        Err(error) => return bad_request(format!("cannot parse announce request: {error}")),
    };

    let peer_ip = peer_ip::resolve(&remote_addr, headers, service.on_reverse_proxy);

    let peer = Peer {
        peer_id: request.peer_id,
        peer_addr: SocketAddr::new(peer_ip, request.port),
        updated: CurrentClock::now(),
        uploaded: request.uploaded.unwrap_or(0),
        downloaded: request.downloaded.unwrap_or(0),
        left: request.left.unwrap_or(0),
        event: request.event,
    };

    let domain_request = core::AnnounceRequest {
        info_hash: request.info_hash,
        peer,
        num_want: request.numwant,
    };

    match service.logic.handle_announce(&domain_request).await {
        Ok(response) => {
            let event = if peer_ip.is_ipv4() {
                statistics::Event::Tcp4Announce
            } else {
                statistics::Event::Tcp6Announce
            };
            service.send_stats_event(event).await;

            if request.compact {
                responses::announce::Compact { response }.into_response()
            } else {
                responses::announce::NonCompact { response }.into_response()
            }
        }
        Err(error) => failure(service, &error, remote_addr).await,
    }
}

async fn scrape_response(service: &HttpService, remote_addr: SocketAddr, headers: &HeaderMap, raw_query: &str) -> Response {
    let query = match raw_query.parse::<query::Query>() {
        Ok(query) => query,
        Err(error) => return bad_request(format!("cannot parse query params: {error}")),
    };

    let request = match scrape::Scrape::try_from(&query) {
        Ok(request) => request,
        Err(error) => return bad_request(format!("cannot parse scrape request: {error}")),
    };

    let domain_request = core::ScrapeRequest {
        info_hashes: request.info_hashes,
    };

    match service.logic.handle_scrape(&domain_request).await {
        Ok(response) => {
            let peer_ip = peer_ip::resolve(&remote_addr, headers, service.on_reverse_proxy);
            let event = if peer_ip.is_ipv4() {
                statistics::Event::Tcp4Scrape
            } else {
                statistics::Event::Tcp6Scrape
            };
            service.send_stats_event(event).await;

            responses::scrape::Bencoded::from(response).into_response()
        }
        Err(error) => failure(service, &error, remote_addr).await,
    }
}

fn bad_request(failure_reason: String) -> Response {
    debug!("rejecting http request: {failure_reason}");
    responses::error::Error { failure_reason }.into_response()
}

async fn failure(service: &HttpService, error: &core::error::Error, remote_addr: SocketAddr) -> Response {
    if error.is_client_error() {
        debug!("http request from {remote_addr} rejected: {error}");
    } else {
        warn!("http request from {remote_addr} failed: {error}");
        let event = if remote_addr.is_ipv4() {
            statistics::Event::Tcp4Error
        } else {
            statistics::Event::Tcp6Error
        };
        service.send_stats_event(event).await;
    }

    responses::error::Error::from(error).into_response()
}

#[cfg(test)]
mod tests {
    use std::net::{IpAddr, Ipv4Addr, SocketAddr};
    use std::sync::Arc;

    use axum::http::HeaderMap;

    use super::{announce_response, scrape_response, HttpService};
    use crate::core::pipeline::Logic;
    use crate::core::storage::memory::MemoryStore;
    use swarm_tracker_configuration::{MemoryStorageConfig, ResponseConfig};

    fn service() -> HttpService {
        let store = Arc::new(MemoryStore::new(&MemoryStorageConfig {
            shard_count: 8,
            ..MemoryStorageConfig::default()
        }));

        HttpService {
            logic: Arc::new(Logic::new(store, ResponseConfig::default(), vec![], vec![])),
            on_reverse_proxy: false,
            stats_event_sender: None,
        }
    }

    fn client_addr() -> SocketAddr {
        SocketAddr::new(IpAddr::V4(Ipv4Addr::new(126, 0, 0, 1)), 50000)
    }

    async fn body_of(response: axum::response::Response) -> String {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        // Compact peer strings are raw bytes; a lossy conversion keeps the
        // surrounding ASCII intact for the asserts.
        String::from_utf8_lossy(&bytes).into_owned()
    }

    const ANNOUNCE_QUERY: &str =
        "info_hash=%3B%24U%04%CF%5F%11%BB%DB%E1%20%1C%EAjk%F4Z%EE%1B%C0&peer_id=-qB00000000000000001&port=17548&left=100";

    #[tokio::test]
    async fn a_valid_announce_should_return_a_bencoded_response_with_status_200() {
        let service = service();

        let response = announce_response(&service, client_addr(), &HeaderMap::new(), ANNOUNCE_QUERY).await;

        assert_eq!(response.status(), 200);
        let body = body_of(response).await;
        assert!(body.starts_with("d8:complete"));
        // The lone peer receives its own 6-byte compact representation.
        assert!(body.contains("5:peers6:"));
    }

    #[tokio::test]
    async fn an_announce_without_mandatory_params_should_return_a_failure_reason_with_status_200() {
        let service = service();

        let response = announce_response(&service, client_addr(), &HeaderMap::new(), "port=17548").await;

        assert_eq!(response.status(), 200);
        let body = body_of(response).await;
        assert!(body.starts_with("d14:failure reason"));
    }

    #[tokio::test]
    async fn an_announce_can_ask_for_the_dictionary_peer_format() {
        let service = service();

        let query = format!("{ANNOUNCE_QUERY}&compact=0");
        let response = announce_response(&service, client_addr(), &HeaderMap::new(), &query).await;

        let body = body_of(response).await;
        assert!(body.contains("5:peersl"));
        assert!(body.contains("7:peer id"));
    }

    #[tokio::test]
    async fn a_scrape_should_return_the_files_dictionary() {
        let service = service();

        announce_response(&service, client_addr(), &HeaderMap::new(), ANNOUNCE_QUERY).await;

        let response = scrape_response(
            &service,
            client_addr(),
            &HeaderMap::new(),
            "info_hash=%3B%24U%04%CF%5F%11%BB%DB%E1%20%1C%EAjk%F4Z%EE%1B%C0",
        )
        .await;

        assert_eq!(response.status(), 200);
        let body = body_of(response).await;
        assert!(body.starts_with("d5:filesd20:"));
        assert!(body.contains("10:incompletei1e"));
    }

    #[tokio::test]
    async fn a_scrape_without_info_hashes_should_return_a_failure_reason() {
        let service = service();

        let response = scrape_response(&service, client_addr(), &HeaderMap::new(), "").await;

        let body = body_of(response).await;
        assert!(body.starts_with("d14:failure reason"));
    }
}
