//! Handlers for the UDP server.
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr};
use std::sync::Arc;

use aquatic_udp_protocol::{
    AnnounceInterval, AnnounceResponse, ConnectRequest, ConnectResponse, ErrorResponse, NumberOfDownloads, NumberOfPeers,
    Port, Request, Response, ResponsePeer, ScrapeRequest, ScrapeResponse, TorrentScrapeStatistics, TransactionId,
};
use swarm_tracker_primitives::info_hash::InfoHash;
use tracing::{debug, warn};

use super::connection_cookie::{check, from_connection_id, into_connection_id, make, SecretKeeper};
use super::error::Error;
use super::request::AnnounceWrapper;
use super::{peer_builder, UdpRequest, MAX_SCRAPE_TORRENTS};
use crate::core;
use crate::core::pipeline::Logic;
use crate::core::statistics;

/// Everything the UDP handlers need to serve a datagram.
pub struct UdpService {
    pub logic: Arc<Logic>,
    pub secrets: Arc<SecretKeeper>,
    pub max_clock_skew: u64,
    pub stats_event_sender: Option<Arc<dyn statistics::EventSender>>,
}

impl UdpService {
    async fn send_stats_event(&self, event: statistics::Event) {
        if let Some(sender) = &self.stats_event_sender {
            sender.send_event(event).await;
        }
    }
}

/// Handles one incoming datagram.
///
/// Returns the response to send back, or `None` for malformed packets,
/// which are dropped without an answer.
pub async fn handle_packet(udp_request: UdpRequest, service: &UdpService) -> Option<Response> {
    debug!("udp request from {}: {} bytes", udp_request.from, udp_request.payload.len());

    let Ok(request) = Request::from_bytes(&udp_request.payload, MAX_SCRAPE_TORRENTS) else {
        debug!("dropping malformed packet from {}", udp_request.from);
        return None;
    };

    let transaction_id = match &request {
        Request::Connect(connect_request) => connect_request.transaction_id,
        Request::Announce(announce_request) => announce_request.transaction_id,
        Request::Scrape(scrape_request) => scrape_request.transaction_id,
    };

    match handle_request(request, udp_request.from, service).await {
        Ok(response) => Some(response),
        Err(error) => {
            if error.is_client_error() {
                debug!("udp request from {} rejected: {error}", udp_request.from);
            } else {
                warn!("udp request from {} failed: {error}", udp_request.from);
                service.send_stats_event(error_event(&udp_request.from)).await;
            }
            Some(handle_error(&error, transaction_id))
        }
    }
}

/// Dispatches the request to the matching handler.
///
/// # Errors
///
/// Will return an [`Error`] if the connection ID does not verify or the
/// pipeline rejects the request.
pub async fn handle_request(request: Request, remote_addr: SocketAddr, service: &UdpService) -> Result<Response, Error> {
    match request {
        Request::Connect(connect_request) => handle_connect(remote_addr, &connect_request, service).await,
        Request::Announce(announce_request) => handle_announce(remote_addr, &announce_request, service).await,
        Request::Scrape(scrape_request) => handle_scrape(remote_addr, &scrape_request, service).await,
    }
}

/// Issues a connection ID for the client address.
///
/// # Errors
///
/// This function does not ever return an error.
pub async fn handle_connect(remote_addr: SocketAddr, request: &ConnectRequest, service: &UdpService) -> Result<Response, Error> {
    let cookie = make(&remote_addr.ip(), &service.secrets);

    let response = ConnectResponse {
        transaction_id: request.transaction_id,
        connection_id: into_connection_id(&cookie),
    };

    match remote_addr {
        SocketAddr::V4(_) => service.send_stats_event(statistics::Event::Udp4Connect).await,
        SocketAddr::V6(_) => service.send_stats_event(statistics::Event::Udp6Connect).await,
    }

    Ok(Response::from(response))
}

/// Verifies the connection ID and runs the announce through the pipeline.
///
/// # Errors
///
/// Will return an [`Error`] for an invalid connection ID or a pipeline
/// failure.
pub async fn handle_announce(
    remote_addr: SocketAddr,
    announce_request: &aquatic_udp_protocol::AnnounceRequest,
    service: &UdpService,
) -> Result<Response, Error> {
    check(
        &remote_addr.ip(),
        &from_connection_id(&announce_request.connection_id),
        &service.secrets,
        service.max_clock_skew,
    )?;

    let wrapped_announce_request = AnnounceWrapper::new(announce_request);

    let peer = peer_builder::from_request(&wrapped_announce_request, &remote_addr.ip());

    #[allow(clippy::cast_sign_loss)]
    let num_want = if announce_request.peers_wanted.0 > 0 {
        Some(announce_request.peers_wanted.0 as u32)
    } else {
        None
    };

    let request = core::AnnounceRequest {
        info_hash: wrapped_announce_request.info_hash,
        peer,
        num_want,
    };

    let response = service.logic.handle_announce(&request).await?;

    match remote_addr {
        SocketAddr::V4(_) => service.send_stats_event(statistics::Event::Udp4Announce).await,
        SocketAddr::V6(_) => service.send_stats_event(statistics::Event::Udp6Announce).await,
    }

    #[allow(clippy::cast_possible_truncation, clippy::cast_possible_wrap)]
    if remote_addr.is_ipv4() {
        let announce_response = AnnounceResponse {
            transaction_id: announce_request.transaction_id,
            announce_interval: AnnounceInterval(response.interval as i32),
            leechers: NumberOfPeers(response.incomplete as i32),
            seeders: NumberOfPeers(response.complete as i32),
            peers: response
                .ipv4_peers
                .iter()
                .filter_map(|peer| {
                    if let IpAddr::V4(ip) = peer.peer_addr.ip() {
                        Some(ResponsePeer::<Ipv4Addr> {
                            ip_address: ip,
                            port: Port(peer.peer_addr.port()),
                        })
                    } else {
                        None
                    }
                })
                .collect(),
        };

        Ok(Response::from(announce_response))
    } else {
        let announce_response = AnnounceResponse {
            transaction_id: announce_request.transaction_id,
            announce_interval: AnnounceInterval(response.interval as i32),
            leechers: NumberOfPeers(response.incomplete as i32),
            seeders: NumberOfPeers(response.complete as i32),
            peers: response
                .ipv6_peers
                .iter()
                .filter_map(|peer| {
                    if let IpAddr::V6(ip) = peer.peer_addr.ip() {
                        Some(ResponsePeer::<Ipv6Addr> {
                            ip_address: ip,
                            port: Port(peer.peer_addr.port()),
                        })
                    } else {
                        None
                    }
                })
                .collect(),
        };

        Ok(Response::from(announce_response))
    }
}

/// Verifies the connection ID and scrapes the requested swarms.
///
/// # Errors
///
/// Will return an [`Error`] for an invalid connection ID or a pipeline
/// failure.
pub async fn handle_scrape(remote_addr: SocketAddr, request: &ScrapeRequest, service: &UdpService) -> Result<Response, Error> {
    check(
        &remote_addr.ip(),
        &from_connection_id(&request.connection_id),
        &service.secrets,
        service.max_clock_skew,
    )?;

    let info_hashes = request.info_hashes.iter().map(|hash| InfoHash::V1(hash.0)).collect();

    let scrape_data = service
        .logic
        .handle_scrape(&core::ScrapeRequest { info_hashes })
        .await?;

    let mut torrent_stats: Vec<TorrentScrapeStatistics> = Vec::with_capacity(scrape_data.files.len());

    for file in &scrape_data.files {
        #[allow(clippy::cast_possible_truncation, clippy::cast_possible_wrap)]
        torrent_stats.push(TorrentScrapeStatistics {
            seeders: NumberOfPeers(file.metadata.complete as i32),
            completed: NumberOfDownloads(file.metadata.downloaded as i32),
            leechers: NumberOfPeers(file.metadata.incomplete as i32),
        });
    }

    match remote_addr {
        SocketAddr::V4(_) => service.send_stats_event(statistics::Event::Udp4Scrape).await,
        SocketAddr::V6(_) => service.send_stats_event(statistics::Event::Udp6Scrape).await,
    }

    Ok(Response::from(ScrapeResponse {
        transaction_id: request.transaction_id,
        torrent_stats,
    }))
}

fn handle_error(error: &Error, transaction_id: TransactionId) -> Response {
    Response::from(ErrorResponse {
        transaction_id,
        message: error.failure_reason().into(),
    })
}

fn error_event(remote_addr: &SocketAddr) -> statistics::Event {
    match remote_addr {
        SocketAddr::V4(_) => statistics::Event::Udp4Error,
        SocketAddr::V6(_) => statistics::Event::Udp6Error,
    }
}
