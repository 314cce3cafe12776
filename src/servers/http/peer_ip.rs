//! Resolution of the announcing peer's IP address.
//!
//! Trackers ignore any IP the client claims in the announce parameters and
//! use the connection source address instead. Behind a reverse proxy the
//! source address is the proxy, so the leftmost `X-Forwarded-For` entry is
//! used when the tracker is configured for it.
use std::net::{IpAddr, SocketAddr};
use std::str::FromStr;

use axum::http::HeaderMap;

const X_FORWARDED_FOR: &str = "x-forwarded-for";

/// Resolves the peer IP for a request.
#[must_use]
pub fn resolve(remote_addr: &SocketAddr, headers: &HeaderMap, on_reverse_proxy: bool) -> IpAddr {
    if on_reverse_proxy {
        if let Some(ip) = leftmost_forwarded_ip(headers) {
            return ip;
        }
    }

    remote_addr.ip()
}

fn leftmost_forwarded_ip(headers: &HeaderMap) -> Option<IpAddr> {
    let header = headers.get(X_FORWARDED_FOR)?.to_str().ok()?;
    let leftmost = header.split(',').next()?.trim();
    IpAddr::from_str(leftmost).ok()
}

#[cfg(test)]
mod tests {
    use std::net::{IpAddr, Ipv4Addr, SocketAddr};

    use axum::http::HeaderMap;

    use super::resolve;

    fn connection_addr() -> SocketAddr {
        SocketAddr::new(IpAddr::V4(Ipv4Addr::new(10, 0, 0, 1)), 50000)
    }

    #[test]
    fn it_should_use_the_connection_address_by_default() {
        let headers = HeaderMap::new();

        assert_eq!(resolve(&connection_addr(), &headers, false), connection_addr().ip());
    }

    #[test]
    fn it_should_ignore_forwarded_headers_when_not_behind_a_proxy() {
        let mut headers = HeaderMap::new();
        headers.insert("x-forwarded-for", "126.0.0.1".parse().unwrap());

        assert_eq!(resolve(&connection_addr(), &headers, false), connection_addr().ip());
    }

    #[test]
    fn behind_a_proxy_it_should_use_the_leftmost_forwarded_address() {
        let mut headers = HeaderMap::new();
        headers.insert("x-forwarded-for", "126.0.0.1, 10.0.0.2".parse().unwrap());

        assert_eq!(
            resolve(&connection_addr(), &headers, true),
            IpAddr::V4(Ipv4Addr::new(126, 0, 0, 1))
        );
    }

    #[test]
    fn behind_a_proxy_a_missing_header_should_fall_back_to_the_connection_address() {
        let headers = HeaderMap::new();

        assert_eq!(resolve(&connection_addr(), &headers, true), connection_addr().ip());
    }
}
