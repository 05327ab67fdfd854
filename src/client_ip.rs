use std::fmt::Display;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr};

use axum::http::HeaderMap;
use ipnet::IpNet;

pub const FORWARDED_FOR: &str = "x-forwarded-for";

/// Caller address after normalization.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClientOrigin {
    /// Loopback or a configured bypass network; never checked against relays.
    Bypass(IpAddr),
    V4(Ipv4Addr),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientIpError {
    Unparseable(String),
    Unsupported(Ipv6Addr),
}

impl Display for ClientIpError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Unparseable(raw) => write!(f, "unparseable client address {raw:?}"),
            Self::Unsupported(ip) => write!(f, "ipv6 client address {ip} is not supported"),
        }
    }
}

impl std::error::Error for ClientIpError {}

/// Raw origin string: the first `X-Forwarded-For` hop when present,
/// otherwise the transport peer.
pub fn raw_origin(headers: &HeaderMap, peer: SocketAddr) -> String {
    match headers.get(FORWARDED_FOR) {
        Some(value) => {
            let forwarded = String::from_utf8_lossy(value.as_bytes());
            match forwarded.split(',').next().map(str::trim) {
                Some(first) if !first.is_empty() => first.to_string(),
                _ => peer.ip().to_string(),
            }
        }
        None => peer.ip().to_string(),
    }
}

pub fn normalize(raw: &str, bypass_nets: &[IpNet]) -> Result<ClientOrigin, ClientIpError> {
    let ip = raw
        .parse::<IpAddr>()
        .map_err(|_| ClientIpError::Unparseable(raw.to_string()))?
        .to_canonical();

    if ip.is_loopback() || bypass_nets.iter().any(|net| net.contains(&ip)) {
        return Ok(ClientOrigin::Bypass(ip));
    }
    match ip {
        IpAddr::V4(v4) => Ok(ClientOrigin::V4(v4)),
        IpAddr::V6(v6) => Err(ClientIpError::Unsupported(v6)),
    }
}

#[cfg(test)]
mod tests {
    use std::net::{IpAddr, Ipv4Addr, SocketAddr};

    use axum::http::{HeaderMap, HeaderValue};

    use super::{normalize, raw_origin, ClientIpError, ClientOrigin, FORWARDED_FOR};

    fn peer(ip: &str) -> SocketAddr {
        SocketAddr::new(ip.parse().unwrap(), 51000)
    }

    fn forwarded(value: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(FORWARDED_FOR, HeaderValue::from_str(value).unwrap());
        headers
    }

    #[test]
    fn forwarded_for_wins_over_peer() {
        let headers = forwarded(" 203.0.113.7 , 10.0.0.1");
        assert_eq!(raw_origin(&headers, peer("198.51.100.1")), "203.0.113.7");
        assert_eq!(
            normalize(&raw_origin(&headers, peer("127.0.0.1")), &[]),
            Ok(ClientOrigin::V4(Ipv4Addr::new(203, 0, 113, 7)))
        );
    }

    #[test]
    fn empty_forwarded_for_falls_back_to_peer() {
        let headers = forwarded("");
        assert_eq!(raw_origin(&headers, peer("198.51.100.1")), "198.51.100.1");
        assert_eq!(raw_origin(&HeaderMap::new(), peer("198.51.100.1")), "198.51.100.1");
    }

    #[test]
    fn loopback_is_bypassed() {
        assert_eq!(
            normalize("127.0.0.1", &[]),
            Ok(ClientOrigin::Bypass("127.0.0.1".parse().unwrap()))
        );
        assert_eq!(
            normalize("::1", &[]),
            Ok(ClientOrigin::Bypass("::1".parse().unwrap()))
        );
    }

    #[test]
    fn bypass_nets_are_bypassed() {
        let nets = vec!["10.8.0.0/16".parse().unwrap()];
        assert_eq!(
            normalize("10.8.3.4", &nets),
            Ok(ClientOrigin::Bypass(IpAddr::V4(Ipv4Addr::new(10, 8, 3, 4))))
        );
        assert_eq!(
            normalize("10.9.3.4", &nets),
            Ok(ClientOrigin::V4(Ipv4Addr::new(10, 9, 3, 4)))
        );
    }

    #[test]
    fn mapped_ipv4_is_normalized() {
        assert_eq!(
            normalize("::ffff:192.0.2.10", &[]),
            Ok(ClientOrigin::V4(Ipv4Addr::new(192, 0, 2, 10)))
        );
    }

    #[test]
    fn invalid_origins_are_rejected() {
        assert_eq!(
            normalize("not-an-ip", &[]),
            Err(ClientIpError::Unparseable(String::from("not-an-ip")))
        );
        assert!(matches!(
            normalize("2001:db8::1", &[]),
            Err(ClientIpError::Unsupported(_))
        ));
    }
}
