//! Client address extraction for rate-limit partitioning.

use std::convert::Infallible;
use std::net::{IpAddr, SocketAddr};

use axum::extract::{ConnectInfo, FromRequestParts};
use http::request::Parts;

/// Client IP taken from connect info, falling back to forwarding headers
/// when the service runs behind a proxy.
///
/// The address partitions the rate-limit counters; a request without any
/// derivable address is not rate limited.
pub(crate) struct ClientIp(pub(crate) Option<IpAddr>);

impl<S> FromRequestParts<S> for ClientIp
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(Self(client_ip(parts)))
    }
}

fn client_ip(parts: &Parts) -> Option<IpAddr> {
    // First try to get from ConnectInfo (direct connection)
    if let Some(ConnectInfo(addr)) = parts.extensions.get::<ConnectInfo<SocketAddr>>() {
        return Some(addr.ip());
    }

    // Try X-Forwarded-For header (for proxied requests)
    if let Some(forwarded_for) = parts.headers.get("x-forwarded-for") {
        let value = forwarded_for.to_str().ok()?;

        // Take the first IP in the chain
        let ip_str = value.split(',').next()?;

        return ip_str.trim().parse::<IpAddr>().ok();
    }

    // Try X-Real-IP header
    let ip_str = parts.headers.get("x-real-ip")?.to_str().ok()?;

    ip_str.parse::<IpAddr>().ok()
}

#[cfg(test)]
mod tests {
    use std::net::{IpAddr, Ipv4Addr, SocketAddr};

    use axum::extract::ConnectInfo;
    use http::Request;

    use super::client_ip;

    #[test]
    fn connect_info_wins_over_headers() {
        let (mut parts, _) = Request::builder()
            .header("x-forwarded-for", "203.0.113.9")
            .body(())
            .unwrap()
            .into_parts();

        let addr: SocketAddr = "10.0.0.1:4000".parse().unwrap();
        parts.extensions.insert(ConnectInfo(addr));

        assert_eq!(Some(IpAddr::V4(Ipv4Addr::new(10, 0, 0, 1))), client_ip(&parts));
    }

    #[test]
    fn forwarded_for_takes_first_hop() {
        let (parts, _) = Request::builder()
            .header("x-forwarded-for", "203.0.113.9, 10.0.0.1")
            .body(())
            .unwrap()
            .into_parts();

        assert_eq!(
            Some(IpAddr::V4(Ipv4Addr::new(203, 0, 113, 9))),
            client_ip(&parts)
        );
    }

    #[test]
    fn real_ip_is_the_last_fallback() {
        let (parts, _) = Request::builder()
            .header("x-real-ip", "198.51.100.7")
            .body(())
            .unwrap()
            .into_parts();

        assert_eq!(
            Some(IpAddr::V4(Ipv4Addr::new(198, 51, 100, 7))),
            client_ip(&parts)
        );
    }

    #[test]
    fn no_source_yields_none() {
        let (parts, _) = Request::builder().body(()).unwrap().into_parts();

        assert_eq!(None, client_ip(&parts));
    }
}
