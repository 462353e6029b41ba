//! Client identification and admission checks for the fixed-window limiter

use ajvs_common::{
    metrics,
    rate_limit::{Admission, FixedWindowLimiter},
};
use axum::{
    extract::{ConnectInfo, FromRequestParts},
    http::{request::Parts, HeaderMap},
};
use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

/// Key used when neither proxy headers nor a peer address are available
pub const UNKNOWN_CLIENT: &str = "unknown";

/// Rate-limit key of the requesting client
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientKey(pub String);

impl ClientKey {
    /// First `X-Forwarded-For` hop, then `X-Real-IP`, then the socket peer
    pub fn from_parts(headers: &HeaderMap, peer: Option<SocketAddr>) -> Self {
        let header = |name: &str| {
            headers
                .get(name)
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.split(',').next())
                .map(str::trim)
                .filter(|v| !v.is_empty())
                .map(str::to_string)
        };

        let key = header("x-forwarded-for")
            .or_else(|| header("x-real-ip"))
            .or_else(|| peer.map(|addr| addr.ip().to_string()))
            .unwrap_or_else(|| UNKNOWN_CLIENT.to_string());

        Self(key)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl<S> FromRequestParts<S> for ClientKey
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let peer = parts
            .extensions
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ConnectInfo(addr)| *addr);

        Ok(Self::from_parts(&parts.headers, peer))
    }
}

/// Consult `limiter` for `client`; always admits when limiting is disabled
pub fn admit(limiter: Option<&Arc<FixedWindowLimiter>>, client: &ClientKey, endpoint: &'static str) -> Admission {
    let Some(limiter) = limiter else {
        return Admission::Admitted;
    };

    let admission = limiter.check(client.as_str());
    if let Admission::Rejected { retry_after } = admission {
        tracing::warn!(
            client = %client.as_str(),
            endpoint,
            retry_after_secs = retry_after.as_secs(),
            "Rate limit exceeded"
        );
        metrics::record_rate_limited(endpoint);
    }
    admission
}

/// Whole seconds for a `Retry-After` header, never zero
pub fn retry_after_secs(retry_after: Duration) -> u64 {
    let secs = retry_after.as_secs() + u64::from(retry_after.subsec_nanos() > 0);
    secs.max(1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ajvs_common::rate_limit::RateLimitConfig;
    use axum::http::HeaderValue;

    fn headers(pairs: &[(&'static str, &'static str)]) -> HeaderMap {
        let mut map = HeaderMap::new();
        for (name, value) in pairs {
            map.insert(*name, HeaderValue::from_static(value));
        }
        map
    }

    #[test]
    fn test_forwarded_for_takes_first_hop() {
        let key = ClientKey::from_parts(
            &headers(&[("x-forwarded-for", "203.0.113.7, 10.0.0.2"), ("x-real-ip", "10.0.0.9")]),
            Some(SocketAddr::from(([127, 0, 0, 1], 4000))),
        );
        assert_eq!(key.as_str(), "203.0.113.7");
    }

    #[test]
    fn test_fallback_order() {
        let peer = Some(SocketAddr::from(([192, 0, 2, 1], 5555)));

        let real_ip = ClientKey::from_parts(&headers(&[("x-real-ip", "198.51.100.4")]), peer);
        assert_eq!(real_ip.as_str(), "198.51.100.4");

        let socket = ClientKey::from_parts(&headers(&[("x-forwarded-for", " ")]), peer);
        assert_eq!(socket.as_str(), "192.0.2.1");

        let unknown = ClientKey::from_parts(&HeaderMap::new(), None);
        assert_eq!(unknown.as_str(), UNKNOWN_CLIENT);
    }

    #[test]
    fn test_admit_without_limiter() {
        let client = ClientKey("203.0.113.7".into());
        assert!((0..500).all(|_| admit(None, &client, "oai").is_admitted()));
    }

    #[test]
    fn test_admit_with_limiter() {
        let limiter = Arc::new(FixedWindowLimiter::new(RateLimitConfig {
            window: Duration::from_secs(60),
            max_requests: 2,
        }));
        let client = ClientKey("203.0.113.7".into());

        assert!(admit(Some(&limiter), &client, "rss").is_admitted());
        assert!(admit(Some(&limiter), &client, "rss").is_admitted());

        let retry_after = admit(Some(&limiter), &client, "rss").retry_after().unwrap();
        assert!(retry_after <= Duration::from_secs(60));
        assert!(admit(Some(&limiter), &ClientKey("198.51.100.4".into()), "rss").is_admitted());
    }

    #[test]
    fn test_retry_after_rounds_up() {
        assert_eq!(retry_after_secs(Duration::from_millis(1500)), 2);
        assert_eq!(retry_after_secs(Duration::from_secs(600)), 600);
        assert_eq!(retry_after_secs(Duration::ZERO), 1);
    }
}
