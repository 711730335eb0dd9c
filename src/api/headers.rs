//! Header parsing and request-context extractors.

use axum::{
    async_trait,
    extract::{ConnectInfo, FromRequestParts},
    http::{header::AUTHORIZATION, request::Parts, HeaderMap},
};
use std::net::SocketAddr;

use crate::error::ApiError;
use crate::server::AppState;

/// Extension trait for convenient header parsing.
pub trait HeaderMapExt {
    /// Get a header value as a string, returning None if missing.
    fn get_str(&self, name: &str) -> Option<&str>;

    /// Token from `Authorization: Bearer <token>`.
    fn bearer_token(&self) -> Option<&str>;

    /// First address in `X-Forwarded-For`, falling back to `X-Real-IP`.
    fn forwarded_ip(&self) -> Option<&str>;
}

impl HeaderMapExt for HeaderMap {
    fn get_str(&self, name: &str) -> Option<&str> {
        self.get(name).and_then(|v| v.to_str().ok())
    }

    fn bearer_token(&self) -> Option<&str> {
        let value = self.get(AUTHORIZATION)?.to_str().ok()?.trim();
        let (scheme, token) = value.split_once(' ')?;
        if !scheme.eq_ignore_ascii_case("bearer") {
            return None;
        }
        Some(token.trim()).filter(|t| !t.is_empty())
    }

    fn forwarded_ip(&self) -> Option<&str> {
        self.get_str("x-forwarded-for")
            .and_then(|v| v.split(',').next())
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .or_else(|| {
                self.get_str("x-real-ip")
                    .map(str::trim)
                    .filter(|v| !v.is_empty())
            })
    }
}

/// Client address for activity logs.
///
/// Forwarding headers are only read when `trust_forwarded` is set.
pub fn client_ip(headers: &HeaderMap, peer: Option<SocketAddr>, trust_forwarded: bool) -> String {
    let forwarded = if trust_forwarded {
        headers.forwarded_ip()
    } else {
        None
    };
    forwarded
        .map(str::to_string)
        .or_else(|| peer.map(|addr| addr.ip().to_string()))
        .unwrap_or_else(|| "unknown".to_string())
}

/// Client address of the current request
#[derive(Debug, Clone)]
pub struct ClientIp(pub String);

#[async_trait]
impl FromRequestParts<AppState> for ClientIp {
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let peer = parts
            .extensions
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ConnectInfo(addr)| *addr);
        let trust = state.config.proxy.trust_forwarded_headers;
        Ok(ClientIp(client_ip(&parts.headers, peer, trust)))
    }
}

/// An authenticated admin request
#[derive(Debug, Clone)]
pub struct AdminSession {
    pub username: String,
    pub ip: String,
}

#[async_trait]
impl FromRequestParts<AppState> for AdminSession {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let ClientIp(ip) = match ClientIp::from_request_parts(parts, state).await {
            Ok(ip) => ip,
            Err(never) => match never {},
        };

        let admin = parts
            .headers
            .bearer_token()
            .and_then(|token| state.config.admin_for_token(token));

        match admin {
            Some(admin) => Ok(AdminSession {
                username: admin.username.clone(),
                ip,
            }),
            None => {
                tracing::warn!(%ip, path = %parts.uri.path(), "Rejected admin request");
                Err(ApiError::Unauthorized)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::{HeaderName, HeaderValue};

    fn make_headers(pairs: &[(&str, &str)]) -> HeaderMap {
        let mut headers = HeaderMap::new();
        for (name, value) in pairs {
            // HTTP header names are case-insensitive
            let header_name = HeaderName::try_from(*name).unwrap();
            headers.insert(header_name, HeaderValue::from_str(value).unwrap());
        }
        headers
    }

    #[test]
    fn test_get_str() {
        let headers = make_headers(&[("x-thing", "value")]);
        assert_eq!(headers.get_str("X-Thing"), Some("value"));
        assert_eq!(headers.get_str("missing"), None);
    }

    #[test]
    fn test_bearer_token() {
        let headers = make_headers(&[("authorization", "Bearer abc123")]);
        assert_eq!(headers.bearer_token(), Some("abc123"));

        let headers = make_headers(&[("authorization", "bearer   xyz ")]);
        assert_eq!(headers.bearer_token(), Some("xyz"));
    }

    #[test]
    fn test_bearer_token_rejects_other_schemes() {
        assert_eq!(
            make_headers(&[("authorization", "Basic YWxpY2U6cHc=")]).bearer_token(),
            None
        );
        assert_eq!(make_headers(&[("authorization", "Bearer")]).bearer_token(), None);
        assert_eq!(HeaderMap::new().bearer_token(), None);
    }

    #[test]
    fn test_client_ip_prefers_forwarded_for() {
        let peer: SocketAddr = "10.0.0.9:5555".parse().unwrap();
        let headers = make_headers(&[
            ("x-forwarded-for", "203.0.113.7, 10.0.0.1"),
            ("x-real-ip", "198.51.100.2"),
        ]);
        assert_eq!(client_ip(&headers, Some(peer), true), "203.0.113.7");
    }

    #[test]
    fn test_client_ip_ignores_forwarding_headers_unless_trusted() {
        let peer: SocketAddr = "10.0.0.9:5555".parse().unwrap();
        let headers = make_headers(&[
            ("x-forwarded-for", "203.0.113.7"),
            ("x-real-ip", "198.51.100.2"),
        ]);
        assert_eq!(client_ip(&headers, Some(peer), false), "10.0.0.9");
        assert_eq!(client_ip(&headers, None, false), "unknown");
    }

    #[test]
    fn test_client_ip_fallbacks() {
        let peer: SocketAddr = "10.0.0.9:5555".parse().unwrap();
        let headers = make_headers(&[("x-real-ip", "198.51.100.2")]);
        assert_eq!(client_ip(&headers, Some(peer), true), "198.51.100.2");
        assert_eq!(client_ip(&HeaderMap::new(), Some(peer), true), "10.0.0.9");
        assert_eq!(client_ip(&HeaderMap::new(), None, true), "unknown");
    }
}
