//! Request extractors: client identity and session cookie

use axum::extract::{ConnectInfo, FromRequestParts};
use axum::http::request::Parts;
use axum::http::{HeaderMap, HeaderValue, header};
use bluehour_api::User;
use bluehour_core::SessionToken;
use std::convert::Infallible;
use std::net::SocketAddr;
use std::time::Duration;

use crate::{AppError, AppState};

/// Name of the session cookie
pub const SESSION_COOKIE: &str = "bluehour_session";

const UNKNOWN_CLIENT: &str = "unknown";

/// Who is making the request, for admission-guard keys
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientIdentity(pub String);

impl ClientIdentity {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Resolve the client identity.
///
/// Forwarded headers are honoured only when the server sits behind a trusted
/// proxy: first `X-Forwarded-For` entry, then `X-Real-IP`. Otherwise the TCP
/// peer address is used, and `"unknown"` when there is none.
pub fn resolve_client_identity(
    headers: &HeaderMap,
    peer: Option<SocketAddr>,
    trust_proxy_headers: bool,
) -> String {
    if trust_proxy_headers {
        let forwarded = headers
            .get("x-forwarded-for")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.split(',').next())
            .map(str::trim)
            .filter(|v| !v.is_empty());
        let real_ip = || {
            headers
                .get("x-real-ip")
                .and_then(|v| v.to_str().ok())
                .map(str::trim)
                .filter(|v| !v.is_empty())
        };
        if let Some(ip) = forwarded.or_else(real_ip) {
            return ip.to_string();
        }
    }

    match peer {
        Some(addr) => addr.ip().to_string(),
        None => UNKNOWN_CLIENT.to_string(),
    }
}

impl FromRequestParts<AppState> for ClientIdentity {
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let peer = parts
            .extensions
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ConnectInfo(addr)| *addr);

        Ok(ClientIdentity(resolve_client_identity(
            &parts.headers,
            peer,
            state.config.server.trust_proxy_headers,
        )))
    }
}

/// The logged-in user, if the request carries a live session
#[derive(Debug, Clone)]
pub struct CurrentUser {
    pub user: Option<User>,
    pub token: Option<SessionToken>,
}

impl CurrentUser {
    /// The user, or 401 with `message`
    pub fn require(self, message: &str) -> Result<User, AppError> {
        self.user
            .ok_or_else(|| AppError::Unauthorized(message.to_string()))
    }
}

impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let Some(token) = session_token(&parts.headers) else {
            return Ok(CurrentUser {
                user: None,
                token: None,
            });
        };

        let lookup = token.clone();
        let user = state.run(move |journal| journal.authenticate(&lookup)).await?;

        Ok(CurrentUser {
            user,
            token: Some(token),
        })
    }
}

/// Read the session token from the `Cookie` headers
pub fn session_token(headers: &HeaderMap) -> Option<SessionToken> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, value)| *name == SESSION_COOKIE && !value.is_empty())
        .map(|(_, value)| SessionToken::from_client(value))
}

/// `Set-Cookie` value carrying a new session
pub fn session_cookie(token: &SessionToken, max_age: Duration, secure: bool) -> HeaderValue {
    cookie_value(token.as_str(), max_age.as_secs(), secure)
}

/// `Set-Cookie` value that clears the session
pub fn clear_session_cookie(secure: bool) -> HeaderValue {
    cookie_value("", 0, secure)
}

fn cookie_value(value: &str, max_age_secs: u64, secure: bool) -> HeaderValue {
    let mut cookie =
        format!("{SESSION_COOKIE}={value}; HttpOnly; SameSite=Lax; Path=/; Max-Age={max_age_secs}");
    if secure {
        cookie.push_str("; Secure");
    }
    // Tokens are hex, so the value is always a valid header
    HeaderValue::from_str(&cookie).unwrap_or_else(|_| HeaderValue::from_static(""))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn headers(pairs: &[(&'static str, &str)]) -> HeaderMap {
        let mut map = HeaderMap::new();
        for (name, value) in pairs {
            map.append(*name, HeaderValue::from_str(value).unwrap());
        }
        map
    }

    fn peer() -> Option<SocketAddr> {
        Some("10.0.0.7:53211".parse().unwrap())
    }

    #[test]
    fn proxy_headers_ignored_unless_trusted() {
        let h = headers(&[("x-forwarded-for", "203.0.113.9")]);
        assert_eq!(resolve_client_identity(&h, peer(), false), "10.0.0.7");
        assert_eq!(resolve_client_identity(&h, peer(), true), "203.0.113.9");
    }

    #[test]
    fn forwarded_for_uses_first_hop() {
        let h = headers(&[
            ("x-forwarded-for", " 203.0.113.9 , 10.0.0.1"),
            ("x-real-ip", "198.51.100.4"),
        ]);
        assert_eq!(resolve_client_identity(&h, peer(), true), "203.0.113.9");
    }

    #[test]
    fn real_ip_fallback() {
        let h = headers(&[("x-real-ip", "198.51.100.4")]);
        assert_eq!(resolve_client_identity(&h, peer(), true), "198.51.100.4");
    }

    #[test]
    fn peer_port_is_not_part_of_identity() {
        let a = resolve_client_identity(&HeaderMap::new(), Some("10.0.0.7:1".parse().unwrap()), false);
        let b = resolve_client_identity(&HeaderMap::new(), Some("10.0.0.7:2".parse().unwrap()), false);
        assert_eq!(a, b);
    }

    #[test]
    fn unknown_without_any_source() {
        assert_eq!(resolve_client_identity(&HeaderMap::new(), None, true), "unknown");
    }

    #[test]
    fn finds_session_cookie() {
        let h = headers(&[("cookie", "theme=dark; bluehour_session=abc123; other=1")]);
        assert_eq!(session_token(&h).unwrap().as_str(), "abc123");

        let h = headers(&[("cookie", "theme=dark"), ("cookie", "bluehour_session=xyz")]);
        assert_eq!(session_token(&h).unwrap().as_str(), "xyz");

        let h = headers(&[("cookie", "bluehour_session=")]);
        assert!(session_token(&h).is_none());
    }

    #[test]
    fn cookie_attributes() {
        let token = SessionToken::from_client("abc");
        let cookie = session_cookie(&token, Duration::from_secs(604_800), false);
        assert_eq!(
            cookie.to_str().unwrap(),
            "bluehour_session=abc; HttpOnly; SameSite=Lax; Path=/; Max-Age=604800"
        );

        let cleared = clear_session_cookie(true);
        assert!(cleared.to_str().unwrap().ends_with("Max-Age=0; Secure"));
    }
}
