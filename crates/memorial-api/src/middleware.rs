use std::convert::Infallible;
use std::net::SocketAddr;

use axum::{
    extract::{ConnectInfo, FromRef, FromRequestParts, Request, State},
    http::request::Parts,
    middleware::Next,
    response::{IntoResponse, Response},
};
use axum_extra::extract::SignedCookieJar;

use crate::error::ApiError;
use crate::state::AppState;

/// Gate for admin routes: requires a live session with `is_admin`.
///
/// The session is inserted into request extensions for handlers, and the
/// cookie is re-issued so its browser-side expiry slides with the server's.
pub async fn require_auth(
    State(state): State<AppState>,
    jar: SignedCookieJar,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let session = state
        .sessions
        .load(&jar)
        .await
        .map_err(|e| ApiError::storage("Failed to check session", e))?
        .filter(|s| s.is_admin())
        .ok_or(ApiError::Unauthorized)?;

    let jar = state.sessions.refresh(jar, &session.id);
    req.extensions_mut().insert(session);

    let response = next.run(req).await;
    Ok((jar, response).into_response())
}

/// Address used as the rate-limiter key.
///
/// With `proxy_hops = n` the n-th `X-Forwarded-For` entry from the right is
/// used, since that is the one the outermost trusted proxy wrote. Entries
/// further left are client-controlled. Otherwise the socket peer address,
/// or `"unknown"` when neither exists.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientIp(pub String);

impl<S> FromRequestParts<S> for ClientIp
where
    AppState: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let app = AppState::from_ref(state);

        let forwarded = parts
            .headers
            .get("x-forwarded-for")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| forwarded_client(v, app.config.proxy_hops));
        if let Some(ip) = forwarded {
            return Ok(ClientIp(ip.to_string()));
        }

        let peer = parts
            .extensions
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ConnectInfo(addr)| addr.ip().to_string());

        Ok(ClientIp(peer.unwrap_or_else(|| "unknown".to_string())))
    }
}

/// Picks the entry `hops` positions from the right of an `X-Forwarded-For`
/// list. `None` when proxies are not trusted or the list is too short.
pub fn forwarded_client(header: &str, hops: usize) -> Option<&str> {
    if hops == 0 {
        return None;
    }
    let entries: Vec<&str> = header
        .split(',')
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .collect();
    let index = entries.len().checked_sub(hops)?;
    entries.get(index).copied()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn untrusted_header_is_ignored() {
        assert_eq!(forwarded_client("203.0.113.9", 0), None);
    }

    #[test]
    fn single_proxy_takes_rightmost_entry() {
        assert_eq!(forwarded_client("203.0.113.9", 1), Some("203.0.113.9"));
        assert_eq!(forwarded_client("spoofed, 198.51.100.7", 1), Some("198.51.100.7"));
        assert_eq!(forwarded_client("a, b ,c", 1), Some("c"));
    }

    #[test]
    fn proxy_chain_counts_from_the_right() {
        assert_eq!(forwarded_client("spoofed, 198.51.100.7, 10.0.0.2", 2), Some("198.51.100.7"));
        assert_eq!(forwarded_client("10.0.0.2", 2), None);
        assert_eq!(forwarded_client(" , ", 1), None);
    }
}
