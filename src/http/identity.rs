//! Caller identity extraction from HTTP requests.

use std::net::SocketAddr;

use axum::extract::ConnectInfo;
use axum::http::{HeaderMap, Request};
use serde::{Deserialize, Serialize};

use crate::ratelimit::Identity;

/// Header carrying the proxy chain, left-most entry being the client.
pub const X_FORWARDED_FOR: &str = "x-forwarded-for";

/// Where the caller identity is taken from.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IdentitySource {
    /// First `X-Forwarded-For` entry, falling back to the peer address.
    #[default]
    ForwardedFor,
    /// Peer address only; client supplied headers are ignored.
    PeerAddress,
}

impl IdentitySource {
    /// Derive the identity for a request.
    ///
    /// Never fails: when no source yields a value the request lands in
    /// [`Identity::unknown`].
    pub fn extract<B>(&self, request: &Request<B>) -> Identity {
        let peer = request
            .extensions()
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ConnectInfo(addr)| *addr);

        self.extract_from_parts(request.headers(), peer)
    }

    /// Derive the identity from headers and an optional peer address.
    pub fn extract_from_parts(&self, headers: &HeaderMap, peer: Option<SocketAddr>) -> Identity {
        let forwarded = match self {
            IdentitySource::ForwardedFor => forwarded_client(headers),
            IdentitySource::PeerAddress => None,
        };

        forwarded
            .or_else(|| peer.map(|addr| Identity::new(addr.ip().to_string())))
            .unwrap_or_else(Identity::unknown)
    }
}

/// The left-most non-empty `X-Forwarded-For` entry, if any.
fn forwarded_client(headers: &HeaderMap) -> Option<Identity> {
    let value = headers.get(X_FORWARDED_FOR)?.to_str().ok()?;
    let first = value.split(',').next()?.trim();

    if first.is_empty() {
        None
    } else {
        Some(Identity::from(first))
    }
}
