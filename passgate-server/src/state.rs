//! Application state module
//!
//! Defines shared state accessible across all request handlers.

use axum::http::{header, HeaderMap, Uri};
use std::sync::Arc;

use passgate_core::RelyingParty;

use crate::config::Config;

/// Application state containing shared resources.
#[derive(Clone, Debug)]
pub struct AppState {
    /// Credential and session stores plus the assertion verifier
    pub relying_party: Arc<RelyingParty>,
    /// Fixed relying party id; `None` derives it from the `Host` header
    pub rp_id: Option<String>,
}

impl AppState {
    pub fn new(relying_party: Arc<RelyingParty>, rp_id: Option<String>) -> Self {
        Self {
            relying_party,
            rp_id,
        }
    }

    /// Fresh relying party with stores and policy taken from `config`
    pub fn from_config(config: &Config) -> Self {
        Self::new(
            Arc::new(RelyingParty::new(config.relying_party_options())),
            config.rp_id.clone(),
        )
    }

    /// Relying party id for this request
    ///
    /// Without a fixed id this is the `Host` header, or the request-target
    /// authority when `Host` is absent. A proxy that rewrites `Host` needs
    /// `PASSGATE_RP_ID` set.
    pub fn rp_id_for(&self, headers: &HeaderMap, uri: &Uri) -> Option<String> {
        if let Some(rp_id) = &self.rp_id {
            return Some(rp_id.clone());
        }
        headers
            .get(header::HOST)
            .and_then(|value| value.to_str().ok())
            .or_else(|| uri.authority().map(|authority| authority.as_str()))
            .map(strip_port)
            .filter(|host| !host.is_empty())
            .map(str::to_string)
    }
}

/// Drop a trailing `:port` from a `Host` header value, keeping IPv6 brackets intact
fn strip_port(host: &str) -> &str {
    if host.starts_with('[') {
        return match host.find(']') {
            Some(end) => &host[..=end],
            None => host,
        };
    }
    match host.rsplit_once(':') {
        Some((name, port)) if port.bytes().all(|b| b.is_ascii_digit()) => name,
        _ => host,
    }
}
