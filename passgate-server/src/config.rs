//! Server configuration module
//!
//! Handles loading configuration from environment variables with sensible defaults.

use passgate_core::{RelyingPartyOptions, VerificationPolicy, CREDENTIAL_TTL, SESSION_TTL};
use std::net::SocketAddr;
use std::time::Duration;

/// Server configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct Config {
    /// Server port (default: 1323)
    pub port: u16,
    /// Server host (default: 127.0.0.1)
    pub host: [u8; 4],
    /// Fixed relying party id; when unset the request `Host` header is used
    pub rp_id: Option<String>,
    /// Allowed CORS origins, comma-separated (default: allow all in dev)
    pub allowed_origins: Option<Vec<String>>,
    /// Request body limit in KB (default: 64)
    pub body_limit_kb: usize,
    /// Request timeout in seconds (default: 30)
    pub timeout_secs: u64,
    /// Enable rate limiting (default: false for tests, true when loaded from env)
    pub rate_limit_enabled: bool,
    /// Rate limit: requests per second (default: 10)
    pub rate_limit_per_sec: u64,
    /// Rate limit: burst size (default: 20)
    pub rate_limit_burst: u32,
    /// Credential lifetime in seconds (default: 3600)
    pub credential_ttl_secs: u64,
    /// Session lifetime in seconds (default: 300)
    pub session_ttl_secs: u64,
    /// Interval between expired-entry sweeps in seconds (default: 60)
    pub cleanup_interval_secs: u64,
    /// Skip the UP flag check and keep sessions reusable until expiry (default: false)
    pub compat_mode: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: 1323,
            host: [127, 0, 0, 1],
            rp_id: None,
            allowed_origins: None, // None = allow all (dev mode)
            body_limit_kb: 64,
            timeout_secs: 30,
            rate_limit_enabled: false, // Disabled by default (for tests)
            rate_limit_per_sec: 10,
            rate_limit_burst: 20,
            credential_ttl_secs: CREDENTIAL_TTL.as_secs(),
            session_ttl_secs: SESSION_TTL.as_secs(),
            cleanup_interval_secs: 60,
            compat_mode: false,
        }
    }
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let port = env_parse("PORT").unwrap_or(defaults.port);

        let host = std::env::var("HOST")
            .ok()
            .map(|h| {
                if h == "0.0.0.0" {
                    [0, 0, 0, 0]
                } else {
                    [127, 0, 0, 1]
                }
            })
            .unwrap_or(defaults.host);

        let rp_id = std::env::var("PASSGATE_RP_ID")
            .ok()
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty());

        let allowed_origins = std::env::var("ALLOWED_ORIGINS").ok().map(|origins| {
            origins
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect()
        });

        // Rate limiting enabled by default in production, can be disabled with RATE_LIMIT_ENABLED=false
        let rate_limit_enabled = std::env::var("RATE_LIMIT_ENABLED")
            .map(|v| v.to_lowercase() != "false")
            .unwrap_or(true);

        let compat_mode = std::env::var("PASSGATE_COMPAT_MODE")
            .map(|v| v.to_lowercase() == "true")
            .unwrap_or(false);

        Self {
            port,
            host,
            rp_id,
            allowed_origins,
            body_limit_kb: env_parse("BODY_LIMIT_KB").unwrap_or(defaults.body_limit_kb),
            timeout_secs: env_parse("REQUEST_TIMEOUT_SECS").unwrap_or(defaults.timeout_secs),
            rate_limit_enabled,
            rate_limit_per_sec: env_parse("RATE_LIMIT_PER_SEC")
                .unwrap_or(defaults.rate_limit_per_sec),
            rate_limit_burst: env_parse("RATE_LIMIT_BURST").unwrap_or(defaults.rate_limit_burst),
            credential_ttl_secs: env_parse("CREDENTIAL_TTL_SECS")
                .unwrap_or(defaults.credential_ttl_secs),
            session_ttl_secs: env_parse("SESSION_TTL_SECS").unwrap_or(defaults.session_ttl_secs),
            cleanup_interval_secs: env_parse("CLEANUP_INTERVAL_SECS")
                .unwrap_or(defaults.cleanup_interval_secs),
            compat_mode,
        }
    }

    /// Get socket address from config
    pub fn socket_addr(&self) -> SocketAddr {
        SocketAddr::from((self.host, self.port))
    }

    /// Time to replenish one rate-limit token for `rate_limit_per_sec`
    pub fn rate_limit_period(&self) -> Duration {
        let per_sec = u32::try_from(self.rate_limit_per_sec.max(1)).unwrap_or(u32::MAX);
        (Duration::from_secs(1) / per_sec).max(Duration::from_nanos(1))
    }

    /// Store lifetimes and verification policy for the relying party
    pub fn relying_party_options(&self) -> RelyingPartyOptions {
        let policy = if self.compat_mode {
            VerificationPolicy::compatible()
        } else {
            VerificationPolicy::hardened()
        };
        RelyingPartyOptions {
            credential_ttl: Duration::from_secs(self.credential_ttl_secs),
            session_ttl: Duration::from_secs(self.session_ttl_secs),
            policy,
        }
    }
}

fn env_parse<T: std::str::FromStr>(name: &str) -> Option<T> {
    std::env::var(name).ok().and_then(|v| v.parse().ok())
}
