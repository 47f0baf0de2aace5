use std::net::SocketAddr;
use std::time::Duration;

use quill_protocol::{BasicAuth, DEFAULT_PATH};

/// RPC server settings.
#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub bind_addr: SocketAddr,
    /// URL path of the single RPC endpoint.
    pub path: String,
    /// Required credentials, if any.
    pub auth: Option<BasicAuth>,
    pub rate_limit: RateLimitConfig,
    pub request_timeout: Duration,
    /// Upper bound on draining open requests at shutdown.
    pub shutdown_timeout: Duration,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([127, 0, 0, 1], 8090)),
            path: DEFAULT_PATH.to_string(),
            auth: None,
            rate_limit: RateLimitConfig::default(),
            request_timeout: Duration::from_secs(5),
            shutdown_timeout: Duration::from_secs(10),
        }
    }
}

/// Per-client token bucket. A non-positive rate disables limiting.
#[derive(Clone, Debug, PartialEq)]
pub struct RateLimitConfig {
    pub requests_per_second: f64,
    pub burst: u64,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            requests_per_second: 5.0,
            burst: 10,
        }
    }
}

impl RateLimitConfig {
    pub fn unlimited() -> Self {
        Self {
            requests_per_second: 0.0,
            burst: 0,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.requests_per_second > 0.0
    }
}
