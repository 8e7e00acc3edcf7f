//! Outbound HTTP client with hardened defaults.
//!
//! # Design Decisions
//! - Every phase of a request has a bound; a default client waits forever
//! - Idle connections are pooled and reused, then expire
//! - Proxy settings come from the environment (`HTTP_PROXY` and friends)

use std::time::Duration;

pub const CONNECT_TIMEOUT: Duration = Duration::from_millis(500);
pub const TCP_KEEPALIVE: Duration = Duration::from_secs(30);
pub const POOL_IDLE_TIMEOUT: Duration = Duration::from_secs(300);
pub const POOL_MAX_IDLE_PER_HOST: usize = 100;
pub const READ_TIMEOUT: Duration = Duration::from_secs(5);

/// Builder preloaded with the hardened defaults, for callers that need to
/// adjust something (extra headers, no proxy) before building.
pub fn client_builder() -> reqwest::ClientBuilder {
    reqwest::Client::builder()
        .connect_timeout(CONNECT_TIMEOUT)
        .tcp_keepalive(TCP_KEEPALIVE)
        .pool_idle_timeout(POOL_IDLE_TIMEOUT)
        .pool_max_idle_per_host(POOL_MAX_IDLE_PER_HOST)
        .read_timeout(READ_TIMEOUT)
}

/// Build a `reqwest::Client` with timeouts and pooling configured.
pub fn new_client() -> reqwest::Result<reqwest::Client> {
    client_builder().build()
}
