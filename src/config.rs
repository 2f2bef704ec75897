//! Configuration Module
//!
//! Handles loading and managing node configuration from environment variables.

use std::env;

use crate::cache::EvictionPolicy;

/// Virtual nodes per peer on the hash ring.
pub const DEFAULT_REPLICAS: usize = 50;

/// Node configuration parameters.
///
/// All values can be configured via environment variables with sensible defaults.
#[derive(Debug, Clone)]
pub struct Config {
    /// Name of the group this node serves
    pub group_name: String,
    /// Byte budget of the group's cache (0 = unbounded)
    pub cache_bytes: u64,
    /// Eviction policy of the group's cache
    pub eviction_policy: EvictionPolicy,
    /// Virtual nodes per peer
    pub replicas: usize,
    /// Port the peer endpoint listens on
    pub server_port: u16,
    /// This node's address as the other peers see it
    pub self_addr: String,
    /// Every peer in the cluster, this node included
    pub peers: Vec<String>,
    /// Port of the front-end API server, if enabled
    pub api_port: Option<u16>,
}

impl Config {
    /// Creates a new Config by loading values from environment variables.
    ///
    /// # Environment Variables
    /// - `GROUP_NAME` - Group served by this node (default: scores)
    /// - `CACHE_BYTES` - Cache byte budget, 0 = unbounded (default: 2048)
    /// - `EVICTION_POLICY` - `lru` or `lfu` (default: lru)
    /// - `REPLICAS` - Virtual nodes per peer (default: 50)
    /// - `SERVER_PORT` - Peer endpoint port (default: 8001)
    /// - `SELF_ADDR` - This node's base URL (default: http://localhost:SERVER_PORT)
    /// - `PEERS` - Comma-separated peer base URLs (default: SELF_ADDR)
    /// - `API_PORT` - Front-end API port; the API is off when unset
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let server_port = parse_var("SERVER_PORT").unwrap_or(defaults.server_port);
        let self_addr = env::var("SELF_ADDR")
            .ok()
            .map(|v| v.trim().trim_end_matches('/').to_string())
            .filter(|v| !v.is_empty())
            .unwrap_or_else(|| format!("http://localhost:{}", server_port));
        let peers = env::var("PEERS")
            .ok()
            .map(|v| parse_peers(&v))
            .filter(|p| !p.is_empty())
            .unwrap_or_else(|| vec![self_addr.clone()]);

        Self {
            group_name: env::var("GROUP_NAME")
                .ok()
                .filter(|v| !v.is_empty())
                .unwrap_or(defaults.group_name),
            cache_bytes: parse_var("CACHE_BYTES").unwrap_or(defaults.cache_bytes),
            eviction_policy: parse_var("EVICTION_POLICY").unwrap_or(defaults.eviction_policy),
            replicas: parse_var("REPLICAS")
                .filter(|r| *r > 0)
                .unwrap_or(defaults.replicas),
            server_port,
            self_addr,
            peers,
            api_port: parse_var("API_PORT"),
        }
    }
}

fn parse_var<T: std::str::FromStr>(name: &str) -> Option<T> {
    env::var(name).ok().and_then(|v| v.trim().parse().ok())
}

/// Splits a comma-separated peer list, dropping blanks and trailing slashes.
fn parse_peers(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|p| p.trim().trim_end_matches('/'))
        .filter(|p| !p.is_empty())
        .map(str::to_string)
        .collect()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            group_name: "scores".to_string(),
            cache_bytes: 2 << 10,
            eviction_policy: EvictionPolicy::Lru,
            replicas: DEFAULT_REPLICAS,
            server_port: 8001,
            self_addr: "http://localhost:8001".to_string(),
            peers: vec!["http://localhost:8001".to_string()],
            api_port: None,
        }
    }
}
