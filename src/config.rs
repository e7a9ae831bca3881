//! Environment-driven configuration, loaded through the `config` crate's
//! `Environment` source rather than ad-hoc `std::env::var` calls.

use std::time::Duration;

use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
struct RawConfig {
    #[serde(default = "default_heartbeat_timeout")]
    heartbeat_timeout: f64,
    #[serde(default = "default_election_timeout")]
    election_timeout: f64,
    #[serde(default = "default_cluster_size")]
    cluster_size: usize,
    #[serde(default = "default_http_port")]
    http_port: u16,
    node_id: Option<String>,
    peers: Option<String>,
}

fn default_heartbeat_timeout() -> f64 {
    1.0
}
fn default_election_timeout() -> f64 {
    5.0
}
fn default_cluster_size() -> usize {
    3
}
fn default_http_port() -> u16 {
    8080
}

#[derive(Debug, Clone)]
pub struct NodeConfig {
    pub node_id: String,
    pub peers: Vec<String>,
    pub http_port: u16,
    pub heartbeat_timeout: Duration,
    pub election_timeout: Duration,
}

impl NodeConfig {
    pub fn load() -> anyhow::Result<Self> {
        let raw: RawConfig = config::Config::builder()
            .add_source(config::Environment::default().try_parsing(true))
            .build()?
            .try_deserialize()?;

        let node_id = raw.node_id.unwrap_or_else(|| {
            std::env::var("HOSTNAME").unwrap_or_else(|_| "raft-node-1".to_string())
        });

        let peers = match raw.peers {
            Some(list) => list
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(String::from)
                .collect(),
            None => default_peers(&node_id, raw.cluster_size),
        };

        Ok(NodeConfig {
            node_id,
            peers,
            http_port: raw.http_port,
            heartbeat_timeout: Duration::from_secs_f64(raw.heartbeat_timeout),
            election_timeout: Duration::from_secs_f64(raw.election_timeout),
        })
    }
}

/// `raft-node-1..N`, excluding whichever name matches this replica's own
/// id. Hostname/IP resolution is intentionally not attempted here -- peers
/// are addressed by this naming convention directly.
fn default_peers(node_id: &str, cluster_size: usize) -> Vec<String> {
    (1..=cluster_size)
        .map(|i| format!("raft-node-{i}"))
        .filter(|name| name != node_id)
        .collect()
}
