//! Cluster and timing configuration.
//!
//! Defaults mirror the reference implementation's constants (`T_hb =
//! 0.5s`, election timeout `[1.5s, 7s]`, client poll `~0.1s`).

use std::time::Duration;

/// Static cluster layout: every replica knows every peer's address at
/// start. Peer `i` is reachable at `host:base_port + i`.
#[derive(Debug, Clone)]
pub struct ClusterConfig {
    /// Total number of replicas in the cluster.
    pub node_count: usize,
    /// Host all replicas bind to / are reachable on.
    pub host: String,
    /// Base port; replica `i` listens on `base_port + i`.
    pub base_port: u16,
}

impl ClusterConfig {
    /// Build the base URL for peer `node_id`.
    pub fn peer_base_url(&self, node_id: usize) -> String {
        format!("http://{}:{}", self.host, self.base_port + node_id as u16)
    }

    /// Ids of every replica other than `node_id`.
    pub fn peers_of(&self, node_id: usize) -> Vec<usize> {
        (0..self.node_count).filter(|&id| id != node_id).collect()
    }
}

impl Default for ClusterConfig {
    fn default() -> Self {
        Self {
            node_count: 4,
            host: "localhost".to_string(),
            base_port: 6666,
        }
    }
}

/// Tunable timing for the election/heartbeat/polling loops.
#[derive(Debug, Clone)]
pub struct TimingConfig {
    /// Leader heartbeat interval (also the election-ticker interval).
    pub heartbeat_interval: Duration,
    /// Randomized election timeout range `[T_lo, T_hi]`.
    pub election_timeout_range: (Duration, Duration),
    /// Poll interval used by the client gateway while waiting for apply.
    pub client_poll_interval: Duration,
    /// Timeout for a single outbound peer RPC.
    pub rpc_timeout: Duration,
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            heartbeat_interval: Duration::from_millis(500),
            election_timeout_range: (Duration::from_millis(1500), Duration::from_millis(7000)),
            client_poll_interval: Duration::from_millis(100),
            rpc_timeout: Duration::from_millis(250),
        }
    }
}

/// Full configuration for one replica process.
#[derive(Debug, Clone, Default)]
pub struct ReplicaConfig {
    /// Cluster layout.
    pub cluster: ClusterConfig,
    /// Protocol timing.
    pub timing: TimingConfig,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn peer_base_url_offsets_by_node_id() {
        let cluster = ClusterConfig::default();
        assert_eq!(cluster.peer_base_url(0), "http://localhost:6666");
        assert_eq!(cluster.peer_base_url(2), "http://localhost:6668");
    }

    #[test]
    fn peers_of_excludes_self() {
        let cluster = ClusterConfig::default();
        assert_eq!(cluster.peers_of(1), vec![0, 2, 3]);
    }

    #[test]
    fn default_timing_matches_reference_constants() {
        let timing = TimingConfig::default();
        assert_eq!(timing.heartbeat_interval, Duration::from_millis(500));
        assert_eq!(
            timing.election_timeout_range,
            (Duration::from_millis(1500), Duration::from_millis(7000))
        );
    }
}
