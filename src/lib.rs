//! A replicated key-value store built on a leader-based consensus
//! core: randomized-timeout election, log replication with quorum
//! commitment, and a deterministic apply step, exposed over HTTP.
//!
//! The consensus core lives in [`consensus`]; [`transport`] carries
//! peer RPCs over HTTP/JSON, and [`server`] exposes the client-facing
//! key-value API plus the peer-facing `/raft/*` endpoints on top of it.

pub mod config;
pub mod consensus;
pub mod error;
pub mod server;
pub mod transport;

pub mod prelude {
    //! Common imports for binaries embedding this crate.
    pub use crate::config::{ClusterConfig, ReplicaConfig, TimingConfig};
    pub use crate::consensus::{Command, GatewayOutcome, Replica, ReplicaStatus, Role};
    pub use crate::error::RaftError;
}
