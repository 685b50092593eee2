//! Wire messages exchanged between replicas. These are the JSON bodies
//! of the `/raft/*` endpoints in spec.md §6.

use serde::{Deserialize, Serialize};

use crate::consensus::log::LogEntry;

/// `peer -> peer`, candidate soliciting a vote.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RequestVoteRequest {
    /// Candidate's id.
    pub node_id: usize,
    /// Candidate's term.
    pub term: u64,
    /// Candidate's `|log|`.
    pub log_length: usize,
    /// Term of the candidate's last log entry, or 0.
    pub last_term: u64,
}

/// `peer -> peer`, response to [`RequestVoteRequest`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RequestVoteResponse {
    /// Responder's id.
    pub node_id: usize,
    /// Responder's (possibly updated) term.
    pub term: u64,
    /// Whether the vote was granted.
    pub vote_granted: bool,
}

/// `leader -> follower`, replication/heartbeat.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppendRequest {
    /// Leader's id.
    pub leader_id: usize,
    /// Leader's term.
    pub term: u64,
    /// Prefix length the follower is expected to already hold.
    pub log_length: usize,
    /// Term of the entry immediately before `log_length`, or 0.
    pub prev_log_term: u64,
    /// Leader's current commit length.
    pub commit_length: usize,
    /// New entries to append (may be empty for a pure heartbeat).
    pub entries: Vec<LogEntry>,
}

/// `follower -> leader`, response to [`AppendRequest`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppendResponse {
    /// Responder's id.
    pub node_id: usize,
    /// Responder's current term.
    pub current_term: u64,
    /// `log_length + entries.len()` if accepted, else 0.
    pub ack: usize,
    /// Whether the append was accepted.
    pub status: bool,
}
