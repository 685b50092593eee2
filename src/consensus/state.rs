//! Per-replica state: the durable-in-spirit variables plus volatile
//! leadership bookkeeping.
//!
//! `term`, `voted_for`, and `log` are NOT persisted to disk here; the
//! reference implementation this crate is built from treats them as
//! volatile too (see DESIGN.md, Open Question O2). The invariants below
//! hold only across crash-stop-without-recovery faults as a result.

use std::collections::{HashMap, HashSet};
use std::time::Instant;

use rand::Rng;
use uuid::Uuid;

use crate::config::TimingConfig;
use super::log::LogEntry;

/// The role a replica currently occupies in the consensus state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    /// Receiving appends/heartbeats from a leader (or waiting to time out).
    Follower,
    /// Soliciting votes for a new term.
    Candidate,
    /// Coordinating writes and replication for the current term.
    Leader,
}

/// All state held by one replica. Every mutation goes through a single
/// lock at the `Replica` layer; this struct itself enforces none of the
/// concurrency discipline, only the data and the invariants that depend
/// purely on its own fields.
pub struct ReplicaState {
    /// Stable identifier in `0..N`.
    pub node_id: usize,
    /// Monotonically non-decreasing term.
    pub term: u64,
    /// Who this replica voted for in `term`, if anyone.
    pub voted_for: Option<usize>,
    /// The replicated log, indexed from 0.
    pub log: Vec<LogEntry>,
    /// Prefix length known committed.
    pub commit_length: usize,
    /// Current role.
    pub role: Role,
    /// Last known leader, or `None` if unknown.
    pub leader_hint: Option<usize>,
    /// The applied key-value map.
    pub db: HashMap<String, String>,
    /// CAS outcomes keyed by request id. Kept separate from `db` rather
    /// than folded into the same `HashMap<String, String>` the source
    /// uses, since mixing string-valued and boolean-valued entries in one
    /// map is not an idiomatic Rust representation (DESIGN.md O1).
    pub cas_results: HashMap<Uuid, bool>,
    /// Leader-only: next index to send to each peer (= entries already sent).
    pub sent_length: HashMap<usize, usize>,
    /// Leader-only: highest prefix length each peer has confirmed.
    pub acked_length: HashMap<usize, usize>,
    /// Candidate-only: node ids that have granted this replica a vote.
    pub votes_received: HashSet<usize>,
    /// Absolute time after which a follower starts a new election.
    pub election_deadline: Instant,
}

impl ReplicaState {
    /// Construct a fresh follower state for `node_id`.
    pub fn new(node_id: usize, timing: &TimingConfig) -> Self {
        let mut state = Self {
            node_id,
            term: 0,
            voted_for: None,
            log: Vec::new(),
            commit_length: 0,
            role: Role::Follower,
            leader_hint: None,
            db: HashMap::new(),
            cas_results: HashMap::new(),
            sent_length: HashMap::new(),
            acked_length: HashMap::new(),
            votes_received: HashSet::new(),
            election_deadline: Instant::now(),
        };
        state.reset_election_deadline(timing);
        state
    }

    /// The term of the last log entry, or 0 if the log is empty.
    pub fn last_log_term(&self) -> u64 {
        self.log.last().map(|entry| entry.term).unwrap_or(0)
    }

    /// `|log|`, used throughout the protocol as "log length".
    pub fn log_length(&self) -> usize {
        self.log.len()
    }

    /// Reset the election deadline to `now + random(T_lo, T_hi)`.
    ///
    /// Called whenever a valid leader message is received, this replica
    /// grants a vote, or an election is started.
    pub fn reset_election_deadline(&mut self, timing: &TimingConfig) {
        let (lo, hi) = timing.election_timeout_range;
        let jitter_ms = rand::thread_rng().gen_range(lo.as_millis() as u64..=hi.as_millis() as u64);
        self.election_deadline = Instant::now() + std::time::Duration::from_millis(jitter_ms);
    }

    /// Step down to follower on observing a higher term. Clears the vote
    /// and candidate/leader-only bookkeeping; preserves `leader_hint`
    /// unless the caller overwrites it.
    pub fn step_down(&mut self, new_term: u64) {
        debug_assert!(new_term >= self.term);
        self.term = new_term;
        self.role = Role::Follower;
        self.voted_for = None;
        self.votes_received.clear();
        self.sent_length.clear();
        self.acked_length.clear();
    }
}
