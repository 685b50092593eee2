//! In-process multi-replica harness: drives the `consensus::*` free
//! functions directly across a `Vec<ReplicaState>`, with message
//! delivery controlled by the test instead of going over real sockets.

use ferrium_raft::config::TimingConfig;
use ferrium_raft::consensus::log::{Command, LogEntry};
use ferrium_raft::consensus::state::ReplicaState;
use ferrium_raft::consensus::{commit, election, replication, state_machine, Role};

/// A small cluster of `ReplicaState`s with manual message delivery, so
/// tests can script partitions, drops, and out-of-order delivery.
pub struct Cluster {
    pub states: Vec<ReplicaState>,
    pub timing: TimingConfig,
    pub node_count: usize,
    partitioned: Vec<bool>,
}

impl Cluster {
    pub fn new(node_count: usize) -> Self {
        let timing = TimingConfig::default();
        let states = (0..node_count).map(|id| ReplicaState::new(id, &timing)).collect();
        Self { states, timing, node_count, partitioned: vec![false; node_count] }
    }

    /// Cut `node` off from the rest of the cluster: its outbound and
    /// inbound messages are dropped.
    pub fn partition(&mut self, node: usize) {
        self.partitioned[node] = true;
    }

    pub fn heal(&mut self, node: usize) {
        self.partitioned[node] = false;
    }

    fn reachable(&self, from: usize, to: usize) -> bool {
        !self.partitioned[from] && !self.partitioned[to]
    }

    /// `candidate` starts an election, solicits every reachable peer,
    /// and is promoted to leader in-place if it reaches quorum.
    pub fn elect(&mut self, candidate: usize) {
        let request = election::start_election(&mut self.states[candidate], &self.timing);

        for peer in 0..self.node_count {
            if peer == candidate || !self.reachable(candidate, peer) {
                continue;
            }
            let response = election::handle_request_vote(&mut self.states[peer], request.clone(), &self.timing);
            if !self.reachable(peer, candidate) {
                continue;
            }
            let node_count = self.node_count;
            let outcome = election::handle_vote_response(&mut self.states[candidate], response, node_count);
            if outcome == election::VoteOutcome::BecameLeader {
                let peers: Vec<usize> = (0..self.node_count).filter(|&p| p != candidate).collect();
                election::become_leader(&mut self.states[candidate], &peers);
            }
        }
    }

    /// Leader `leader` appends `command` locally, then replicates for up
    /// to `rounds` rounds or until the entry commits, whichever first.
    pub fn propose(&mut self, leader: usize, command: Command, rounds: usize) {
        let term = self.states[leader].term;
        self.states[leader].log.push(LogEntry { term, command });
        let log_length = self.states[leader].log_length();
        self.states[leader].acked_length.insert(leader, log_length);
        commit::try_advance_commit(&mut self.states[leader], self.node_count);

        for _ in 0..rounds {
            if self.states[leader].commit_length >= log_length {
                break;
            }
            self.replicate_round(leader);
        }
    }

    /// Run one round of append-entries from `leader` to every reachable
    /// peer, retrying once immediately on rejection (enough to make the
    /// backoff-until-common-prefix loop converge within a test's bound).
    pub fn replicate_round(&mut self, leader: usize) {
        for peer in 0..self.node_count {
            if peer == leader || !self.reachable(leader, peer) {
                continue;
            }
            self.replicate_once(leader, peer);
        }
    }

    fn replicate_once(&mut self, leader: usize, peer: usize) {
        let request = replication::build_append_request(&self.states[leader], peer);
        let response = replication::handle_append_request(&mut self.states[peer], request, &self.timing);
        if !self.reachable(peer, leader) {
            return;
        }
        let node_count = self.node_count;
        let action = replication::handle_append_response(&mut self.states[leader], response, node_count);
        if let replication::AppendResponseAction::Resend(retry_peer) = action {
            self.replicate_once(leader, retry_peer);
        }
    }

    pub fn leader(&self) -> Option<usize> {
        self.states.iter().position(|s| s.role == Role::Leader)
    }

    pub fn apply_range_for_test(&mut self, node: usize, from: usize, to: usize) {
        state_machine::apply_range(&mut self.states[node], from, to);
    }
}
