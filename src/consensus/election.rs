//! Randomized-timeout leader election: candidacy, vote granting, vote
//! collection, and the transition into leadership.

use tracing::info;

use crate::config::TimingConfig;
use crate::transport::messages::{RequestVoteRequest, RequestVoteResponse};

use super::commit::quorum;
use super::state::{ReplicaState, Role};

/// Whether a follower should give up waiting for a leader and start an
/// election.
pub fn should_start_election(state: &ReplicaState) -> bool {
    state.role == Role::Follower && std::time::Instant::now() > state.election_deadline
}

/// Begin candidacy for the next term and build the vote request to fan
/// out to every other replica.
pub fn start_election(state: &mut ReplicaState, timing: &TimingConfig) -> RequestVoteRequest {
    state.term += 1;
    state.role = Role::Candidate;
    state.voted_for = Some(state.node_id);
    state.votes_received.clear();
    state.votes_received.insert(state.node_id);
    state.reset_election_deadline(timing);

    info!(node_id = state.node_id, term = state.term, "starting election");

    RequestVoteRequest {
        node_id: state.node_id,
        term: state.term,
        log_length: state.log_length(),
        last_term: state.last_log_term(),
    }
}

/// Decide whether to grant a vote to a candidate, updating local state
/// as a side effect per spec.md §4.1.
pub fn handle_request_vote(
    state: &mut ReplicaState,
    request: RequestVoteRequest,
    timing: &TimingConfig,
) -> RequestVoteResponse {
    let my_last_term = state.last_log_term();
    let log_ok = request.last_term > my_last_term
        || (request.last_term == my_last_term && request.log_length >= state.log_length());
    let term_ok = request.term > state.term
        || (request.term == state.term && state.voted_for.map_or(true, |v| v == request.node_id));

    let vote_granted = log_ok && term_ok;

    if vote_granted {
        state.term = request.term;
        state.role = Role::Follower;
        state.voted_for = Some(request.node_id);
        state.reset_election_deadline(timing);
    }

    RequestVoteResponse {
        node_id: state.node_id,
        term: state.term,
        vote_granted,
    }
}

/// Outcome of processing a vote response, so the caller knows whether to
/// kick off replication (becoming leader is handled by the caller via
/// [`become_leader`]).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VoteOutcome {
    /// Nothing changed that the caller needs to act on.
    NoChange,
    /// This replica just won the election for the current term.
    BecameLeader,
}

/// Process a vote response: count it if still a relevant candidate, or
/// step down if the responder is in a later term.
pub fn handle_vote_response(
    state: &mut ReplicaState,
    response: RequestVoteResponse,
    node_count: usize,
) -> VoteOutcome {
    if response.term > state.term {
        state.step_down(response.term);
        return VoteOutcome::NoChange;
    }

    if state.role == Role::Candidate && response.term == state.term && response.vote_granted {
        state.votes_received.insert(response.node_id);
        if state.votes_received.len() >= quorum(node_count) {
            return VoteOutcome::BecameLeader;
        }
    }

    VoteOutcome::NoChange
}

/// Transition into leadership: reset per-peer bookkeeping so the first
/// replication round re-synchronizes every follower's log.
pub fn become_leader(state: &mut ReplicaState, peers: &[usize]) {
    state.role = Role::Leader;
    state.leader_hint = Some(state.node_id);

    state.sent_length.clear();
    state.acked_length.clear();
    for &peer in peers {
        state.sent_length.insert(peer, state.log_length());
        state.acked_length.insert(peer, 0);
    }
    state.acked_length.insert(state.node_id, state.log_length());

    info!(node_id = state.node_id, term = state.term, "became leader");
}

#[cfg(test)]
mod tests {
    use super::*;

    fn follower(node_id: usize) -> ReplicaState {
        ReplicaState::new(node_id, &TimingConfig::default())
    }

    #[test]
    fn starting_election_increments_term_and_votes_for_self() {
        let mut state = follower(0);
        let request = start_election(&mut state, &TimingConfig::default());

        assert_eq!(state.role, Role::Candidate);
        assert_eq!(state.term, 1);
        assert_eq!(state.voted_for, Some(0));
        assert!(state.votes_received.contains(&0));
        assert_eq!(request.term, 1);
        assert_eq!(request.node_id, 0);
    }

    #[test]
    fn grants_vote_when_log_and_term_are_ok() {
        let mut state = follower(1);
        let request = RequestVoteRequest { node_id: 0, term: 1, log_length: 0, last_term: 0 };
        let response = handle_request_vote(&mut state, request, &TimingConfig::default());

        assert!(response.vote_granted);
        assert_eq!(state.voted_for, Some(0));
        assert_eq!(state.term, 1);
    }

    #[test]
    fn refuses_second_vote_in_same_term_to_different_candidate() {
        let mut state = follower(1);
        let timing = TimingConfig::default();
        handle_request_vote(
            &mut state,
            RequestVoteRequest { node_id: 0, term: 1, log_length: 0, last_term: 0 },
            &timing,
        );
        let second = handle_request_vote(
            &mut state,
            RequestVoteRequest { node_id: 2, term: 1, log_length: 0, last_term: 0 },
            &timing,
        );

        assert!(!second.vote_granted);
        assert_eq!(state.voted_for, Some(0));
    }

    #[test]
    fn grants_vote_again_to_same_candidate_in_same_term() {
        // Idempotence: re-delivery of the same vote request must not be
        // refused just because a vote was already cast for that candidate.
        let mut state = follower(1);
        let timing = TimingConfig::default();
        let request = RequestVoteRequest { node_id: 0, term: 1, log_length: 0, last_term: 0 };
        handle_request_vote(&mut state, request.clone(), &timing);
        let second = handle_request_vote(&mut state, request, &timing);
        assert!(second.vote_granted);
    }

    #[test]
    fn refuses_vote_when_candidate_log_is_behind() {
        let mut state = follower(1);
        state.log.push(super::super::log::LogEntry {
            term: 5,
            command: super::super::log::Command::Put { key: "a".into(), value: "1".into() },
        });
        let request = RequestVoteRequest { node_id: 0, term: 6, log_length: 0, last_term: 0 };
        let response = handle_request_vote(&mut state, request, &TimingConfig::default());
        assert!(!response.vote_granted);
    }

    #[test]
    fn becomes_leader_once_quorum_of_votes_is_collected() {
        let mut state = follower(0);
        start_election(&mut state, &TimingConfig::default());

        let outcome = handle_vote_response(
            &mut state,
            RequestVoteResponse { node_id: 1, term: 1, vote_granted: true },
            4,
        );
        assert_eq!(outcome, VoteOutcome::NoChange, "two of four votes is not quorum yet");

        let outcome = handle_vote_response(
            &mut state,
            RequestVoteResponse { node_id: 2, term: 1, vote_granted: true },
            4,
        );
        assert_eq!(outcome, VoteOutcome::BecameLeader);
    }

    #[test]
    fn single_node_cluster_wins_its_own_election_immediately() {
        let mut state = follower(0);
        start_election(&mut state, &TimingConfig::default());
        assert!(state.votes_received.len() >= quorum(1), "self-vote alone is quorum for N=1");
    }

    #[test]
    fn higher_term_in_vote_response_forces_step_down() {
        let mut state = follower(0);
        start_election(&mut state, &TimingConfig::default());
        handle_vote_response(
            &mut state,
            RequestVoteResponse { node_id: 1, term: 99, vote_granted: false },
            4,
        );
        assert_eq!(state.role, Role::Follower);
        assert_eq!(state.term, 99);
        assert_eq!(state.voted_for, None);
    }

    #[test]
    fn become_leader_initializes_peer_bookkeeping() {
        let mut state = follower(0);
        state.log.push(super::super::log::LogEntry {
            term: 1,
            command: super::super::log::Command::Put { key: "a".into(), value: "1".into() },
        });
        become_leader(&mut state, &[1, 2, 3]);

        assert_eq!(state.role, Role::Leader);
        assert_eq!(state.leader_hint, Some(0));
        assert_eq!(state.sent_length[&1], 1);
        assert_eq!(state.acked_length[&1], 0);
        assert_eq!(state.acked_length[&0], 1);
    }
}
