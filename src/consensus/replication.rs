//! Leader-initiated append-entries: follower reconciliation and
//! acknowledgment tracking.

use tracing::{debug, warn};

use crate::config::TimingConfig;
use crate::transport::messages::{AppendRequest, AppendResponse};

use super::commit::try_advance_commit;
use super::state::{ReplicaState, Role};
use super::state_machine::apply_range;

/// Build the append request the leader sends to `peer`, carrying
/// whatever suffix of the log the peer hasn't acknowledged yet.
pub fn build_append_request(state: &ReplicaState, peer: usize) -> AppendRequest {
    let sent = *state.sent_length.get(&peer).unwrap_or(&0);
    let prev_log_term = if sent > 0 { state.log[sent - 1].term } else { 0 };

    AppendRequest {
        leader_id: state.node_id,
        term: state.term,
        log_length: sent,
        prev_log_term,
        commit_length: state.commit_length,
        entries: state.log[sent..].to_vec(),
    }
}

/// Reconcile the local log against an incoming append request and reply
/// with whether it was accepted.
pub fn handle_append_request(
    state: &mut ReplicaState,
    request: AppendRequest,
    timing: &TimingConfig,
) -> AppendResponse {
    if request.term > state.term || (request.term == state.term && state.role == Role::Candidate) {
        state.step_down(request.term);
        state.leader_hint = Some(request.leader_id);
        state.reset_election_deadline(timing);
    }

    let log_ok = state.log_length() >= request.log_length
        && (request.log_length == 0 || request.prev_log_term == state.log[request.log_length - 1].term);

    let accepted = request.term == state.term && log_ok;
    let entries_len = request.entries.len();

    if accepted {
        state.leader_hint = Some(request.leader_id);
        state.reset_election_deadline(timing);
        append_entries(state, request.log_length, request.commit_length, request.entries);
    }

    AppendResponse {
        node_id: state.node_id,
        current_term: state.term,
        ack: if accepted { request.log_length + entries_len } else { 0 },
        status: accepted,
    }
}

/// Reconcile `state.log` with an incoming suffix and apply any newly
/// committed prefix.
///
/// Truncates to exactly `log_length` entries on a term mismatch at the
/// first overlapping entry (the reference implementation's truncation
/// expression, `log[0:len(log_length)]`, is malformed; DESIGN.md O4).
fn append_entries(
    state: &mut ReplicaState,
    log_length: usize,
    leader_commit: usize,
    entries: Vec<super::log::LogEntry>,
) {
    if !entries.is_empty() && state.log_length() > log_length {
        if state.log[log_length].term != entries[0].term {
            state.log.truncate(log_length);
        }
    }

    if log_length + entries.len() > state.log_length() {
        let already_present = state.log_length() - log_length;
        state.log.extend(entries.into_iter().skip(already_present));
    }

    if leader_commit > state.commit_length {
        let to = leader_commit.min(state.log_length());
        apply_range(state, state.commit_length, to);
        state.commit_length = to;
    }
}

/// What the leader should do after processing an append response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppendResponseAction {
    /// No follow-up send required.
    None,
    /// Back off `sent_length[peer]` by one and resend to `peer`.
    Resend(usize),
}

/// Process an append response at the leader: advance bookkeeping on
/// success, back off and retry on rejection, or step down on a higher
/// term.
pub fn handle_append_response(
    state: &mut ReplicaState,
    response: AppendResponse,
    node_count: usize,
) -> AppendResponseAction {
    if response.current_term > state.term {
        state.step_down(response.current_term);
        warn!(node_id = state.node_id, new_term = response.current_term, "stepped down on higher term");
        return AppendResponseAction::None;
    }

    if response.current_term != state.term || state.role != Role::Leader {
        return AppendResponseAction::None;
    }

    let peer = response.node_id;
    let prior_ack = *state.acked_length.get(&peer).unwrap_or(&0);

    if response.status && response.ack >= prior_ack {
        state.sent_length.insert(peer, response.ack);
        state.acked_length.insert(peer, response.ack);
        try_advance_commit(state, node_count);
        AppendResponseAction::None
    } else if !response.status {
        let sent = *state.sent_length.get(&peer).unwrap_or(&0);
        if sent > 0 {
            state.sent_length.insert(peer, sent - 1);
            debug!(node_id = state.node_id, peer, new_sent_length = sent - 1, "backing off sent_length");
            AppendResponseAction::Resend(peer)
        } else {
            AppendResponseAction::None
        }
    } else {
        AppendResponseAction::None
    }
}
