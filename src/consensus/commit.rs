//! Quorum detection over acknowledgments and commitment of log prefixes.

use tracing::info;

use super::state::{ReplicaState, Role};
use super::state_machine::apply_range;

/// `⌈(N+1)/2⌉`, the minimum number of acknowledging replicas (including
/// the leader) required to commit.
///
/// The reference implementation instead sums acknowledging node ids,
/// which is wrong whenever node 0 participates (it contributes nothing
/// to the sum) — see DESIGN.md Open Question O3. This crate counts.
pub fn quorum(node_count: usize) -> usize {
    (node_count + 2) / 2
}

/// Largest prefix length `k` such that at least `needed` replicas report
/// `acked_length >= k`, scanning from the end of the log backwards.
fn max_ready_prefix(state: &ReplicaState, needed: usize) -> usize {
    for k in (1..=state.log_length()).rev() {
        let acked = state.acked_length.values().filter(|&&len| len >= k).count();
        if acked >= needed {
            return k;
        }
    }
    0
}

/// Recompute the committable prefix and, if it has grown, apply the
/// newly committed entries and advance `commit_length`.
///
/// The "current-term" guard (`log[k-1].term == term`) prevents
/// committing prior-term entries by vote-counting alone, the classic
/// Raft safety requirement.
pub fn try_advance_commit(state: &mut ReplicaState, node_count: usize) {
    if state.role != Role::Leader {
        return;
    }

    let needed = quorum(node_count);
    let candidate = max_ready_prefix(state, needed);

    if candidate > state.commit_length && state.log[candidate - 1].term == state.term {
        let from = state.commit_length;
        apply_range(state, from, candidate);
        state.commit_length = candidate;
        info!(node_id = state.node_id, commit_length = candidate, "advanced commit index");
    }
}
