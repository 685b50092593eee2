//! Deterministic application of committed log entries to the key-value
//! map.
//!
//! Applying the same entry on every replica, strictly in increasing
//! index order, is what makes the committed prefix identical across the
//! cluster (invariants 5 and 7 in spec.md §3/§8).

use super::log::Command;
use super::state::ReplicaState;

/// Apply a single command to `state.db`/`state.cas_results`.
fn apply_command(state: &mut ReplicaState, command: &Command) {
    match command {
        Command::Put { key, value } => {
            state.db.insert(key.clone(), value.clone());
        }
        Command::Delete { key } => {
            // Deleting an absent key is a no-op, not an error: every
            // replica must reach the same `db` regardless of whether it
            // already observed the key, which rules out surfacing a
            // missing-key failure here.
            state.db.remove(key);
        }
        Command::Cas { key, old_value, new_value, request_id } => {
            let ok = state.db.get(key) == Some(old_value);
            state.cas_results.insert(*request_id, ok);
            if ok {
                state.db.insert(key.clone(), new_value.clone());
            }
        }
    }
}

/// Apply every entry in `[from, to)` to the state machine, in order.
///
/// Callers are responsible for only ever widening `commit_length` after
/// calling this, and for calling it with strictly increasing `to` values
/// so each entry is applied exactly once.
pub fn apply_range(state: &mut ReplicaState, from: usize, to: usize) {
    for index in from..to {
        let command = state.log[index].command.clone();
        apply_command(state, &command);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TimingConfig;
    use uuid::Uuid;

    fn entry(term: u64, command: Command) -> super::super::log::LogEntry {
        super::super::log::LogEntry { term, command }
    }

    fn fresh_state() -> ReplicaState {
        ReplicaState::new(0, &TimingConfig::default())
    }

    #[test]
    fn put_then_update_overwrites_value() {
        let mut state = fresh_state();
        state.log.push(entry(1, Command::Put { key: "a".into(), value: "1".into() }));
        state.log.push(entry(1, Command::Put { key: "a".into(), value: "2".into() }));
        apply_range(&mut state, 0, 2);
        assert_eq!(state.db.get("a"), Some(&"2".to_string()));
    }

    #[test]
    fn delete_of_absent_key_is_a_no_op() {
        let mut state = fresh_state();
        state.log.push(entry(1, Command::Delete { key: "missing".into() }));
        apply_range(&mut state, 0, 1);
        assert!(!state.db.contains_key("missing"));
    }

    #[test]
    fn delete_removes_existing_key() {
        let mut state = fresh_state();
        state.log.push(entry(1, Command::Put { key: "a".into(), value: "1".into() }));
        state.log.push(entry(1, Command::Delete { key: "a".into() }));
        apply_range(&mut state, 0, 2);
        assert!(!state.db.contains_key("a"));
    }

    #[test]
    fn cas_succeeds_when_old_value_matches() {
        let mut state = fresh_state();
        let id = Uuid::new_v4();
        state.log.push(entry(1, Command::Put { key: "k".into(), value: "v1".into() }));
        state.log.push(entry(
            1,
            Command::Cas { key: "k".into(), old_value: "v1".into(), new_value: "v2".into(), request_id: id },
        ));
        apply_range(&mut state, 0, 2);
        assert_eq!(state.db.get("k"), Some(&"v2".to_string()));
        assert_eq!(state.cas_results.get(&id), Some(&true));
    }

    #[test]
    fn cas_fails_when_old_value_does_not_match() {
        let mut state = fresh_state();
        let id = Uuid::new_v4();
        state.log.push(entry(1, Command::Put { key: "k".into(), value: "v1".into() }));
        state.log.push(entry(
            1,
            Command::Cas { key: "k".into(), old_value: "wrong".into(), new_value: "v2".into(), request_id: id },
        ));
        apply_range(&mut state, 0, 2);
        assert_eq!(state.db.get("k"), Some(&"v1".to_string()));
        assert_eq!(state.cas_results.get(&id), Some(&false));
    }

    #[test]
    fn cas_on_absent_key_fails_deterministically() {
        let mut state = fresh_state();
        let id = Uuid::new_v4();
        state.log.push(entry(
            1,
            Command::Cas { key: "missing".into(), old_value: "x".into(), new_value: "y".into(), request_id: id },
        ));
        apply_range(&mut state, 0, 1);
        assert_eq!(state.cas_results.get(&id), Some(&false));
        assert!(!state.db.contains_key("missing"));
    }

    #[test]
    fn apply_range_is_order_sensitive() {
        let mut state = fresh_state();
        state.log.push(entry(1, Command::Put { key: "a".into(), value: "1".into() }));
        state.log.push(entry(1, Command::Delete { key: "a".into() }));
        state.log.push(entry(1, Command::Put { key: "a".into(), value: "3".into() }));
        apply_range(&mut state, 0, 3);
        assert_eq!(state.db.get("a"), Some(&"3".to_string()));
    }
}
