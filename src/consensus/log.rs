//! Log entries and the state-machine commands they carry.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A single state-machine command. Modeled as a tagged sum rather than a
/// loose `{action, key, value, old_value, new_value, request_id}` record
/// so that each variant only carries the fields it needs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Command {
    /// Create or overwrite `key`.
    Put {
        /// Key to write.
        key: String,
        /// Value to store.
        value: String,
    },
    /// Remove `key`. A no-op at apply time if the key is absent.
    Delete {
        /// Key to remove.
        key: String,
    },
    /// Compare-and-swap: set `key` to `new_value` iff its current value
    /// equals `old_value`. The outcome is recorded under `request_id`.
    Cas {
        /// Key to compare and conditionally swap.
        key: String,
        /// Expected current value.
        old_value: String,
        /// Value to install if the comparison succeeds.
        new_value: String,
        /// Globally unique token identifying this CAS attempt.
        request_id: Uuid,
    },
}

/// One entry in the replicated log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogEntry {
    /// Leader term at which this entry was appended.
    pub term: u64,
    /// The command being replicated.
    pub command: Command,
}
