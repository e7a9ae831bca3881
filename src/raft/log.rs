//! The replicated log and the append/commit helpers shared by the
//! AppendEntries receiver and the leader's own commit-advance.

use serde::{Deserialize, Serialize};

/// One entry of the log: `(term, command)`. Serializes as a two-element
/// JSON array (`[term, command]`) to match the RPC wire contract.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogEntry(pub u64, pub String);

impl LogEntry {
    pub fn new(term: u64, command: impl Into<String>) -> Self {
        LogEntry(term, command.into())
    }

    pub fn term(&self) -> u64 {
        self.0
    }

    pub fn command(&self) -> &str {
        &self.1
    }
}

/// The term of the entry at 1-based `length` (0 when `length == 0`), the
/// single translation point between the external length-prefix convention
/// and the 0-indexed `Vec` storage.
pub fn term_at(log: &[LogEntry], length: u64) -> u64 {
    if length == 0 {
        0
    } else {
        log[length as usize - 1].term()
    }
}

pub fn last_log_term(log: &[LogEntry]) -> u64 {
    term_at(log, log.len() as u64)
}

/// Applies the AppendEntries conflict-truncation, append, and bounded
/// commit-advance rules to `log`/`state_machine`.
///
/// `leader_commit` is bounded by the (possibly just-extended) log length
/// before being used to slice committed entries, so an out-of-range
/// `leader_commit` can never index past what was actually appended.
///
/// Truncating below `commit_length` would silently discard an already
/// committed entry; that can never be a legitimate conflict resolution, so
/// it panics rather than repairing itself.
pub fn append_entries(
    log: &mut Vec<LogEntry>,
    commit_length: &mut u64,
    state_machine: &mut String,
    length: u64,
    leader_commit: u64,
    entries: &[LogEntry],
) {
    if !entries.is_empty() && log.len() as u64 > length {
        if log[length as usize].term() != entries[0].term() {
            if length < *commit_length {
                unreachable!(
                    "refusing to truncate log to length {length}, below commit_length {commit_length}"
                );
            }
            log.truncate(length as usize);
        }
    }

    if length + entries.len() as u64 > log.len() as u64 {
        let already = log.len() as u64 - length;
        log.extend(entries.iter().skip(already as usize).cloned());
    }

    let bounded_commit = leader_commit.min(log.len() as u64);
    if bounded_commit > *commit_length {
        apply_range(log, state_machine, *commit_length, bounded_commit);
        *commit_length = bounded_commit;
    }
}

/// Appends `log[commit_length..target].command` to `state_machine`, each
/// followed by the `_` delimiter.
pub fn apply_range(log: &[LogEntry], state_machine: &mut String, from: u64, to: u64) {
    for entry in &log[from as usize..to as usize] {
        state_machine.push_str(entry.command());
        state_machine.push('_');
    }
}
