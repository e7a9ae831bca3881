//! Wire types shared by the inbound HTTP handlers and the outbound peer client.

use serde::{Deserialize, Serialize};

use super::log::LogEntry;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RequestVote {
    pub term: u64,
    pub candidate_id: String,
    pub last_log_index: u64,
    pub last_log_term: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VoteResponse {
    /// Self's node id when the vote was granted, `""` otherwise -- lets the
    /// candidate attribute a granted vote to a specific peer and dedupe it
    /// in `votes_received`.
    pub node_id: String,
    pub term: u64,
    pub vote_granted: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppendEntries {
    pub term: u64,
    pub leader_id: String,
    /// Prefix length the leader assumes is already replicated on the receiver.
    pub log_length: u64,
    /// Term of the entry at position `log_length` (0 when `log_length == 0`).
    pub log_term: u64,
    pub entries: Vec<LogEntry>,
    pub leader_commit: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppendResponse {
    pub term: u64,
    pub ack: u64,
    pub success: bool,
}
