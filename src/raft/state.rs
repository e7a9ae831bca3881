//! The single piece of shared mutable data in a replica.
//!
//! All fields are owned by exactly one `ReplicaState`; peers are referenced
//! only by id. The struct carries no behavior beyond the small helpers that
//! every caller in `election` / `replication` / the HTTP handlers needs --
//! the protocol logic itself lives in those modules so each can be read
//! (and tested) against one responsibility at a time.

use std::collections::{HashMap, HashSet};
use std::time::Instant;

use super::log::LogEntry;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Follower,
    Candidate,
    Leader,
}

pub struct ReplicaState {
    pub node_id: String,
    pub peers: Vec<String>,
    pub majority: usize,

    pub role: Role,
    pub current_term: u64,
    pub voted_for: Option<String>,
    pub log: Vec<LogEntry>,
    pub commit_length: u64,
    pub state_machine: String,

    pub votes_received: HashSet<String>,
    pub current_leader: Option<String>,
    pub sent_length: HashMap<String, u64>,
    pub acked_length: HashMap<String, u64>,

    pub last_activity_time: Instant,
}

impl ReplicaState {
    pub fn new(node_id: String, peers: Vec<String>) -> Self {
        let majority = (peers.len() + 1) / 2 + 1;
        ReplicaState {
            node_id,
            peers,
            majority,
            role: Role::Follower,
            current_term: 0,
            voted_for: None,
            log: Vec::new(),
            commit_length: 0,
            state_machine: "_".to_string(),
            votes_received: HashSet::new(),
            current_leader: None,
            sent_length: HashMap::new(),
            acked_length: HashMap::new(),
            last_activity_time: Instant::now(),
        }
    }

    pub fn last_log_term(&self) -> u64 {
        super::log::last_log_term(&self.log)
    }

    pub fn touch(&mut self) {
        self.last_activity_time = Instant::now();
    }

    /// Resets the leader's per-peer replication bookkeeping at election-won
    /// time: `sent_length` optimistically assumes every peer is fully
    /// caught up, `acked_length` assumes nothing has been confirmed.
    pub fn init_leader_bookkeeping(&mut self) {
        let log_len = self.log.len() as u64;
        for peer in self.peers.clone() {
            self.sent_length.insert(peer.clone(), log_len);
            self.acked_length.insert(peer, 0);
        }
    }

    /// Quorum tally for commit-advance: the leader always counts itself as
    /// acked up to `|log|`.
    pub fn acks(&self, length: u64) -> usize {
        let self_acked = self.log.len() as u64 >= length;
        let peer_acked = self.peers.iter().filter(|p| {
            self.acked_length.get(p.as_str()).copied().unwrap_or(0) >= length
        }).count();
        peer_acked + usize::from(self_acked)
    }

    pub fn status_report(&self) -> String {
        format!(
            "Role: {:?}\n\
             Node: {}\n\
             Term: {}\n\
             Log : {:?}\n\
             -\n\
             Commit Length: {}\n\
             Sent Length: {:?}\n\
             Acked Length: {:?}\n\
             State Machine: {}\n\
             Current Leader: {}\n\
             Voted For: {}\n",
            self.role,
            self.node_id,
            self.current_term,
            self.log,
            self.commit_length,
            self.sent_length,
            self.acked_length,
            self.state_machine,
            self.current_leader.as_deref().unwrap_or("(none)"),
            self.voted_for.as_deref().unwrap_or("(none)"),
        )
    }
}
