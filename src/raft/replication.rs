//! The `AppendEntries` receiver, the leader's replicate/heartbeat loop, and
//! commit-advance.

use std::sync::Arc;

use tracing::{debug, info, warn};

use super::log::{self, term_at};
use super::rpc::{AppendEntries, AppendResponse};
use super::state::Role;
use super::Replica;

/// Decides the `AppendEntries` RPC.
pub async fn handle_append_entries(replica: &Replica, request: AppendEntries) -> AppendResponse {
    let mut state = replica.state.lock().await;
    state.touch();

    if request.term > state.current_term {
        state.current_term = request.term;
        state.voted_for = None;
        state.role = Role::Follower;
        state.current_leader = Some(request.leader_id.clone());
        info!(term = state.current_term, "adopting higher term from append_entries");
    }

    if request.term == state.current_term && state.role == Role::Candidate {
        state.role = Role::Follower;
        state.current_leader = Some(request.leader_id.clone());
    }

    let my_log_term = term_at(&state.log, request.log_length);
    let log_ok = state.log.len() as u64 >= request.log_length
        && (request.log_length == 0 || my_log_term == request.log_term);

    if request.term == state.current_term && log_ok {
        log::append_entries(
            &mut state.log,
            &mut state.commit_length,
            &mut state.state_machine,
            request.log_length,
            request.leader_commit,
            &request.entries,
        );
        let ack = request.log_length + request.entries.len() as u64;
        AppendResponse { term: state.current_term, ack, success: true }
    } else {
        AppendResponse { term: state.current_term, ack: 0, success: false }
    }
}

/// While `role == Leader`, sends heartbeats (empty-entries `AppendEntries`,
/// which doubles as a full replication round) at `heartbeat_timeout`
/// cadence.
pub async fn heartbeat_loop(replica: Arc<Replica>) {
    loop {
        let is_leader = replica.state.lock().await.role == Role::Leader;
        if !is_leader {
            tokio::time::sleep(replica.heartbeat_timeout).await;
            continue;
        }

        let due = {
            let state = replica.state.lock().await;
            state.last_activity_time.elapsed() >= replica.heartbeat_timeout
        };

        if due {
            {
                let mut state = replica.state.lock().await;
                state.touch();
            }
            debug!("sending heartbeat to all peers");
            replicate_all(&replica).await;
        } else {
            let remaining = {
                let state = replica.state.lock().await;
                replica
                    .heartbeat_timeout
                    .saturating_sub(state.last_activity_time.elapsed())
            };
            tokio::time::sleep(remaining).await;
        }
    }
}

/// Fans `replicate_one` out to every peer concurrently, awaiting completion
/// of all of them (used by the heartbeat loop, which doesn't need the
/// individual results).
pub async fn replicate_all(replica: &Replica) {
    let peers = replica.state.lock().await.peers.clone();
    let mut tasks = Vec::with_capacity(peers.len());
    for peer in peers {
        tasks.push(replicate_one(replica, peer));
    }
    futures::future::join_all(tasks).await;
}

/// Replicates the log to a single follower, retrying on log mismatch by
/// decrementing `sent_length`. Returns whether the follower is now caught
/// up (`success == true` on the final response) -- the leader's
/// client-command quorum counter uses this.
pub async fn replicate_one(replica: &Replica, peer: String) -> bool {
    loop {
        let request = {
            let state = replica.state.lock().await;
            if state.role != Role::Leader {
                return false;
            }
            let length = *state.sent_length.get(&peer).unwrap_or(&0);
            AppendEntries {
                term: state.current_term,
                leader_id: state.node_id.clone(),
                log_length: length,
                log_term: term_at(&state.log, length),
                entries: state.log[length as usize..].to_vec(),
                leader_commit: state.commit_length,
            }
        };

        let Some(response) = replica.client.append_entries(&peer, &request).await else {
            return false;
        };

        let mut state = replica.state.lock().await;
        if response.term > state.current_term {
            state.current_term = response.term;
            state.role = Role::Follower;
            state.voted_for = None;
            info!(term = state.current_term, "stepping down, follower has higher term");
            return false;
        }

        if response.term != state.current_term || state.role != Role::Leader {
            return false;
        }

        if response.success && response.ack >= *state.acked_length.get(&peer).unwrap_or(&0) {
            state.sent_length.insert(peer.clone(), response.ack);
            state.acked_length.insert(peer.clone(), response.ack);
            commit_advance(&mut state);
            return true;
        }

        let sent = state.sent_length.get(&peer).copied().unwrap_or(0);
        if sent > 0 {
            state.sent_length.insert(peer.clone(), sent - 1);
            drop(state);
            warn!(%peer, "append_entries rejected, retrying with shorter prefix");
            continue;
        }

        return false;
    }
}

/// Advances `commit_length` as far as a majority of `acked_length` permits,
/// bound by the rule that a leader only commits entries from its own
/// current term.
pub fn commit_advance(state: &mut super::ReplicaState) {
    let ready: Vec<u64> = (1..=state.log.len() as u64)
        .filter(|&r| state.acks(r) >= state.majority)
        .collect();

    let Some(&r) = ready.iter().max() else { return };

    if r > state.commit_length && term_at(&state.log, r) == state.current_term {
        log::apply_range(&state.log, &mut state.state_machine, state.commit_length, r);
        state.commit_length = r;
    }
}
