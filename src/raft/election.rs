//! Election timer, the election procedure, and the `RequestVote` receiver.

use std::sync::Arc;
use std::time::{Duration, Instant};

use futures::stream::FuturesUnordered;
use futures::StreamExt;
use rand::Rng;
use tracing::{debug, info, warn};

use super::log::term_at;
use super::rpc::{RequestVote, VoteResponse};
use super::state::Role;
use super::Replica;

/// While `role == Follower`, checks the election timeout every heartbeat
/// cadence and starts a new election once it elapses. Never runs two
/// elections concurrently -- the state mutex plus the `role == Candidate`
/// check inside `run_election` enforce that.
pub async fn election_timer_loop(replica: Arc<Replica>) {
    loop {
        tokio::time::sleep(replica.heartbeat_timeout).await;

        let should_start = {
            let state = replica.state.lock().await;
            state.role == Role::Follower
                && state.last_activity_time.elapsed() > replica.election_timeout
        };

        if should_start {
            {
                let mut state = replica.state.lock().await;
                state.role = Role::Candidate;
            }
            info!("election timeout elapsed, becoming candidate");
            run_election(replica.clone()).await;
        }
    }
}

/// Runs the election procedure until this replica wins, steps down, or is
/// no longer a candidate. Precondition: `role == Candidate`.
pub async fn run_election(replica: Arc<Replica>) {
    loop {
        let (request, current_term) = {
            let mut state = replica.state.lock().await;
            if state.role != Role::Candidate {
                return;
            }
            state.current_term += 1;
            state.voted_for = Some(state.node_id.clone());
            state.votes_received.clear();
            state.votes_received.insert(state.node_id.clone());

            let request = RequestVote {
                term: state.current_term,
                candidate_id: state.node_id.clone(),
                last_log_index: state.log.len() as u64,
                last_log_term: state.last_log_term(),
            };
            info!(term = state.current_term, "starting election and voting for myself");
            (request, state.current_term)
        };

        let peers = replica.state.lock().await.peers.clone();
        let mut in_flight: FuturesUnordered<_> = peers
            .iter()
            .map(|peer| {
                let client = replica.client.clone();
                let request = request.clone();
                let peer = peer.clone();
                async move { client.request_vote(&peer, &request).await }
            })
            .collect();

        let mut won = false;
        while let Some(response) = in_flight.next().await {
            let Some(response) = response else { continue };

            let mut state = replica.state.lock().await;
            if state.role != Role::Candidate {
                return;
            }

            if response.term == current_term && response.vote_granted {
                if !response.node_id.is_empty() {
                    state.votes_received.insert(response.node_id.clone());
                }
                if state.votes_received.len() >= state.majority {
                    state.role = Role::Leader;
                    state.current_leader = Some(state.node_id.clone());
                    state.touch();
                    state.init_leader_bookkeeping();
                    info!(term = state.current_term, "won election, becoming leader");
                    won = true;
                    break;
                }
            } else if response.term > current_term {
                state.current_term = response.term;
                state.role = Role::Follower;
                state.voted_for = None;
                state.touch();
                info!(term = state.current_term, "stepping down, saw higher term");
                return;
            }
            // Stale or rejected response: ignored.
        }

        if won {
            return;
        }

        if replica.state.lock().await.role != Role::Candidate {
            return;
        }

        let backoff = random_backoff(replica.election_timeout);
        debug!(?backoff, "election round ended without quorum, retrying");
        tokio::time::sleep(backoff).await;

        if replica.state.lock().await.role != Role::Candidate {
            return;
        }
    }
}

fn random_backoff(election_timeout: Duration) -> Duration {
    let lo = election_timeout.as_secs_f64();
    let hi = lo * 2.0;
    let secs = rand::thread_rng().gen_range(lo..hi);
    Duration::from_secs_f64(secs)
}

/// Decides the `RequestVote` RPC: a vote is granted only when the
/// candidate's log is at least as up to date as ours and we haven't
/// already voted for someone else this term.
pub async fn handle_request_vote(replica: &Replica, request: RequestVote) -> VoteResponse {
    let mut state = replica.state.lock().await;
    state.touch();

    let my_last_term = term_at(&state.log, state.log.len() as u64);
    let log_ok = request.last_log_term > my_last_term
        || (request.last_log_term == my_last_term && request.last_log_index >= state.log.len() as u64);
    let term_ok = request.term > state.current_term
        || (request.term == state.current_term
            && (state.voted_for.is_none()
                || state.voted_for.as_deref() == Some(request.candidate_id.as_str())));

    let vote_granted = log_ok && term_ok;

    if vote_granted {
        state.current_term = request.term;
        state.role = Role::Follower;
        state.voted_for = Some(request.candidate_id.clone());
    } else {
        warn!(candidate = %request.candidate_id, "rejecting vote request");
    }

    VoteResponse {
        node_id: if vote_granted { state.node_id.clone() } else { String::new() },
        term: state.current_term,
        vote_granted,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::raft::log::LogEntry;
    use std::time::Duration as StdDuration;

    fn replica(node_id: &str, peers: Vec<&str>) -> Replica {
        Replica::new(
            node_id.to_string(),
            peers.into_iter().map(String::from).collect(),
            8080,
            StdDuration::from_millis(50),
            StdDuration::from_millis(200),
        )
    }

    #[tokio::test]
    async fn fresh_vote_granted_on_higher_term() {
        let replica = replica("node1", vec!["node2", "node3"]);
        let response = handle_request_vote(
            &replica,
            RequestVote {
                term: 1,
                candidate_id: "node2".into(),
                last_log_index: 0,
                last_log_term: 0,
            },
        )
        .await;
        assert_eq!(response.node_id, "node1");
        assert_eq!(response.term, 1);
        assert!(response.vote_granted);

        let state = replica.state.lock().await;
        assert_eq!(state.current_term, 1);
        assert_eq!(state.voted_for.as_deref(), Some("node2"));
        assert_eq!(state.role, Role::Follower);
    }

    #[tokio::test]
    async fn vote_rejected_when_candidate_log_is_behind() {
        let replica = replica("node1", vec!["node2", "node3"]);
        {
            let mut state = replica.state.lock().await;
            state.log = vec![LogEntry::new(2, "m1")];
            state.current_term = 2;
        }
        let response = handle_request_vote(
            &replica,
            RequestVote {
                term: 2,
                candidate_id: "node2".into(),
                last_log_index: 0,
                last_log_term: 1,
            },
        )
        .await;
        assert_eq!(response.node_id, "");
        assert_eq!(response.term, 2);
        assert!(!response.vote_granted);

        let state = replica.state.lock().await;
        assert_eq!(state.voted_for, None);
    }

    #[tokio::test]
    async fn single_vote_per_term() {
        // Granting a vote for candidate "a" in term 1 must prevent a second,
        // different candidate from also getting a vote in term 1.
        let replica = replica("node1", vec!["node2", "node3"]);
        let first = handle_request_vote(
            &replica,
            RequestVote { term: 1, candidate_id: "node2".into(), last_log_index: 0, last_log_term: 0 },
        )
        .await;
        assert!(first.vote_granted);

        let second = handle_request_vote(
            &replica,
            RequestVote { term: 1, candidate_id: "node3".into(), last_log_index: 0, last_log_term: 0 },
        )
        .await;
        assert!(!second.vote_granted);
    }
}
