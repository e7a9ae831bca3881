//! The axum `Router` and its handlers: `GET /` (status), `POST /` (client
//! command), `POST /request_vote`, `POST /append_entries`.

use std::sync::Arc;

use axum::extract::{rejection::JsonRejection, State};
use axum::routing::{get, post};
use axum::{Json, Router};
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::error::AppError;
use crate::raft::replication::{self, replicate_one};
use crate::raft::rpc::{AppendEntries, AppendResponse, RequestVote, VoteResponse};
use crate::raft::{election, Replica, Role};

pub fn router(replica: Arc<Replica>) -> Router {
    Router::new()
        .route("/", get(handle_status).post(handle_command))
        .route("/request_vote", post(handle_vote_request))
        .route("/append_entries", post(handle_append_entries_request))
        .layer(TraceLayer::new_for_http())
        .with_state(replica)
}

async fn handle_status(State(replica): State<Arc<Replica>>) -> String {
    replica.state.lock().await.status_report()
}

#[derive(serde::Deserialize)]
struct CommandRequest {
    #[serde(default)]
    command: String,
}

async fn handle_command(
    State(replica): State<Arc<Replica>>,
    body: Result<Json<CommandRequest>, JsonRejection>,
) -> Result<String, AppError> {
    let Json(request) = body?;

    // Serializes the whole quorum-wait window so a second submission never
    // observes a half-replicated first one.
    let _guard = replica.command_lock.lock().await;

    if request.command.is_empty() {
        return Ok("ERROR: No command".to_string());
    }

    let (peers, command) = {
        let mut state = replica.state.lock().await;
        if state.role != Role::Leader {
            return Ok("ERROR: I am not a LEADER, cannot process command".to_string());
        }
        state.log.push(crate::raft::log::LogEntry::new(state.current_term, request.command.clone()));
        info!(command = %request.command, "appended client command to log");
        (state.peers.clone(), request.command.clone())
    };

    let mut tasks = Vec::with_capacity(peers.len());
    for peer in peers {
        tasks.push(replicate_one(&replica, peer));
    }
    let results = futures::future::join_all(tasks).await;

    let mut quorum = 1; // the leader itself
    for acked in results {
        quorum += usize::from(acked);
    }

    let majority = replica.state.lock().await.majority;
    if quorum >= majority {
        Ok(format!("OK: Command '{command}' added to log"))
    } else {
        Ok("ERROR: Not enough quorum to commit the command".to_string())
    }
}

async fn handle_vote_request(
    State(replica): State<Arc<Replica>>,
    body: Result<Json<RequestVote>, JsonRejection>,
) -> Result<Json<VoteResponse>, AppError> {
    let Json(request) = body?;
    Ok(Json(election::handle_request_vote(&replica, request).await))
}

async fn handle_append_entries_request(
    State(replica): State<Arc<Replica>>,
    body: Result<Json<AppendEntries>, JsonRejection>,
) -> Result<Json<AppendResponse>, AppError> {
    let Json(request) = body?;
    Ok(Json(replication::handle_append_entries(&replica, request).await))
}
