//! End-to-end HTTP tests driving the axum `Router` directly via
//! `tower::ServiceExt::oneshot`, covering voting, log replication, and
//! client command submission.

use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::{Method, Request, StatusCode};
use raftd::raft::{log::LogEntry, Replica, Role};
use serde_json::{json, Value};
use tower::ServiceExt;

fn three_node_replica() -> Arc<Replica> {
    Arc::new(Replica::new(
        "node1".to_string(),
        vec!["node2".to_string(), "node3".to_string()],
        8080,
        Duration::from_millis(50),
        Duration::from_secs(5),
    ))
}

async fn post(router: axum::Router, path: &str, body: Value) -> (StatusCode, Value) {
    let request = Request::builder()
        .method(Method::POST)
        .uri(path)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap();
    let response = router.oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let value: Value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, value)
}

async fn post_text(router: axum::Router, path: &str, body: Value) -> String {
    let request = Request::builder()
        .method(Method::POST)
        .uri(path)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap();
    let response = router.oneshot(request).await.unwrap();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

#[tokio::test]
async fn request_vote_grants_fresh_vote() {
    let replica = three_node_replica();
    let router = raftd::http::router(replica.clone());

    let (status, body) = post(
        router,
        "/request_vote",
        json!({ "term": 1, "candidate_id": "node2", "last_log_index": 0, "last_log_term": 0 }),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["node_id"], "node1");
    assert_eq!(body["term"], 1);
    assert_eq!(body["vote_granted"], true);

    let state = replica.state.lock().await;
    assert_eq!(state.current_term, 1);
    assert_eq!(state.voted_for.as_deref(), Some("node2"));
    assert_eq!(state.role, Role::Follower);
}

#[tokio::test]
async fn request_vote_rejects_outdated_candidate_log() {
    let replica = three_node_replica();
    {
        let mut state = replica.state.lock().await;
        state.log = vec![LogEntry::new(2, "m1")];
        state.current_term = 2;
    }
    let router = raftd::http::router(replica.clone());

    let (status, body) = post(
        router,
        "/request_vote",
        json!({ "term": 2, "candidate_id": "node2", "last_log_index": 0, "last_log_term": 1 }),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["node_id"], "");
    assert_eq!(body["term"], 2);
    assert_eq!(body["vote_granted"], false);
    assert_eq!(replica.state.lock().await.voted_for, None);
}

#[tokio::test]
async fn append_entries_extends_log_and_advances_commit() {
    let replica = three_node_replica();
    {
        let mut state = replica.state.lock().await;
        state.current_term = 4;
        state.log = vec![LogEntry::new(1, "m1"), LogEntry::new(4, "m2")];
    }
    let router = raftd::http::router(replica.clone());

    let (status, body) = post(
        router,
        "/append_entries",
        json!({
            "term": 4,
            "leader_id": "node2",
            "log_length": 2,
            "log_term": 4,
            "entries": [[4, "m3"], [4, "m4"]],
            "leader_commit": 3
        }),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["term"], 4);
    assert_eq!(body["ack"], 4);
    assert_eq!(body["success"], true);

    let state = replica.state.lock().await;
    assert_eq!(
        state.log,
        vec![
            LogEntry::new(1, "m1"),
            LogEntry::new(4, "m2"),
            LogEntry::new(4, "m3"),
            LogEntry::new(4, "m4"),
        ]
    );
    assert_eq!(state.commit_length, 3);
    assert_eq!(state.state_machine, "_m1_m2_m3_");
}

#[tokio::test]
async fn append_entries_conflict_truncates_log() {
    let replica = three_node_replica();
    {
        let mut state = replica.state.lock().await;
        state.log = vec![
            LogEntry::new(1, "m1"),
            LogEntry::new(2, "m2"),
            LogEntry::new(2, "m3"),
        ];
        state.current_term = 3;
    }
    let router = raftd::http::router(replica.clone());

    let (status, body) = post(
        router,
        "/append_entries",
        json!({
            "term": 3,
            "leader_id": "node2",
            "log_length": 1,
            "log_term": 1,
            "entries": [[3, "X"], [3, "Y"]],
            "leader_commit": 0
        }),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["ack"], 3);

    let state = replica.state.lock().await;
    assert_eq!(
        state.log,
        vec![LogEntry::new(1, "m1"), LogEntry::new(3, "X"), LogEntry::new(3, "Y")]
    );
}

#[tokio::test]
async fn non_leader_rejects_client_command() {
    let replica = three_node_replica();
    let router = raftd::http::router(replica.clone());

    let text = post_text(router, "/", json!({ "command": "x" })).await;

    assert_eq!(text, "ERROR: I am not a LEADER, cannot process command");
    assert!(replica.state.lock().await.log.is_empty());
}

#[tokio::test]
async fn status_endpoint_reports_role_and_term() {
    let replica = three_node_replica();
    let router = raftd::http::router(replica);

    let request = Request::builder().method(Method::GET).uri("/").body(Body::empty()).unwrap();
    let response = router.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let text = String::from_utf8(bytes.to_vec()).unwrap();
    assert!(text.contains("Role: Follower"));
    assert!(text.contains("Node: node1"));
}
