//! Outbound transport to peers: `request_vote` / `append_entries` over HTTP.
//!
//! Every transport failure (timeout, connection refused, decode failure) is
//! folded into `None` here: transient transport errors never surface as a
//! fault to the caller, only as "peer silent".

use std::time::Duration;

use tracing::warn;

use super::rpc::{AppendEntries, AppendResponse, RequestVote, VoteResponse};

#[derive(Clone)]
pub struct RpcClient {
    http: reqwest::Client,
    peer_port: u16,
}

impl RpcClient {
    pub fn new(timeout: Duration, peer_port: u16) -> Self {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .expect("failed to build reqwest client");
        RpcClient { http, peer_port }
    }

    fn url(&self, peer: &str, path: &str) -> String {
        format!("http://{peer}:{port}/{path}", peer = peer, port = self.peer_port, path = path)
    }

    pub async fn request_vote(&self, peer: &str, req: &RequestVote) -> Option<VoteResponse> {
        let url = self.url(peer, "request_vote");
        match self.http.post(&url).json(req).send().await {
            Ok(resp) => match resp.json::<VoteResponse>().await {
                Ok(body) => Some(body),
                Err(err) => {
                    warn!(%peer, %err, "malformed request_vote response");
                    None
                }
            },
            Err(err) => {
                warn!(%peer, %err, "request_vote RPC failed");
                None
            }
        }
    }

    pub async fn append_entries(&self, peer: &str, req: &AppendEntries) -> Option<AppendResponse> {
        let url = self.url(peer, "append_entries");
        match self.http.post(&url).json(req).send().await {
            Ok(resp) => match resp.json::<AppendResponse>().await {
                Ok(body) => Some(body),
                Err(err) => {
                    warn!(%peer, %err, "malformed append_entries response");
                    None
                }
            },
            Err(err) => {
                warn!(%peer, %err, "append_entries RPC failed");
                None
            }
        }
    }
}
