//! Outbound peer transport: HTTP/JSON, fire-and-forget, with an
//! aggressive per-request timeout.
//!
//! Loss is tolerated by retransmission via heartbeats, so a send failure
//! here is never surfaced to the caller — it is logged and dropped, per
//! spec.md §7 ("Transport loss/timeout: silently dropped at the
//! sender").

pub mod messages;

use tracing::debug;

use crate::config::TimingConfig;
use messages::{AppendRequest, AppendResponse, RequestVoteRequest, RequestVoteResponse};

/// Thin wrapper around a [`reqwest::Client`] for sending Raft RPCs to
/// peers. Cheap to clone (the inner client is reference-counted).
#[derive(Clone)]
pub struct PeerClient {
    http: reqwest::Client,
}

impl PeerClient {
    /// Build a client with the cluster's configured RPC timeout.
    pub fn new(timing: &TimingConfig) -> Self {
        let http = reqwest::Client::builder()
            .timeout(timing.rpc_timeout)
            .build()
            .expect("reqwest client configuration is valid");
        Self { http }
    }

    /// POST `body` as JSON to `{base_url}{path}`, discarding the result.
    async fn post_fire_and_forget(&self, base_url: &str, path: &str, body: &impl serde::Serialize) {
        let url = format!("{base_url}{path}");
        if let Err(error) = self.http.post(&url).json(body).send().await {
            debug!(%url, %error, "peer RPC dropped");
        }
    }

    /// Send a vote request to a peer.
    pub async fn send_request_vote(&self, base_url: &str, request: &RequestVoteRequest) {
        self.post_fire_and_forget(base_url, "/raft/request_vote", request).await;
    }

    /// Send a vote response to a peer.
    pub async fn send_vote_response(&self, base_url: &str, response: &RequestVoteResponse) {
        self.post_fire_and_forget(base_url, "/raft/response_vote", response).await;
    }

    /// Send an append-entries request to a peer.
    pub async fn send_append_request(&self, base_url: &str, request: &AppendRequest) {
        self.post_fire_and_forget(base_url, "/raft/log_request", request).await;
    }

    /// Send an append-entries response to a peer.
    pub async fn send_append_response(&self, base_url: &str, response: &AppendResponse) {
        self.post_fire_and_forget(base_url, "/raft/log_response", response).await;
    }
}
