//! Route handlers: thin translation between JSON/HTTP and
//! `consensus::replica::Replica`.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::consensus::replica::GatewayOutcome;
use crate::consensus::{Replica, Role};
use crate::error::RaftError;
use crate::transport::messages::{AppendRequest, AppendResponse, RequestVoteRequest, RequestVoteResponse};

/// `POST /client` body: create or overwrite `key`.
#[derive(Debug, Deserialize)]
pub struct CreateRequest {
    key: String,
    value: String,
}

/// `PUT /client/{key}` body.
#[derive(Debug, Deserialize)]
pub struct UpdateRequest {
    value: String,
}

/// `PATCH /client/cas/{key}` body.
#[derive(Debug, Deserialize)]
pub struct CasRequest {
    old_value: String,
    new_value: String,
}

/// Shared response shape for create/read.
#[derive(Debug, Serialize)]
pub struct KeyValue {
    key: String,
    value: String,
}

/// `PATCH /client/cas/{key}` response.
#[derive(Debug, Serialize)]
pub struct CasResult {
    status: bool,
}

/// `GET /healthz` response.
#[derive(Debug, Serialize)]
pub struct Health {
    node_id: usize,
    role: &'static str,
    term: u64,
    commit_length: usize,
    leader_hint: Option<usize>,
}

/// `POST /raft/request_vote`: the vote response is delivered
/// asynchronously on `/raft/response_vote`, not in this body.
pub async fn request_vote(State(replica): State<Arc<Replica>>, Json(request): Json<RequestVoteRequest>) -> StatusCode {
    tokio::spawn(async move { replica.reply_to_request_vote(request).await });
    StatusCode::NO_CONTENT
}

/// `POST /raft/response_vote`.
pub async fn response_vote(State(replica): State<Arc<Replica>>, Json(response): Json<RequestVoteResponse>) -> StatusCode {
    replica.handle_vote_response(response).await;
    StatusCode::NO_CONTENT
}

/// `POST /raft/log_request`: the append response is delivered
/// asynchronously on `/raft/log_response`.
pub async fn log_request(State(replica): State<Arc<Replica>>, Json(request): Json<AppendRequest>) -> StatusCode {
    tokio::spawn(async move { replica.reply_to_append_request(request).await });
    StatusCode::NO_CONTENT
}

/// `POST /raft/log_response`.
pub async fn log_response(State(replica): State<Arc<Replica>>, Json(response): Json<AppendResponse>) -> StatusCode {
    replica.handle_append_response(response).await;
    StatusCode::NO_CONTENT
}

/// `POST /client`: create or overwrite `key`.
pub async fn create(State(replica): State<Arc<Replica>>, Json(body): Json<CreateRequest>) -> Response {
    match replica.mutate(body.key.clone(), Some(body.value.clone())).await {
        GatewayOutcome::Applied { .. } => {
            (StatusCode::CREATED, Json(KeyValue { key: body.key, value: body.value })).into_response()
        }
        GatewayOutcome::Redirect(hint) => not_leader(&replica, "/client", hint).into_response(),
        GatewayOutcome::CasApplied { .. } => unreachable!("mutate never returns a CAS outcome"),
    }
}

/// `GET /client/{key}`: a non-linearizable local read of the committed
/// map (spec.md §9 Q7) — no leader check.
pub async fn read(State(replica): State<Arc<Replica>>, Path(key): Path<String>) -> Response {
    match replica.local_get(&key) {
        Some(value) => (StatusCode::OK, Json(KeyValue { key, value })).into_response(),
        None => RaftError::KeyNotFound(key).into_response(),
    }
}

/// `PUT /client/{key}`: update an existing key.
pub async fn update(
    State(replica): State<Arc<Replica>>,
    Path(key): Path<String>,
    Json(body): Json<UpdateRequest>,
) -> Response {
    if replica.local_get(&key).is_none() {
        return RaftError::KeyNotFound(key).into_response();
    }
    match replica.mutate(key, Some(body.value)).await {
        GatewayOutcome::Applied { .. } => StatusCode::NO_CONTENT.into_response(),
        GatewayOutcome::Redirect(hint) => not_leader(&replica, "/client", hint).into_response(),
        GatewayOutcome::CasApplied { .. } => unreachable!("mutate never returns a CAS outcome"),
    }
}

/// `DELETE /client/{key}`.
pub async fn delete(State(replica): State<Arc<Replica>>, Path(key): Path<String>) -> Response {
    if replica.local_get(&key).is_none() {
        return RaftError::KeyNotFound(key).into_response();
    }
    match replica.mutate(key, None).await {
        GatewayOutcome::Applied { .. } => StatusCode::NO_CONTENT.into_response(),
        GatewayOutcome::Redirect(hint) => not_leader(&replica, "/client", hint).into_response(),
        GatewayOutcome::CasApplied { .. } => unreachable!("mutate never returns a CAS outcome"),
    }
}

/// `PATCH /client/cas/{key}`.
pub async fn cas(
    State(replica): State<Arc<Replica>>,
    Path(key): Path<String>,
    Json(body): Json<CasRequest>,
) -> Response {
    if replica.local_get(&key).is_none() {
        return RaftError::KeyNotFound(key).into_response();
    }
    match replica.cas(key, body.old_value, body.new_value).await {
        GatewayOutcome::CasApplied { status } => (StatusCode::OK, Json(CasResult { status })).into_response(),
        GatewayOutcome::Redirect(hint) => not_leader(&replica, "/client/cas", hint).into_response(),
        GatewayOutcome::Applied { .. } => unreachable!("cas never returns a plain apply outcome"),
    }
}

/// `GET /healthz`: purely operational, not part of the client-facing
/// key-value API.
pub async fn healthz(State(replica): State<Arc<Replica>>) -> Json<Health> {
    let status = replica.status();
    Json(Health {
        node_id: status.node_id,
        role: match status.role {
            Role::Follower => "follower",
            Role::Candidate => "candidate",
            Role::Leader => "leader",
        },
        term: status.term,
        commit_length: status.commit_length,
        leader_hint: status.leader_hint,
    })
}

/// Build the `RaftError` for a not-leader outcome.
///
/// If `leader_hint` is known, resolves it to that replica's equivalent
/// path for a 307 redirect. If unknown, the source emits a redirect to
/// a nonexistent `-1` address (spec.md §9 Q5); here the client is asked
/// to retry after a short delay instead (`503` + `Retry-After`).
fn not_leader(replica: &Arc<Replica>, path: &str, leader_hint: Option<usize>) -> RaftError {
    RaftError::NotLeader { redirect: leader_hint.map(|leader_id| format!("{}{}", replica.peer_base_url(leader_id), path)) }
}
