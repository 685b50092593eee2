//! Inbound HTTP surface: the `/raft/*` peer endpoints and the `/client`
//! key-value API, wired up as an [`axum::Router`].

pub mod handlers;

use std::sync::Arc;

use axum::routing::{get, patch, post};
use axum::Router;
use tower_http::trace::TraceLayer;

use crate::consensus::Replica;

/// Build the full router for one replica process.
pub fn router(replica: Arc<Replica>) -> Router {
    Router::new()
        .route("/raft/request_vote", post(handlers::request_vote))
        .route("/raft/response_vote", post(handlers::response_vote))
        .route("/raft/log_request", post(handlers::log_request))
        .route("/raft/log_response", post(handlers::log_response))
        .route("/client", post(handlers::create))
        .route(
            "/client/:key",
            get(handlers::read).put(handlers::update).delete(handlers::delete),
        )
        .route("/client/cas/:key", patch(handlers::cas))
        .route("/healthz", get(handlers::healthz))
        .layer(TraceLayer::new_for_http())
        .with_state(replica)
}
